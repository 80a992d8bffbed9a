//! Fusion layer: reconciles the FFT/SNAC branch and the bitstream branch
//! into a single frequency and periodicity estimate.

use crate::arena::Arena;
use crate::config::PitchConfig;
use crate::envelope_follower::EnvelopeFollower;
use crate::period_detection::PeriodDetection;
use crate::pitch_detector::PitchDetector;

/// Half a semitone, expressed as a fractional frequency error, used both to
/// decide "close enough to agree" and "close enough to the running mean to
/// be a small, trustworthy change."
const HALF_SEMITONE: f32 = 0.03125;

/// A ratio that rounds to 2 or more is treated as an octave (or higher)
/// jump rather than a genuine small pitch change.
fn is_octave_ratio(ratio: f32) -> bool {
    ratio.round() > 1.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub frequency: f32,
    pub periodicity: f32,
}

/// Runs both detection branches on the same sample stream and arbitrates
/// between their estimates every time the bitstream branch completes a
/// window.
pub struct DualPitchDetector {
    envelope: EnvelopeFollower,
    period_detection: PeriodDetection,
    pitch_detector: PitchDetector,
    sample_rate: f32,
    lowest: f32,
    highest: f32,
    fidelity_threshold: f32,
    periodicity_threshold: f32,
    mean: f32,
    first: bool,
    ready: bool,
    current: PitchEstimate,
}

impl DualPitchDetector {
    pub fn new(config: &PitchConfig) -> Self {
        crate::denormal::prevent_denormals();
        let period_detection = PeriodDetection::new(
            crate::config::SNAC_FRAME_SIZE,
            config.overlap,
            config.bias,
            config.min_rms,
        );
        DualPitchDetector {
            envelope: EnvelopeFollower::new(0.01, 0.999),
            period_detection,
            pitch_detector: PitchDetector::new(config),
            sample_rate: config.sample_rate,
            lowest: config.lowest_freq,
            highest: config.highest_freq,
            fidelity_threshold: config.fidelity_threshold,
            periodicity_threshold: config.periodicity_threshold,
            mean: config.lowest_freq + (config.highest_freq - config.lowest_freq) / 2.0,
            first: true,
            ready: false,
            current: PitchEstimate {
                frequency: 0.0,
                periodicity: -1.0,
            },
        }
    }

    /// Builds a detector the same way as [`Self::new`], but first draws its
    /// approximate memory footprint from `arena` — giving the caller's
    /// pre-sized pool a chance to reject an oversized configuration at
    /// construction time rather than mid-stream.
    pub fn new_in(arena: &mut Arena, config: &PitchConfig) -> Self {
        let window_size = config.window_size();
        let footprint_floats = crate::config::SNAC_FRAME_SIZE * 6 + window_size * 2;
        let _reserved: Vec<f32> = arena.alloc_vec(footprint_floats);
        Self::new(config)
    }

    pub fn frequency(&self) -> f32 {
        self.current.frequency
    }

    pub fn periodicity(&self) -> f32 {
        self.current.periodicity
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn frames_since_shift(&self) -> u32 {
        self.pitch_detector.frames_since_shift()
    }

    /// Current held amplitude envelope.
    pub fn envelope(&self) -> f32 {
        self.envelope.value()
    }

    /// `f1` from the SNAC branch's current period agrees within 10% with
    /// `f2`, the bitstream branch's lookahead prediction; otherwise `0.0`
    /// ("no confident prediction").
    pub fn predicted_frequency(&self) -> f32 {
        let period1 = self.period_detection.period();
        if period1 <= 0.0 {
            return 0.0;
        }
        let f1 = self.sample_rate / period1;
        match self.pitch_detector.predict_frequency() {
            Some(f2) if f2 > 0.0 && (f1 - f2).abs() <= 0.1 * f1.max(f2) => f1,
            _ => 0.0,
        }
    }

    pub fn tick(&mut self, s: f32) {
        self.envelope.tick(s);
        // Both branches assume a NaN-screened stream; a NaN sample is
        // reported as silence rather than propagated.
        let s = if s.is_nan() { 0.0 } else { s };
        self.period_detection.tick(s);
        self.pitch_detector.tick(s);
        self.ready = self.pitch_detector.ready();
        if !self.ready {
            return;
        }

        let period1 = self.period_detection.period();
        if period1 <= 0.0 {
            return;
        }
        let i1_freq = self.sample_rate / period1;
        let i1_fidelity = self.period_detection.fidelity();
        let i2 = self.pitch_detector.current();

        if let Some((freq, periodicity)) = self.arbitrate(i1_freq, i1_fidelity, i2.frequency, i2.periodicity) {
            self.current = PitchEstimate {
                frequency: freq,
                periodicity,
            };
            if self.first {
                self.mean = freq;
                self.first = false;
            } else {
                self.mean = 0.2222 * freq + 0.7778 * self.mean;
            }
        }
    }

    /// Implements the six arbitration rules, in order; the first matching
    /// rule decides. Returns `None` for an ambiguous or rejected read, in
    /// which case the previous estimate is left in place (readiness is
    /// still reported to the caller).
    fn arbitrate(
        &self,
        i1_freq: f32,
        i1_fidelity: f32,
        i2_freq: f32,
        i2_periodicity: f32,
    ) -> Option<(f32, f32)> {
        let mean = self.mean;
        let band = mean * HALF_SEMITONE;

        // 1. SNAC and bitstream already agree: prefer the bitstream reading.
        if (i1_freq - i2_freq).abs() <= band {
            return Some((i2_freq, i2_periodicity));
        }

        // 2. A disagreement implies a change; favor whichever candidate is a
        // small change from the mean, checking the bitstream reading first.
        if (i2_freq - mean).abs() <= band {
            return Some((i2_freq, i2_periodicity));
        }
        if (i1_freq - mean).abs() <= band {
            return Some((i1_freq, i1_fidelity));
        }

        // 3. SNAC isn't trustworthy enough to break the tie.
        if i1_fidelity < self.fidelity_threshold {
            return None;
        }

        // 4. Both candidates moved the same direction relative to the mean.
        if i1_freq > mean && i2_freq > mean {
            if i1_freq < i2_freq && i2_periodicity > self.periodicity_threshold {
                return Some(if is_octave_ratio(i2_freq / i1_freq) {
                    (i1_freq, i1_fidelity)
                } else {
                    (i2_freq, i2_periodicity)
                });
            }
        } else if i1_freq < mean && i2_freq < mean {
            if i1_freq > i2_freq && i2_periodicity > self.periodicity_threshold {
                return Some(if is_octave_ratio(i1_freq / i2_freq) {
                    (i2_freq, i2_periodicity)
                } else {
                    (i1_freq, i1_fidelity)
                });
            }
        }

        // 5. Out-of-range handling.
        if i1_freq > self.highest {
            return Some(if is_octave_ratio(i1_freq / i2_freq) {
                (i2_freq, i2_periodicity)
            } else {
                (i1_freq, i1_fidelity)
            });
        }
        if i1_freq < self.lowest {
            return Some(if is_octave_ratio(i2_freq / i1_freq) {
                (i2_freq, i2_periodicity)
            } else {
                (i1_freq, i1_fidelity)
            });
        }

        // 6. Ambiguous: leave the previous estimate untouched.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PitchConfig {
        PitchConfig::new()
            .sample_rate(48_000.0)
            .lowest_freq(80.0)
            .highest_freq(1000.0)
            .hysteresis_db(-60.0)
    }

    #[test]
    fn pure_sine_is_tracked_accurately() {
        let mut dpd = DualPitchDetector::new(&config());
        let sr = 48_000.0f32;
        let freq = 440.0f32;
        for n in 0..16384 {
            let s = 0.5 * (2.0 * std::f32::consts::PI * freq * n as f32 / sr).sin();
            dpd.tick(s);
        }
        assert!(dpd.frequency() > 0.0);
        assert!((dpd.frequency() - freq).abs() / freq < 0.02);
    }

    #[test]
    fn silence_reports_zero_frequency() {
        let mut dpd = DualPitchDetector::new(&config());
        for _ in 0..16384 {
            dpd.tick(0.0);
        }
        assert_eq!(dpd.frequency(), 0.0);
    }

    #[test]
    fn nan_samples_are_screened_out_rather_than_propagated() {
        let mut dpd = DualPitchDetector::new(&config());
        let sr = 48_000.0f32;
        let freq = 440.0f32;
        for n in 0..8192 {
            let s = 0.5 * (2.0 * std::f32::consts::PI * freq * n as f32 / sr).sin();
            dpd.tick(s);
        }
        assert!(dpd.frequency() > 0.0);
        for _ in 0..64 {
            dpd.tick(f32::NAN);
        }
        assert!(!dpd.frequency().is_nan());
        assert!(!dpd.periodicity().is_nan());
    }

    #[test]
    fn new_in_draws_from_the_caller_arena() {
        let mut arena = Arena::new(1 << 20);
        let mut dpd = DualPitchDetector::new_in(&mut arena, &config());
        for _ in 0..1024 {
            dpd.tick(0.0);
        }
        assert!(arena.remaining() < 1 << 20);
    }

    #[test]
    #[should_panic]
    fn new_in_panics_on_an_undersized_arena() {
        let mut arena = Arena::new(4);
        let _ = DualPitchDetector::new_in(&mut arena, &config());
    }

    #[test]
    fn gaussian_noise_never_locks_confidently() {
        let mut dpd = DualPitchDetector::new(&config());
        let mut rnd = funutd::Rnd::from_u64(1);
        for _ in 0..48_000 {
            let s = (rnd.f32() - 0.5) * 2.0;
            dpd.tick(s);
            assert!(dpd.periodicity() < 0.98);
        }
    }
}
