//! Frequency estimation with onset gating and a bias-tolerant merge that
//! resists jitter between octave-related candidates.

use crate::config::{PitchConfig, MIN_PERIODICITY, ONSET_PERIODICITY};
use crate::period_detector::PeriodDetector;

/// Roughly a quarter semitone, expressed as a fractional frequency error:
/// candidates within this fraction of the current frequency are treated as
/// the same pitch rather than a shift.
const QUARTER_SEMITONE: f32 = 0.015625;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchInfo {
    pub frequency: f32,
    pub periodicity: f32,
}

impl PitchInfo {
    const SILENT: PitchInfo = PitchInfo {
        frequency: 0.0,
        periodicity: -1.0,
    };
}

/// Owns a [`PeriodDetector`] and turns its period/periodicity readings into
/// a stabilized frequency estimate.
pub struct PitchDetector {
    period_detector: PeriodDetector,
    sample_rate: f32,
    current: PitchInfo,
    frames_since_shift: u32,
}

impl PitchDetector {
    pub fn new(config: &PitchConfig) -> Self {
        PitchDetector {
            period_detector: PeriodDetector::new(config),
            sample_rate: config.sample_rate,
            current: PitchInfo::SILENT,
            frames_since_shift: 0,
        }
    }

    pub fn current(&self) -> PitchInfo {
        self.current
    }

    pub fn frames_since_shift(&self) -> u32 {
        self.frames_since_shift
    }

    pub fn ready(&self) -> bool {
        self.period_detector.ready()
    }

    /// Lazily derived predicted frequency from the two most recent
    /// high-peak edges, for the fusion layer's lookahead.
    pub fn predict_frequency(&self) -> Option<f32> {
        self.period_detector
            .predict_period()
            .filter(|&p| p > 0.0)
            .map(|p| self.sample_rate / p)
    }

    fn accept(&mut self, frequency: f32, periodicity: f32) {
        self.current = PitchInfo {
            frequency,
            periodicity,
        };
        self.frames_since_shift = 0;
    }

    pub fn tick(&mut self, s: f32) {
        self.period_detector.tick(s);

        if self.period_detector.zcc_is_reset() {
            self.current = PitchInfo::SILENT;
            self.frames_since_shift = 0;
            return;
        }
        if !self.period_detector.ready() {
            return;
        }

        let info = self.period_detector.period_info();
        if info.period < 0.0 {
            self.current = PitchInfo::SILENT;
            return;
        }

        let incoming_freq = self.sample_rate / info.period;
        let incoming_periodicity = info.periodicity;

        if self.current.frequency == 0.0 {
            if incoming_periodicity >= ONSET_PERIODICITY {
                self.accept(incoming_freq, incoming_periodicity);
            }
            return;
        }

        let error = self.current.frequency * QUARTER_SEMITONE;
        if (self.current.frequency - incoming_freq).abs() < error {
            self.accept(incoming_freq, incoming_periodicity);
        } else if self.frames_since_shift >= 2 {
            match match_harmonic(self.current.frequency, incoming_freq, error) {
                Some(adjusted) => self.accept(adjusted, incoming_periodicity),
                None => self.frames_since_shift += 1,
            }
        } else if incoming_periodicity > MIN_PERIODICITY && incoming_periodicity >= ONSET_PERIODICITY
        {
            self.accept(incoming_freq, incoming_periodicity);
        } else {
            self.frames_since_shift += 1;
        }
    }
}

/// Tries to explain `incoming` as an integer harmonic or sub-harmonic of
/// `current`, returning the frequency it should be reinterpreted as if a
/// match within `error` is found.
fn match_harmonic(current: f32, incoming: f32, error: f32) -> Option<f32> {
    for ratio in 2..=8 {
        let ratio = ratio as f32;
        let as_harmonic = incoming * ratio;
        if (current - as_harmonic).abs() < error {
            return Some(as_harmonic);
        }
        let as_subharmonic = incoming / ratio;
        if (current - as_subharmonic).abs() < error {
            return Some(as_subharmonic);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_onto_a_steady_tone_within_one_window() {
        let config = PitchConfig::new()
            .sample_rate(48_000.0)
            .lowest_freq(80.0)
            .highest_freq(1000.0)
            .hysteresis_db(-60.0);
        let mut pd = PitchDetector::new(&config);
        let sr = 48_000.0f32;
        let freq = 440.0f32;
        for n in 0..48_000 {
            let s = 0.5 * (2.0 * std::f32::consts::PI * freq * n as f32 / sr).sin();
            pd.tick(s);
        }
        let current = pd.current();
        assert!(current.frequency > 0.0);
        assert!((current.frequency - freq).abs() / freq < 0.02);
    }

    #[test]
    fn stays_silent_on_silence() {
        let config = PitchConfig::new();
        let mut pd = PitchDetector::new(&config);
        for _ in 0..48_000 {
            pd.tick(0.0);
        }
        assert_eq!(pd.current().frequency, 0.0);
    }
}
