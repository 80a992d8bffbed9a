//! Bitstream branch: builds a BACF bitstream from zero-crossing pulses and
//! arbitrates between harmonically related period candidates.

use crate::bacf::Bacf;
use crate::bitset::Bitset;
use crate::config::{
    PitchConfig, HARMONIC_PERIODICITY_FACTOR, PERIODICITY_DIFF_FACTOR, PULSE_THRESHOLD,
};
use crate::zero_crossing::ZeroCrossingCollector;

/// The result of one frame's harmonic arbitration. `periodicity = 0.0` and
/// `period = -1.0` together mean "no voiced fundamental this frame" — the
/// sentinel pair the unvoiced paths below converge on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodInfo {
    pub period: f32,
    pub periodicity: f32,
}

impl PeriodInfo {
    const UNVOICED: PeriodInfo = PeriodInfo {
        period: -1.0,
        periodicity: 0.0,
    };
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    period: f32,
    periodicity: f32,
    harmonic: u32,
}

/// Accumulates candidate `(period, periodicity)` pairs found while scanning
/// pulse pairs and decides which one is the true fundamental rather than a
/// harmonic or sub-harmonic of it.
struct SubCollector {
    range: f32,
    periodicity_diff_threshold: f32,
    harmonic_threshold: f32,
    first_period: Option<f32>,
    fundamental: Option<Candidate>,
}

impl SubCollector {
    fn new(range: f32, periodicity_diff_threshold: f32, harmonic_threshold: f32) -> Self {
        SubCollector {
            range,
            periodicity_diff_threshold,
            harmonic_threshold,
            first_period: None,
            fundamental: None,
        }
    }

    fn process(&mut self, period: f32, periodicity: f32) {
        let Some(fundamental) = self.fundamental else {
            self.first_period = Some(period);
            self.fundamental = Some(Candidate {
                period,
                periodicity,
                harmonic: 1,
            });
            return;
        };

        let first_period = self.first_period.expect("set alongside fundamental");
        let multiple = (period / first_period).round().max(1.0).min(self.range);

        if (period / multiple - first_period).abs() < self.periodicity_diff_threshold {
            let harmonic = multiple as u32;
            if periodicity > fundamental.periodicity && harmonic != fundamental.harmonic {
                if (periodicity - fundamental.periodicity).abs() < self.harmonic_threshold {
                    self.fundamental = Some(Candidate {
                        period,
                        periodicity,
                        harmonic,
                    });
                } else {
                    self.first_period = Some(period);
                    self.fundamental = Some(Candidate {
                        period,
                        periodicity,
                        harmonic: 1,
                    });
                }
            }
            return;
        }

        if periodicity > fundamental.periodicity {
            self.first_period = Some(period);
            self.fundamental = Some(Candidate {
                period,
                periodicity,
                harmonic: 1,
            });
        }
    }

    /// `None` fundamental and a period of `-1.0` both mean "nothing voiced
    /// found this frame" — there is no bug here to replicate: unlike the
    /// reference's double-assignment, an absent fundamental converges
    /// directly on the unvoiced sentinel.
    fn get(&self) -> PeriodInfo {
        match self.fundamental {
            None => PeriodInfo::UNVOICED,
            Some(f) => PeriodInfo {
                period: f.period / f.harmonic as f32,
                periodicity: f.periodicity,
            },
        }
    }
}

/// Owns the zero-crossing collector, its backing bitstream, and the
/// correlator over it; turns ready windows into a harmonically resolved
/// `(period, periodicity)` estimate.
pub struct PeriodDetector {
    zcc: ZeroCrossingCollector,
    bitset: Bitset,
    bacf: Bacf,
    pulses: Vec<(i64, i64)>,
    min_period: f32,
    range: f32,
    weight: f32,
    mid_point: usize,
    periodicity_diff_threshold: f32,
    harmonic_threshold: f32,
    half_empty: bool,
    period_info: PeriodInfo,
    ready: bool,
}

impl PeriodDetector {
    pub fn new(config: &PitchConfig) -> Self {
        let window_size = config.window_size();
        let bitset = Bitset::new(window_size);
        let bacf = Bacf::new(bitset.word_count());
        let mid_point = window_size / 2;
        let zcc = ZeroCrossingCollector::new(window_size, config.hysteresis_linear());
        let pulse_capacity = zcc.capacity();
        PeriodDetector {
            zcc,
            bitset,
            bacf,
            pulses: Vec::with_capacity(pulse_capacity),
            min_period: config.min_period(),
            range: config.harmonic_range(),
            weight: 2.0 / window_size as f32,
            mid_point,
            periodicity_diff_threshold: mid_point as f32 * PERIODICITY_DIFF_FACTOR,
            harmonic_threshold: HARMONIC_PERIODICITY_FACTOR * 2.0 / window_size as f32,
            half_empty: true,
            period_info: PeriodInfo::UNVOICED,
            ready: false,
        }
    }

    pub fn period_info(&self) -> PeriodInfo {
        self.period_info
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn zcc_is_reset(&self) -> bool {
        self.zcc.num_edges() == 0 && !self.zcc.ready()
    }

    pub fn set_hysteresis(&mut self, hysteresis: f32) {
        self.zcc.set_hysteresis(hysteresis);
    }

    pub fn tick(&mut self, s: f32) {
        self.zcc.tick(s);
        self.ready = self.zcc.ready();
        if self.ready {
            self.set_bitstream();
            self.period_info = self.autocorrelate();
        }
    }

    /// From the two most recent high-peak edges, the fractional period
    /// between them — used by the fusion layer's lazy predicted frequency.
    pub fn predict_period(&self) -> Option<f32> {
        let threshold = self.zcc.peak() * PULSE_THRESHOLD;
        let mut leading_edges = [0i64; 2];
        let mut found = 0;
        let mut k = 0;
        while found < 2 && k < self.zcc.num_edges() {
            if let Some(edge) = self.zcc.get_crossing(k) {
                if edge.peak >= threshold {
                    leading_edges[found] = edge.leading_edge;
                    found += 1;
                }
            }
            k += 1;
        }
        if found == 2 {
            Some((leading_edges[0] - leading_edges[1]) as f32)
        } else {
            None
        }
    }

    fn set_bitstream(&mut self) {
        self.bitset.clear();
        self.pulses.clear();
        let threshold = self.zcc.peak() * PULSE_THRESHOLD;
        let bit_size = self.bitset.bit_size() as i64;
        let mut min_leading = i64::MAX;
        let mut max_trailing = i64::MIN;

        for k in (0..self.zcc.num_edges()).rev() {
            let edge = match self.zcc.get_crossing(k) {
                Some(edge) => *edge,
                None => continue,
            };
            if edge.peak <= threshold {
                continue;
            }
            let Some(trailing) = edge.trailing_edge else {
                continue;
            };
            if edge.leading_edge < 0 || trailing <= edge.leading_edge {
                continue;
            }
            let start = edge.leading_edge.min(bit_size) as usize;
            let stop = trailing.min(bit_size) as usize;
            if stop > start {
                self.bitset.set_multiple(start, stop - start, true);
            }
            min_leading = min_leading.min(edge.leading_edge);
            max_trailing = max_trailing.max(trailing);
            self.pulses.push((edge.leading_edge, trailing));
        }

        self.half_empty = self.pulses.is_empty()
            || min_leading > self.mid_point as i64
            || max_trailing < self.mid_point as i64;
    }

    fn autocorrelate(&mut self) -> PeriodInfo {
        if self.half_empty || self.pulses.len() < 2 {
            return PeriodInfo::UNVOICED;
        }

        let mut collector =
            SubCollector::new(self.range, self.periodicity_diff_threshold, self.harmonic_threshold);
        let mut have_fundamental = false;

        for i in 0..self.pulses.len() {
            for j in (i + 1)..self.pulses.len() {
                let period = (self.pulses[j].0 - self.pulses[i].0) as f32;
                if period > self.mid_point as f32 {
                    break;
                }
                if period < self.min_period {
                    continue;
                }

                let mut count = self.bacf.correlation(&self.bitset, period.round() as usize);

                if !have_fundamental && count == 0 {
                    let half = (period / 2.0).round() as usize;
                    if self.bacf.correlation(&self.bitset, half) == 0 {
                        log::debug!(
                            "period detector: false double period at {period}, treating frame as unvoiced"
                        );
                        return PeriodInfo::UNVOICED;
                    }
                }

                let mut period = period;
                if period < 32.0 {
                    let (p, c) = self.hill_climb(period, count);
                    period = p;
                    count = c;
                }

                let periodicity = 1.0 - count as f32 * self.weight;
                collector.process(period, periodicity);
                have_fundamental = true;

                if count == 0 {
                    return collector.get();
                }
            }
        }

        collector.get()
    }

    /// Searches upward then downward from `period` while the correlation
    /// count strictly decreases, returning the best `(period, count)` found.
    fn hill_climb(&self, period: f32, count: u32) -> (f32, u32) {
        let mut best_period = period.round().max(1.0) as i64;
        let mut best_count = count;

        loop {
            let next = best_period + 1;
            let c = self.bacf.correlation(&self.bitset, next as usize);
            if c < best_count {
                best_count = c;
                best_period = next;
            } else {
                break;
            }
        }
        loop {
            let next = best_period - 1;
            if next <= 0 {
                break;
            }
            let c = self.bacf.correlation(&self.bitset, next as usize);
            if c < best_count {
                best_count = c;
                best_period = next;
            } else {
                break;
            }
        }

        (best_period as f32, best_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_wave_resolves_to_its_fundamental() {
        let config = PitchConfig::new()
            .sample_rate(48_000.0)
            .lowest_freq(60.0)
            .highest_freq(1000.0)
            .hysteresis_db(-60.0);
        let mut pd = PeriodDetector::new(&config);
        let sr = 48_000.0f32;
        let freq = 220.0f32;
        let mut last = PeriodInfo::UNVOICED;
        for n in 0..48_000 {
            let phase = (freq * n as f32 / sr).fract();
            let s = if phase < 0.5 { 1.0 } else { -1.0 };
            pd.tick(s);
            if pd.ready() {
                last = pd.period_info();
            }
        }
        assert!(last.periodicity > 0.0, "periodicity={}", last.periodicity);
        let estimated_freq = sr / last.period;
        assert!(
            (estimated_freq - freq).abs() < 5.0,
            "estimated={estimated_freq}"
        );
    }

    #[test]
    fn silence_never_becomes_voiced() {
        let config = PitchConfig::new();
        let mut pd = PeriodDetector::new(&config);
        for _ in 0..48_000 {
            pd.tick(0.0);
            if pd.ready() {
                assert_eq!(pd.period_info(), PeriodInfo::UNVOICED);
            }
        }
    }
}
