//! Windowed power envelope with overlapped analysis windows.

use crate::config::MAXOVERLAP;
use crate::math::power_db;
use std::f32::consts::PI;

#[derive(Clone, Copy)]
struct Slot {
    active: bool,
    filled: usize,
    sum: f32,
}

impl Slot {
    const EMPTY: Slot = Slot {
        active: false,
        filled: 0,
        sum: 0.0,
    };
}

/// Running sum-of-squares of a Hann-windowed input, computed over
/// `npoints`-sample windows spaced `period` samples apart. Up to
/// [`MAXOVERLAP`] overlapping windows are tracked at once so a result is
/// available every `period` samples instead of every `npoints`.
pub struct EnvPd {
    window: Vec<f32>,
    npoints: usize,
    period: usize,
    countdown: usize,
    slots: [Slot; MAXOVERLAP],
    last_power: f32,
}

impl EnvPd {
    /// `npoints` is the analysis window length; `period` is the requested
    /// hop size, snapped upward to satisfy `npoints / MAXOVERLAP + 1`.
    pub fn new(npoints: usize, period: usize) -> Self {
        let window = (0..npoints)
            .map(|i| (1.0 - (2.0 * PI * i as f32 / npoints as f32).cos()) / npoints as f32)
            .collect();
        let min_period = npoints / MAXOVERLAP + 1;
        let period = period.max(min_period);
        EnvPd {
            window,
            npoints,
            period,
            countdown: period,
            slots: [Slot::EMPTY; MAXOVERLAP],
            last_power: 0.0,
        }
    }

    pub fn npoints(&self) -> usize {
        self.npoints
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Advances the envelope by one sample, returning the most recently
    /// completed window's power in decibels.
    pub fn tick(&mut self, s: f32) -> f32 {
        let windowed = s * s;
        for slot in self.slots.iter_mut() {
            if !slot.active {
                continue;
            }
            slot.sum += self.window[slot.filled] * windowed;
            slot.filled += 1;
            if slot.filled == self.npoints {
                self.last_power = slot.sum;
                *slot = Slot::EMPTY;
            }
        }

        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = self.period;
            if let Some(slot) = self.slots.iter_mut().find(|s| !s.active) {
                *slot = Slot {
                    active: true,
                    filled: 0,
                    sum: 0.0,
                };
            }
        }

        power_db(self.last_power)
    }
}
