//! SNAC: Special Normalized AutoCorrelation pitch estimator.
//!
//! Runs a biased autocorrelation via FFT, converts it to a properly
//! normalized (unbiased) autocorrelation with a running double-precision
//! integral, and picks the first strong peak, refining short periods in the
//! spectral domain.

use crate::fft::RealFft;
use crate::math::{interpolate3, interpolate3max, interpolate3phase};
use num_complex::Complex32;

pub struct Snac {
    input: Vec<f32>,
    framesize: usize,
    fftsize: usize,
    mask: usize,
    write_pos: usize,
    timeindex: usize,
    overlap: usize,
    minrms: f32,
    bias: f32,
    bias_table: Vec<f32>,

    frame: Vec<f32>,
    process_buf: Vec<f32>,
    spectrum: Vec<Complex32>,
    spectrumbuf: Vec<f32>,
    autocorr: Vec<f32>,
    fft: RealFft,

    period_index: usize,
    period_length: f32,
    fidelity: f32,
}

impl Snac {
    pub fn new(framesize: usize, overlap: usize, bias: f32, minrms: f32) -> Self {
        let framesize = framesize.next_power_of_two();
        let fftsize = framesize * 2;
        let maxperiod = framesize as f32;
        let bias_table = (0..framesize)
            .map(|n| {
                if n >= 5 {
                    1.0 - bias * ((n - 4) as f32).ln() / (maxperiod - 4.0).ln()
                } else {
                    0.0
                }
            })
            .collect();

        Snac {
            input: vec![0.0; framesize],
            framesize,
            fftsize,
            mask: framesize - 1,
            write_pos: 0,
            timeindex: 0,
            overlap: overlap.max(1),
            minrms,
            bias,
            bias_table,
            frame: vec![0.0; framesize],
            process_buf: vec![0.0; fftsize],
            spectrum: vec![Complex32::new(0.0, 0.0); fftsize / 2 + 1],
            spectrumbuf: vec![0.0; fftsize / 4],
            autocorr: vec![0.0; framesize],
            fft: RealFft::new(fftsize),
            period_index: 0,
            period_length: 0.0,
            fidelity: 0.0,
        }
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias.max(0.0).min(1.0);
    }

    pub fn set_min_rms(&mut self, minrms: f32) {
        self.minrms = minrms.max(0.0).min(1.0);
    }

    pub fn period(&self) -> f32 {
        self.period_length
    }

    pub fn fidelity(&self) -> f32 {
        self.fidelity
    }

    /// Advances SNAC by one sample, running a full analysis pass whenever
    /// `timeindex` crosses a `framesize / overlap` boundary.
    pub fn tick(&mut self, s: f32) {
        self.input[self.write_pos] = s;
        self.write_pos = (self.write_pos + 1) & self.mask;
        self.timeindex += 1;

        let hop = (self.framesize / self.overlap).max(1);
        if self.timeindex >= self.framesize && self.timeindex % hop == 0 {
            self.analyze();
        }
    }

    fn analyze(&mut self) {
        let scale = 1.0 / (2.0 * self.framesize as f32).sqrt();
        for i in 0..self.framesize {
            let idx = (self.write_pos + i) & self.mask;
            let sample = self.input[idx] * scale;
            self.frame[i] = sample;
            self.process_buf[i] = sample;
        }
        for v in &mut self.process_buf[self.framesize..] {
            *v = 0.0;
        }

        self.fft.forward(&mut self.process_buf, &mut self.spectrum);

        let nyquist = self.spectrum.len() - 1;
        self.spectrum[0].re *= self.spectrum[0].re;
        self.spectrum[0].im = 0.0;
        self.spectrum[nyquist].re *= self.spectrum[nyquist].re;
        self.spectrum[nyquist].im = 0.0;
        for bin in &mut self.spectrum[1..nyquist] {
            bin.re = bin.re * bin.re + bin.im * bin.im;
            bin.im = 0.0;
        }
        let quarter = self.spectrumbuf.len().min(self.spectrum.len());
        for (dst, bin) in self.spectrumbuf[..quarter].iter_mut().zip(&self.spectrum) {
            *dst = bin.re;
        }

        self.fft.inverse(&mut self.spectrum, &mut self.process_buf);
        for i in 0..self.framesize {
            self.autocorr[i] = self.process_buf[i] / self.fftsize as f32;
        }

        // Minimum RMS implemented as a floor on the lag-0 autocorrelation
        // value, functionally equivalent to a white-noise floor: the frame
        // is still normalized and peak-picked, it just can't report a
        // quieter floor than this.
        let minrzero = self.minrms * self.minrms * self.framesize as f32;
        if self.autocorr[0] < minrzero {
            self.autocorr[0] = minrzero;
        }

        self.normalize();
        self.pick_peak();
    }

    fn normalize(&mut self) {
        let mut normintegral: f64 = 2.0 * self.autocorr[0] as f64;
        self.autocorr[0] = 1.0;
        for tau in 1..self.framesize {
            let end_a = self.frame[tau - 1] as f64;
            let end_b = self.frame[self.framesize - tau] as f64;
            normintegral -= end_a * end_a + end_b * end_b;
            self.autocorr[tau] = if normintegral > 0.0 {
                (2.0 * self.autocorr[tau] as f64 / normintegral) as f32
            } else {
                0.0
            };
        }
        let seek_cutoff = (self.framesize as f32 * crate::config::SEEK) as usize;
        for v in &mut self.autocorr[seek_cutoff.min(self.framesize)..] {
            *v = 0.0;
        }
    }

    fn pick_peak(&mut self) {
        let framesize = self.framesize;
        let mut n = 1;
        while n < framesize && self.autocorr[n] > 0.0 {
            n += 1;
        }

        let mut best_n = 0usize;
        let mut best_score = f32::MIN;
        let mut i = n + 1;
        while i + 1 < framesize {
            if self.autocorr[i - 1] < self.autocorr[i] && self.autocorr[i] >= self.autocorr[i + 1] {
                let score = interpolate3max(&self.autocorr, i) * self.bias_table[i];
                if score > best_score {
                    best_score = score;
                    best_n = i;
                }
            }
            i += 1;
        }

        self.period_index = best_n;
        // A frame with no local peak leaves period_length/fidelity at their
        // previous values rather than reporting a fresh zero — there is no
        // new estimate to report this frame, voiced or not.
        if best_n == 0 {
            return;
        }

        let mut period = best_n as f32 + interpolate3phase(&self.autocorr, best_n);
        if period < 8.0 {
            period = self.spectral_refine(period);
        }
        self.period_length = period;
        self.fidelity = interpolate3max(&self.autocorr, best_n);
    }

    /// Refines a short period using the quarter-spectrum snapshot taken
    /// before the inverse transform, searching a window around the
    /// harmonic bin the time-domain estimate predicts.
    fn spectral_refine(&self, period: f32) -> f32 {
        let expected_bin = self.fftsize as f32 / period;
        let lo = ((expected_bin * 0.8) as usize).max(1);
        let hi = ((expected_bin * 1.25) as usize).min(self.spectrumbuf.len().saturating_sub(2));
        if lo >= hi {
            return period;
        }
        let mut best_bin = lo;
        let mut best_power = self.spectrumbuf[lo];
        for bin in lo..=hi {
            if self.spectrumbuf[bin] > best_power {
                best_power = self.spectrumbuf[bin];
                best_bin = bin;
            }
        }
        if best_bin == 0 || best_bin + 1 >= self.spectrumbuf.len() {
            return period;
        }
        let (offset, _) = interpolate3(&self.spectrumbuf, best_bin);
        let refined_bin = best_bin as f32 + offset;
        if refined_bin > 0.0 {
            self.fftsize as f32 / refined_bin
        } else {
            period
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_wave_locks_onto_its_period() {
        let mut snac = Snac::new(1024, 1, 0.2, 0.003);
        let sr = 48_000.0f32;
        let freq = 220.0f32;
        for n in 0..8192 {
            let s = (2.0 * std::f32::consts::PI * freq * n as f32 / sr).sin();
            snac.tick(s);
        }
        let expected = sr / freq;
        assert!(
            (snac.period() - expected).abs() / expected < 0.05,
            "period={} expected={}",
            snac.period(),
            expected
        );
        assert!(snac.fidelity() > 0.9);
    }

    #[test]
    fn dc_input_is_non_periodic() {
        let mut snac = Snac::new(1024, 1, 0.2, 0.003);
        for _ in 0..4096 {
            snac.tick(0.7);
        }
        assert!(snac.fidelity() <= 0.5);
    }

    #[test]
    fn silence_reports_zero_fidelity() {
        let mut snac = Snac::new(1024, 1, 0.2, 0.003);
        for _ in 0..4096 {
            snac.tick(0.0);
        }
        assert_eq!(snac.fidelity(), 0.0);
    }
}
