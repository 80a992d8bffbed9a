//! Real-valued FFT backend for [`crate::snac`].
//!
//! The reference implementation calls straight into a Mayer-style packed
//! real FFT. We keep the teacher's seam (a small owning wrapper exposing
//! `forward`/`inverse`) but back it with `realfft`/`rustfft`, the pair
//! actually pinned in `Cargo.toml`. All scratch space and plans are built
//! once in [`RealFft::new`]; nothing after that allocates.

use num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Owns the forward/inverse plan pair and scratch space for one fixed FFT
/// length. `len` must be even (it always is here: `2 * framesize`).
pub struct RealFft {
    len: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    forward_scratch: Vec<Complex32>,
    inverse_scratch: Vec<Complex32>,
}

impl RealFft {
    /// Builds forward and inverse plans for real signals of length `len`.
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let forward_scratch = forward.make_scratch_vec();
        let inverse_scratch = inverse.make_scratch_vec();
        RealFft {
            len,
            forward,
            inverse,
            forward_scratch,
            inverse_scratch,
        }
    }

    /// Length of the real-valued time domain signal this plan operates on.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Length of the corresponding half-spectrum (`len / 2 + 1` complex bins).
    pub fn spectrum_len(&self) -> usize {
        self.len / 2 + 1
    }

    /// Forward real FFT. `input` (length `self.len()`) is consumed as
    /// scratch by the underlying planner; `output` (length
    /// `self.spectrum_len()`) receives the half-spectrum, DC and Nyquist
    /// bins included as purely-real complex values.
    pub fn forward(&mut self, input: &mut [f32], output: &mut [Complex32]) {
        self.forward
            .process_with_scratch(input, output, &mut self.forward_scratch)
            .expect("real FFT input/output/scratch length mismatch");
    }

    /// Inverse real FFT (unnormalized, like the forward transform above).
    /// `input` (length `self.spectrum_len()`) is consumed as scratch;
    /// `output` (length `self.len()`) receives the real time-domain signal.
    pub fn inverse(&mut self, input: &mut [Complex32], output: &mut [f32]) {
        self.inverse
            .process_with_scratch(input, output, &mut self.inverse_scratch)
            .expect("inverse FFT input/output/scratch length mismatch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_recovers_signal_up_to_scale() {
        let n = 64;
        let mut fft = RealFft::new(n);
        let mut signal: Vec<f32> = (0..n).map(|i| (i as f32 * 0.3).sin()).collect();
        let original = signal.clone();
        let mut spectrum = vec![Complex32::new(0.0, 0.0); fft.spectrum_len()];
        fft.forward(&mut signal, &mut spectrum);
        let mut restored = vec![0.0f32; n];
        fft.inverse(&mut spectrum, &mut restored);
        // realfft's forward+inverse pair is unnormalized: scales by len.
        for (r, o) in restored.iter().zip(original.iter()) {
            assert!((r / n as f32 - o).abs() < 1e-3);
        }
    }
}
