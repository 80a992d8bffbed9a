//! Tuning constants and the runtime configuration surface.
//!
//! The reference keeps these as `#define`s in a header that was not part of
//! the retrieval pack handed to this crate; the numeric values below are
//! reconstructed from the call sites in the analysis source and from the
//! well-documented McLeod/Wyvill SNAC literature. See `DESIGN.md` for the
//! reasoning behind each one.

/// Fraction of a pulse's peak edges must exceed to be marked in the BACF
/// bitstream.
pub const PULSE_THRESHOLD: f32 = 0.6;

/// Scales the periodicity tolerance used when deciding whether a candidate
/// harmonic is "meaningfully" better than the current fundamental.
pub const HARMONIC_PERIODICITY_FACTOR: f32 = 3.0;

/// Fraction of the window's half-point used as the sub-collector's period
/// agreement tolerance.
pub const PERIODICITY_DIFF_FACTOR: f32 = 0.25;

/// Minimum periodicity required before a `PitchDetector` with no current
/// frequency will accept its first candidate.
pub const ONSET_PERIODICITY: f32 = 0.95;

/// Minimum periodicity required before a potential frequency shift may even
/// be considered (below this, the candidate is discarded outright).
pub const MIN_PERIODICITY: f32 = 0.5;

/// Fraction of `framesize` beyond which SNAC autocorrelation lags are
/// considered too unstable to trust and are zeroed.
pub const SEEK: f32 = 0.85;

/// Largest SNAC overlap factor supported.
pub const MAXOVERLAP: usize = 4;

/// Default SNAC overlap factor (frames analyzed per window).
pub const DEFOVERLAP: usize = 1;

/// Default SNAC first-peak bias.
pub const DEFBIAS: f32 = 0.2;

/// Default SNAC noise floor (fraction of full scale).
pub const DEFMINRMS: f32 = 0.003;

/// Default SNAC analysis frame size in samples (power of two).
pub const SNAC_FRAME_SIZE: usize = 1024;

/// Default `DualPitchDetector` bitstream-periodicity acceptance threshold.
pub const DEFAULT_PERIODICITY_THRESHOLD: f32 = 0.98;

/// Default `DualPitchDetector` SNAC-fidelity acceptance threshold.
pub const DEFAULT_FIDELITY_THRESHOLD: f32 = 0.98;

#[inline]
fn clamp01(x: f32) -> f32 {
    x.max(0.0).min(1.0)
}

/// Runtime-tunable configuration for a [`crate::dual_pitch_detector::DualPitchDetector`],
/// built with the builder methods below and consumed by its constructor.
///
/// Every setter enforces the clamping rules from the configuration table; no
/// setter can produce an invalid detector, so construction never fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchConfig {
    pub(crate) sample_rate: f32,
    pub(crate) lowest_freq: f32,
    pub(crate) highest_freq: f32,
    pub(crate) hysteresis_db: f32,
    pub(crate) overlap: usize,
    pub(crate) bias: f32,
    pub(crate) min_rms: f32,
    pub(crate) fidelity_threshold: f32,
    pub(crate) periodicity_threshold: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        PitchConfig {
            sample_rate: 48_000.0,
            lowest_freq: 60.0,
            highest_freq: 1000.0,
            hysteresis_db: -60.0,
            overlap: DEFOVERLAP,
            bias: DEFBIAS,
            min_rms: DEFMINRMS,
            fidelity_threshold: DEFAULT_FIDELITY_THRESHOLD,
            periodicity_threshold: DEFAULT_PERIODICITY_THRESHOLD,
        }
    }
}

impl PitchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample rate in Hz. Non-positive values are clamped to the default.
    pub fn sample_rate(mut self, sr: f32) -> Self {
        self.sample_rate = if sr > 0.0 { sr } else { 48_000.0 };
        self
    }

    /// Lowest frequency the detector should track; sets the ZCC window size
    /// (`2 * sample_rate / lowest_freq`) and the BACF scan range.
    pub fn lowest_freq(mut self, f: f32) -> Self {
        self.lowest_freq = f.max(1.0);
        self
    }

    /// Highest frequency the detector should track; sets `min_period` and the
    /// harmonic search range.
    pub fn highest_freq(mut self, f: f32) -> Self {
        self.highest_freq = f.max(1.0);
        self
    }

    /// Hysteresis in decibels, converted internally to a negative linear
    /// amplitude (the ZCC's lower arm).
    pub fn hysteresis_db(mut self, db: f32) -> Self {
        self.hysteresis_db = db;
        self
    }

    /// SNAC frames-per-window overlap. Must be one of {1,2,4}; anything else
    /// (including values above [`MAXOVERLAP`]) falls back to [`DEFOVERLAP`].
    pub fn overlap(mut self, overlap: usize) -> Self {
        self.overlap = match overlap {
            1 | 2 | 4 => overlap,
            _ => DEFOVERLAP,
        };
        self
    }

    /// SNAC first-peak preference, clamped to `[0, 1]`.
    pub fn bias(mut self, bias: f32) -> Self {
        self.bias = clamp01(bias);
        self
    }

    /// SNAC noise floor, clamped to `[0, 1]`.
    pub fn min_rms(mut self, min_rms: f32) -> Self {
        self.min_rms = clamp01(min_rms);
        self
    }

    /// Minimum SNAC fidelity the fusion layer requires to accept the FFT
    /// branch's candidate, clamped to `[0, 1]`.
    pub fn fidelity_threshold(mut self, t: f32) -> Self {
        self.fidelity_threshold = clamp01(t);
        self
    }

    /// Minimum bitstream periodicity the fusion layer requires, clamped to
    /// `[0, 1]`.
    pub fn periodicity_threshold(mut self, t: f32) -> Self {
        self.periodicity_threshold = clamp01(t);
        self
    }

    /// ZCC/BACF window size in samples: `2 * sample_rate / lowest_freq`,
    /// rounded up to a power of two.
    pub fn window_size(&self) -> usize {
        let raw = (2.0 * self.sample_rate / self.lowest_freq).ceil() as usize;
        raw.next_power_of_two()
    }

    /// Shortest period, in samples, the bitstream branch will accept.
    pub fn min_period(&self) -> f32 {
        self.sample_rate / self.highest_freq
    }

    /// Harmonic search bound: ratio of the longest to shortest trackable
    /// period.
    pub fn harmonic_range(&self) -> f32 {
        self.highest_freq / self.lowest_freq
    }

    /// Hysteresis as a negative linear amplitude.
    pub fn hysteresis_linear(&self) -> f32 {
        -crate::math::db_amp(self.hysteresis_db)
    }
}
