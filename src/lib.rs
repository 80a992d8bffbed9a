//! Sample-accurate pitch and periodicity tracking.
//!
//! Two branches run on the same single-sample input stream: an FFT-based
//! normalized autocorrelation estimator ([`snac`]) windowed by [`env_pd`],
//! and a bit-packed zero-crossing autocorrelation estimator ([`bacf`],
//! [`zero_crossing`]) arbitrated by [`period_detector`] and
//! [`pitch_detector`]. [`dual_pitch_detector`] reconciles the two into a
//! single frequency and periodicity estimate per window.
//!
//! All state is allocated once at construction (optionally from a
//! caller-supplied [`arena::Arena`]); `tick` methods never allocate.

pub mod arena;
pub mod bacf;
pub mod bitset;
pub mod config;
pub mod denormal;
pub mod dual_pitch_detector;
pub mod env_pd;
pub mod envelope_follower;
pub mod fft;
pub mod math;
pub mod period_detection;
pub mod period_detector;
pub mod pitch_detector;
pub mod prelude;
pub mod snac;
pub mod zero_crossing;
