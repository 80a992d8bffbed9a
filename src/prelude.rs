//! Convenience re-exports of the types most callers need.

pub use crate::config::PitchConfig;
pub use crate::dual_pitch_detector::{DualPitchDetector, PitchEstimate};
pub use crate::period_detection::PeriodDetection;
pub use crate::period_detector::{PeriodDetector, PeriodInfo};
pub use crate::pitch_detector::{PitchDetector, PitchInfo};
