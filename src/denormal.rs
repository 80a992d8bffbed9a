//! Denormal prevention.

/// Attempt to set processor flags to prevent denormals.
#[inline]
pub fn prevent_denormals() {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        #[cfg(all(target_arch = "x86_64", target_feature = "sse"))]
        #[allow(deprecated)]
        use core::arch::x86_64::_mm_setcsr;

        #[cfg(all(target_arch = "x86", target_feature = "sse"))]
        use core::arch::x86::_mm_setcsr;

        // Treat denormals as zero while enabling all interrupt masks.
        #[allow(deprecated)]
        unsafe {
            _mm_setcsr(0x9fc0)
        };
    }
}

/// Smallest amplitude considered non-denormal for the follower/decay state
/// used throughout the bitstream branch. Values below this are flushed to
/// zero rather than left to decay as a hardware denormal.
pub const VERY_SMALL_FLOAT: f32 = 1.0e-30;

/// Flushes `x` to zero if its magnitude is below [`VERY_SMALL_FLOAT`].
#[inline]
pub fn flush(x: f32) -> f32 {
    if x.abs() < VERY_SMALL_FLOAT {
        0.0
    } else {
        x
    }
}
