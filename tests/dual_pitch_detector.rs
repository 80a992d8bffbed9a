//! End-to-end scenarios for the full fusion pipeline.

use periodica::prelude::*;

fn config(lowest: f32, highest: f32) -> PitchConfig {
    PitchConfig::new()
        .sample_rate(48_000.0)
        .lowest_freq(lowest)
        .highest_freq(highest)
        .hysteresis_db(-60.0)
}

#[test]
fn scenario_1_a440_sine() {
    let mut dpd = DualPitchDetector::new(&config(80.0, 1000.0));
    let sr = 48_000.0f32;
    for n in 0..4096u32 {
        let s = 0.5 * (2.0 * std::f32::consts::PI * 440.0 * n as f32 / sr).sin();
        dpd.tick(s);
    }
    assert!(
        dpd.frequency() >= 437.0 && dpd.frequency() <= 443.0,
        "frequency={}",
        dpd.frequency()
    );
}

#[test]
fn scenario_2_e2_bass() {
    let mut dpd = DualPitchDetector::new(&config(60.0, 1000.0));
    let sr = 48_000.0f32;
    for n in 0..8192u32 {
        let s = 0.5 * (2.0 * std::f32::consts::PI * 82.41 * n as f32 / sr).sin();
        dpd.tick(s);
    }
    assert!(
        dpd.frequency() >= 81.0 && dpd.frequency() <= 84.0,
        "frequency={}",
        dpd.frequency()
    );
}

#[test]
fn scenario_3_square_wave() {
    let mut dpd = DualPitchDetector::new(&config(80.0, 1000.0));
    let sr = 48_000.0f32;
    let freq = 220.0f32;
    for n in 0..16384u32 {
        let phase = (freq * n as f32 / sr).fract();
        let s = if phase < 0.5 { 0.8 } else { -0.8 };
        dpd.tick(s);
    }
    assert!(
        dpd.frequency() >= 215.0 && dpd.frequency() <= 225.0,
        "frequency={}",
        dpd.frequency()
    );
}

#[test]
fn scenario_4_gaussian_noise_never_locks() {
    let mut dpd = DualPitchDetector::new(&config(80.0, 1000.0));
    let mut rnd = funutd::Rnd::from_u64(42);
    for _ in 0..48_000u32 {
        let s = (rnd.f32() - 0.5) * 2.0;
        dpd.tick(s);
        assert!(dpd.periodicity() < 0.5, "periodicity={}", dpd.periodicity());
    }
}

#[test]
fn scenario_5_onset_from_silence() {
    let mut dpd = DualPitchDetector::new(&config(80.0, 1000.0));
    let sr = 48_000.0f32;
    let mut shift_resets = 0u32;
    let mut last_frames_since_shift = dpd.frames_since_shift();
    for n in 0..14096u32 {
        let s = if n < 10_000 {
            0.0
        } else {
            0.5 * (2.0 * std::f32::consts::PI * 440.0 * (n - 10_000) as f32 / sr).sin()
        };
        dpd.tick(s);
        if dpd.frames_since_shift() == 0 && last_frames_since_shift != 0 {
            shift_resets += 1;
        }
        last_frames_since_shift = dpd.frames_since_shift();
    }
    assert!(dpd.frequency() > 0.0);
    assert!((dpd.frequency() - 440.0).abs() < 10.0);
    assert!(shift_resets >= 1, "expected at least one onset shift");
}

#[test]
fn scenario_6_rising_ramp_is_mostly_monotonic() {
    let mut dpd = DualPitchDetector::new(&config(80.0, 1000.0));
    let sr = 48_000.0f32;
    let mut phase = 0.0f32;
    let mut last_freq = 0.0f32;
    let mut backtracks = 0u32;
    for n in 0..48_000u32 {
        let t = n as f32 / sr;
        let freq = 220.0 + (440.0 - 220.0) * t;
        phase += 2.0 * std::f32::consts::PI * freq / sr;
        let s = 0.5 * phase.sin();
        dpd.tick(s);
        if dpd.frequency() > 0.0 {
            if dpd.frequency() < last_freq - 1.0 {
                backtracks += 1;
            }
            last_freq = dpd.frequency();
        }
    }
    assert!(last_freq >= 437.0 && last_freq <= 443.0, "final={last_freq}");
    assert!(backtracks <= 3, "backtracks={backtracks}");
}
