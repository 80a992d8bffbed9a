use criterion::{black_box, criterion_group, criterion_main, Criterion};
use periodica::bacf::Bacf;
use periodica::bitset::Bitset;
use periodica::prelude::*;

fn dual_pitch_detector_bench(samples: usize) -> f32 {
    let config = PitchConfig::new()
        .sample_rate(48_000.0)
        .lowest_freq(80.0)
        .highest_freq(1000.0)
        .hysteresis_db(-60.0);
    let mut dpd = DualPitchDetector::new(&config);
    let mut acc = 0.0f32;
    for n in 0..samples {
        let s = 0.5 * (2.0 * std::f32::consts::PI * 440.0 * n as f32 / 48_000.0).sin();
        dpd.tick(s);
        acc += dpd.frequency();
    }
    acc
}

fn bacf_correlation_bench() -> u32 {
    let mut bits = Bitset::new(2048);
    for i in 0..bits.bit_size() {
        bits.set(i, (i * 7 + 3) % 11 < 5);
    }
    let bacf = Bacf::new(bits.word_count());
    let mut acc = 0u32;
    for lag in 1..512 {
        acc = acc.wrapping_add(bacf.correlation(&bits, lag));
    }
    acc
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("dual_pitch_detector_tick", |b| {
        b.iter(|| dual_pitch_detector_bench(black_box(4096)))
    });
    c.bench_function("bacf_correlation", |b| {
        b.iter(|| bacf_correlation_bench())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
