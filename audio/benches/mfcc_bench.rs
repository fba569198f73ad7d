use criterion::{black_box, criterion_group, criterion_main, Criterion};
use examgate_audio::{extract_mfcc, MfccConfig};

fn bench_mfcc(c: &mut Criterion) {
    // 5 seconds of synthetic speechy signal at 16 kHz.
    let samples: Vec<f32> = (0..80_000)
        .map(|i| {
            let t = i as f32 / 16000.0;
            0.4 * (2.0 * std::f32::consts::PI * 180.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 1100.0 * t).sin()
        })
        .collect();
    let cfg = MfccConfig::default();

    c.bench_function("mfcc_5s_16k", |b| {
        b.iter(|| extract_mfcc(black_box(&samples), black_box(&cfg)))
    });
}

criterion_group!(benches, bench_mfcc);
criterion_main!(benches);
