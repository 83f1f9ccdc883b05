//! Detection cost per window.
//!
//! ```bash
//! cargo bench -p tuner-core --bench detect_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tuner_core::audio::sine_wave;
use tuner_core::tuning::Pitch;
use tuner_core::{AutocorrelationDetector, CorrelationMethod, DetectorConfig};

const SAMPLE_RATE: u32 = 44100;

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");

    for window_size in [1024, 2048, 4096] {
        let window = sine_wave(440.0, SAMPLE_RATE, window_size, 0.8);

        for (label, method) in [("direct", CorrelationMethod::Direct), ("fft", CorrelationMethod::Fft)] {
            let mut detector = AutocorrelationDetector::new(DetectorConfig {
                window_size,
                method,
                ..DetectorConfig::default()
            });
            group.bench_function(BenchmarkId::new(label, window_size), |b| {
                b.iter(|| detector.detect(black_box(&window), SAMPLE_RATE))
            });
        }
    }

    group.finish();
}

fn bench_pitch(c: &mut Criterion) {
    c.bench_function("pitch/derive", |b| {
        b.iter(|| {
            let pitch = Pitch::new(black_box(329.63));
            (pitch.note_name(), pitch.octave(), pitch.deviation_cents())
        })
    });
}

criterion_group!(benches, bench_detect, bench_pitch);
criterion_main!(benches);
