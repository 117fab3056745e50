use criterion::{criterion_group, criterion_main, Criterion};
use gingham_chessboard::{chess_response, ChessboardDetector, DetectorConfig, Pattern};
use gingham_core::synthetic::{ChessboardTarget, DotGridTarget};
use std::hint::black_box;

fn bench_detector(c: &mut Criterion) {
    let img = ChessboardTarget::new((100.0, 40.0), 36.0, (8, 8)).render(640, 480);
    let detector = ChessboardDetector::new(DetectorConfig::default()).expect("default config");

    c.bench_function("chess_response_640x480", |b| {
        b.iter(|| chess_response(black_box(&img)))
    });
    c.bench_function("detect_640x480", |b| {
        b.iter(|| detector.detect(black_box(&img)))
    });

    let dots = DotGridTarget::new((100.0, 40.0), 48.0, 20.0, (7, 7)).render(640, 480);
    let circles = ChessboardDetector::new(DetectorConfig {
        pattern: Pattern::CircleGrid,
        ..Default::default()
    })
    .expect("circle grid config");
    c.bench_function("detect_circle_grid_640x480", |b| {
        b.iter(|| circles.detect(black_box(&dots)))
    });
}

criterion_group!(benches, bench_detector);
criterion_main!(benches);
