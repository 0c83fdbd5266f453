use choreo_signals::align::{dtw_cost, FrameDistance};
use choreo_signals::pose::{indices, FEATURE_DIM};
use choreo_signals::{
    compare, extract_features, CancelToken, ChoreoConfig, DistanceMetric, LandmarkFrame,
    LandmarkPoint, LandmarkStream, LimbWeights, PoseBackend,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;

fn wave(n: usize, phase: f32) -> Array2<f32> {
    Array2::from_shape_fn((n, FEATURE_DIM), |(i, j)| {
        (i as f32 * 0.07 + j as f32 * 0.3 + phase).sin()
    })
}

fn stream(n: usize) -> LandmarkStream {
    let frames = (0..n)
        .map(|i| {
            let bend = (i as f32 * 0.15).sin().abs() * 1.4;
            let mut lm = vec![LandmarkPoint::new(0.5, 0.5, 1.0); indices::BLAZEPOSE_COUNT];
            lm[indices::LEFT_SHOULDER] = LandmarkPoint::new(0.6, 0.3, 1.0);
            lm[indices::RIGHT_SHOULDER] = LandmarkPoint::new(0.4, 0.3, 1.0);
            lm[indices::LEFT_ELBOW] = LandmarkPoint::new(0.7, 0.3, 1.0);
            lm[indices::RIGHT_ELBOW] = LandmarkPoint::new(0.3, 0.3, 1.0);
            lm[indices::LEFT_WRIST] =
                LandmarkPoint::new(0.7 + 0.1 * bend.cos(), 0.3 - 0.1 * bend.sin(), 1.0);
            lm[indices::RIGHT_WRIST] =
                LandmarkPoint::new(0.3 - 0.1 * bend.cos(), 0.3 - 0.1 * bend.sin(), 1.0);
            lm[indices::LEFT_HIP] = LandmarkPoint::new(0.58, 0.6, 1.0);
            lm[indices::RIGHT_HIP] = LandmarkPoint::new(0.42, 0.6, 1.0);
            lm[indices::LEFT_KNEE] = LandmarkPoint::new(0.58, 0.75, 1.0);
            lm[indices::RIGHT_KNEE] = LandmarkPoint::new(0.42, 0.75, 1.0);
            lm[indices::LEFT_ANKLE] = LandmarkPoint::new(0.58, 0.9, 1.0);
            lm[indices::RIGHT_ANKLE] = LandmarkPoint::new(0.42, 0.9, 1.0);
            LandmarkFrame::new(i as i64 * 100, lm)
        })
        .collect();
    LandmarkStream::new(PoseBackend::MediaPipe3d, 10.0, frames)
}

fn benchmark_dtw_band(c: &mut Criterion) {
    let a = wave(300, 0.0);
    let b = wave(280, 0.4);
    let dist = FrameDistance::new(
        DistanceMetric::WeightedEuclidean,
        &LimbWeights::default(),
        FEATURE_DIM,
    );

    let mut group = c.benchmark_group("dtw_band");
    for band in [5usize, 20, 80, 300] {
        group.bench_with_input(BenchmarkId::from_parameter(band), &band, |bench, &band| {
            bench.iter(|| dtw_cost(black_box(&a), black_box(&b), band, &dist))
        });
    }
    group.finish();
}

/// Long inputs go through the frame cap first
fn benchmark_compare_capped(c: &mut Criterion) {
    let a = wave(3000, 0.0);
    let b = wave(2400, 0.2);
    let weights = LimbWeights::default();

    c.bench_function("compare_3000x2400", |bench| {
        bench.iter(|| compare(black_box(&a), black_box(&b), &weights, 0.8, 10))
    });
}

fn benchmark_extract(c: &mut Criterion) {
    let input = stream(600);
    let config = ChoreoConfig::default();
    let cancel = CancelToken::new();

    c.bench_function("extract_features_600", |bench| {
        bench.iter(|| extract_features(black_box(&input), &config, &cancel))
    });
}

criterion_group!(
    benches,
    benchmark_dtw_band,
    benchmark_compare_capped,
    benchmark_extract
);
criterion_main!(benches);
