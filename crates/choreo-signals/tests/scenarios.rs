use std::f32::consts::FRAC_PI_4;
use std::io::Write;

use approx::assert_relative_eq;
use choreo_signals::pose::FEATURE_DIM;
use choreo_signals::{
    compare, compare_pooled, estimate_lag, extract_features, normalize_frame, synchronize,
    CancelToken, ChoreoConfig, ChoreoError, Confidence, LandmarkFrame, LandmarkPoint,
    LandmarkStream, LimbWeights, PoseBackend, QualityFlag, StabilityLabel, StabilityReport,
};
use ndarray::Array2;

/// Torso tilt ramping from 0 to pi/4, with the matching constant delta column
fn torso_ramp(n: usize) -> Array2<f32> {
    let step = FRAC_PI_4 / (n - 1) as f32;
    let mut x = Array2::zeros((n, FEATURE_DIM));
    for i in 0..n {
        x[[i, 4]] = i as f32 * step;
        x[[i, 9]] = 1.5 * step;
    }
    x
}

#[test]
fn identical_zero_sequences_match_exactly() {
    let x = Array2::<f32>::zeros((50, FEATURE_DIM));
    let r = compare(&x, &x, &LimbWeights::default(), 0.8, 10).unwrap();
    assert_eq!(r.dtw_cost, 0.0);
    assert_eq!(r.similarity, 1.0);
    assert_eq!(r.confidence, Confidence::High);
    assert!(r.flags.contains(&QualityFlag::IdenticalInput));
}

#[test]
fn time_stretched_ramp_stays_similar() {
    let a = torso_ramp(50);
    let b = torso_ramp(70);
    let r = compare(&a, &b, &LimbWeights::default(), 0.8, 10).unwrap();
    assert!(r.similarity > 0.85, "similarity {}", r.similarity);
    // Length gap widens the band
    assert_eq!(r.band, 20);
}

#[test]
fn constant_offset_is_recovered() {
    let audio = [100, 600, 1100];
    let motion = [150, 650, 1150];
    assert_eq!(estimate_lag(&audio, &motion), 50);
    let r = synchronize(&audio, &motion, 100);
    assert_eq!(r.lag_ms, 50);
    assert_relative_eq!(r.match_rate, 1.0);
}

#[test]
fn empty_peak_trains_give_zero_lag() {
    let r = synchronize(&[], &[100, 200], 100);
    assert_eq!(r.lag_ms, 0);
    assert_eq!(r.match_rate, 0.0);
}

#[test]
fn sparse_frames_are_dropped_without_error() {
    let sparse = vec![LandmarkPoint::new(0.5, 0.5, 1.0); 10];
    assert!(normalize_frame(&sparse, true).is_none());

    let frames = (0..30)
        .map(|i| LandmarkFrame::new(i * 100, sparse.clone()))
        .collect();
    let stream = LandmarkStream::new(PoseBackend::MediaPipe3d, 10.0, frames);
    let set = extract_features(&stream, &ChoreoConfig::default(), &CancelToken::new()).unwrap();
    assert!(set.is_empty());
    assert_eq!(set.frames_total, 30);
    assert!(set.has_flag(QualityFlag::ExtractionFailed));
}

#[test]
fn sparse_frames_fail_hard_when_configured() {
    let sparse = vec![LandmarkPoint::new(0.5, 0.5, 1.0); 10];
    let stream = LandmarkStream::new(
        PoseBackend::Keypoints2d,
        10.0,
        vec![LandmarkFrame::new(0, sparse)],
    );
    let mut config = ChoreoConfig::default();
    config.quality.hard_fail = true;
    let err = extract_features(&stream, &config, &CancelToken::new()).unwrap_err();
    assert!(err.is_input_insufficiency());
    assert!(matches!(err, ChoreoError::InsufficientInput(ref f) if f.contains(&QualityFlag::ExtractionFailed)));
}

#[test]
fn stream_json_accepts_detector_aliases() {
    let json = r#"{
        "backend": "keypoints2d",
        "sample_fps": 15,
        "frames": [
            {"timestamp_ms": 0, "keypoints": [{"x": 0.1, "y": 0.2, "score": 0.9}]},
            {"timestamp_ms": 66, "landmarks": [{"x": 0.3, "y": 0.4}]}
        ]
    }"#;
    let stream: LandmarkStream = serde_json::from_str(json).unwrap();
    assert_eq!(stream.backend, PoseBackend::Keypoints2d);
    assert_eq!(stream.len(), 2);
    assert_relative_eq!(stream.frames[0].landmarks[0].confidence, 0.9);
    assert_relative_eq!(stream.frames[1].landmarks[0].confidence, 1.0);
    assert_eq!(stream.duration_ms(), 66);
}

#[test]
fn pooled_identity() {
    let x = torso_ramp(40);
    let r = compare_pooled(&x, &x);
    assert_relative_eq!(r.similarity, 1.0, epsilon = 1e-5);
    assert_eq!(r.confidence, Confidence::High);
}

#[test]
fn stability_labels() {
    assert_eq!(StabilityReport::from_runs(&[0.9, 0.9, 0.9]).label, StabilityLabel::High);
    // std 0.1 -> confidence 0.8
    assert_eq!(StabilityReport::from_runs(&[0.7, 0.9]).label, StabilityLabel::Medium);
    assert_eq!(StabilityReport::from_runs(&[0.2, 0.9]).label, StabilityLabel::Low);
    assert_eq!(StabilityReport::from_runs(&[]).label, StabilityLabel::Low);
}

#[test]
fn config_file_with_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[compare]\nalpha = 1.5\nband = 12\n\n[sync]\ntolerance_ms = 80").unwrap();

    let mut config = ChoreoConfig::from_file(file.path()).unwrap();
    assert_relative_eq!(config.compare.alpha, 1.5);
    assert_eq!(config.compare.band, 12);
    assert_eq!(config.sync.tolerance_ms, 80);
    // Untouched sections keep their defaults
    assert_eq!(config.quality.min_frames, 60);

    config
        .apply_overrides_from(|key| match key {
            "CHOREO_COMPARE_BAND" => Some("4".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.compare.band, 4);

    let round_trip = ChoreoConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
    assert_eq!(round_trip.compare.band, 4);
    assert_relative_eq!(round_trip.compare.alpha, 1.5);
}

#[test]
fn invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[compare]\nalpha = 0.0").unwrap();
    assert!(ChoreoConfig::from_file(file.path()).is_err());
}
