//! End-to-end pipelines
//!
//! The two per-video extraction pipelines share nothing mutable, so they
//! run side by side (`parallel` feature) and meet at the DTW join point.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::align::{
    compare_pooled, compare_with_config, phrase_match, Comparison, Phrase, PooledComparison,
};
use crate::config::ChoreoConfig;
use crate::dsp::{audio_peaks_ms, AudioInput};
use crate::motion::{segment_with_config, Segment, TrimRange};
use crate::pose::{extract_features, FeatureSet, LandmarkStream};
use crate::quality::{merge_flags, QualityFlag};
use crate::sync::{compare_patterns, synchronize_with_config, MultimodalComparison, PeakTrack, SyncResult};
use crate::{ChoreoError, Result};

/// Cooperative cancellation shared between a caller and running stages
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(feature = "parallel")]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

#[cfg(not(feature = "parallel"))]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB,
{
    (a(), b())
}

/// Extraction summary for one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub frames_total: usize,
    pub frames_valid: usize,
    /// Frames left after trimming
    pub frames_retained: usize,
    pub pose_rate: f32,
    pub trim_range: TrimRange,
    pub flags: Vec<QualityFlag>,
}

impl From<&FeatureSet> for VideoSummary {
    fn from(set: &FeatureSet) -> Self {
        Self {
            frames_total: set.frames_total,
            frames_valid: set.frames_valid,
            frames_retained: set.len(),
            pose_rate: set.pose_rate(),
            trim_range: set.trim_range,
            flags: set.flags.clone(),
        }
    }
}

/// Everything known about how performance B relates to performance A
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub comparison: Comparison,
    pub pooled: PooledComparison,
    pub segments_a: Vec<Segment>,
    pub segments_b: Vec<Segment>,
    pub phrases: Vec<Phrase>,
    pub video_a: VideoSummary,
    pub video_b: VideoSummary,
    /// Union of per-video and alignment flags
    pub flags: Vec<QualityFlag>,
}

/// Extract both streams, align them and match phrases.
pub fn compare_streams(
    a: &LandmarkStream,
    b: &LandmarkStream,
    config: &ChoreoConfig,
    cancel: &CancelToken,
) -> Result<ComparisonReport> {
    config.validate()?;

    let (set_a, set_b) = join(
        || extract_features(a, config, cancel),
        || extract_features(b, config, cancel),
    );
    let (set_a, set_b) = (set_a?, set_b?);
    compare_feature_sets(&set_a, &set_b, config, cancel)
}

/// Align two already-extracted feature sets.
pub fn compare_feature_sets(
    set_a: &FeatureSet,
    set_b: &FeatureSet,
    config: &ChoreoConfig,
    cancel: &CancelToken,
) -> Result<ComparisonReport> {
    if set_a.is_empty() || set_b.is_empty() {
        log::warn!(
            "compare: no usable frames (a={}, b={})",
            set_a.len(),
            set_b.len()
        );
        return Err(ChoreoError::NoValidFrames);
    }
    if cancel.is_cancelled() {
        return Err(ChoreoError::Cancelled);
    }

    let comparison = compare_with_config(&set_a.features, &set_b.features, &config.compare)?;
    let pooled = compare_pooled(&set_a.features, &set_b.features);

    let segments_a = segment_with_config(
        &set_a.motion_energy.to_vec(),
        set_a.sample_fps,
        &config.segment,
    );
    let segments_b = segment_with_config(
        &set_b.motion_energy.to_vec(),
        set_b.sample_fps,
        &config.segment,
    );
    if cancel.is_cancelled() {
        return Err(ChoreoError::Cancelled);
    }
    let phrases = phrase_match(set_a, set_b, &segments_a, &segments_b, config);

    let mut flags = set_a.flags.clone();
    merge_flags(&mut flags, &set_b.flags);
    merge_flags(&mut flags, &comparison.flags);

    log::info!(
        "compare: similarity {:.3} ({:?}), {} phrases",
        comparison.similarity,
        comparison.confidence,
        phrases.len()
    );

    Ok(ComparisonReport {
        comparison,
        pooled,
        segments_a,
        segments_b,
        phrases,
        video_a: VideoSummary::from(set_a),
        video_b: VideoSummary::from(set_b),
        flags,
    })
}

/// Audio-vs-motion sync of a single performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub sync: SyncResult,
    pub audio_peaks_ms: Vec<i64>,
    pub motion_peaks_ms: Vec<i64>,
    pub audio_duration_ms: i64,
    pub motion_duration_ms: i64,
    pub flags: Vec<QualityFlag>,
}

impl SyncReport {
    fn peak_track(&self) -> PeakTrack {
        PeakTrack {
            audio_peaks_ms: self.audio_peaks_ms.clone(),
            motion_peaks_ms: self.motion_peaks_ms.clone(),
            audio_duration_ms: self.audio_duration_ms,
            motion_duration_ms: self.motion_duration_ms,
        }
    }
}

/// Estimate how far the movement trails the music and how many beats it hits.
pub fn analyze_sync(
    stream: &LandmarkStream,
    audio: &AudioInput,
    config: &ChoreoConfig,
    cancel: &CancelToken,
) -> Result<SyncReport> {
    config.validate()?;

    let (features, audio_peaks) = join(
        || extract_features(stream, config, cancel),
        || audio_peaks_ms(audio, &config.sync),
    );
    let set = features?;
    let audio_peaks = audio_peaks?;

    let motion_peaks = set.motion_peaks_ms(config.sync.motion_min_distance, config.sync.max_peaks);
    let sync = synchronize_with_config(&audio_peaks, &motion_peaks, &config.sync);

    log::info!(
        "sync: lag {} ms, match rate {:.3}",
        sync.lag_ms,
        sync.match_rate
    );

    Ok(SyncReport {
        sync,
        audio_peaks_ms: audio_peaks,
        motion_peaks_ms: motion_peaks,
        audio_duration_ms: audio.duration_ms(),
        motion_duration_ms: stream.duration_ms(),
        flags: set.flags,
    })
}

/// Compare the audio and motion rhythm of two performances.
pub fn compare_rhythm(
    a: (&LandmarkStream, &AudioInput),
    b: (&LandmarkStream, &AudioInput),
    config: &ChoreoConfig,
    cancel: &CancelToken,
) -> Result<MultimodalComparison> {
    let (report_a, report_b) = join(
        || analyze_sync(a.0, a.1, config, cancel),
        || analyze_sync(b.0, b.1, config, cancel),
    );
    let (report_a, report_b) = (report_a?, report_b?);

    Ok(compare_patterns(
        &report_a.peak_track(),
        &report_b.peak_track(),
        report_a.sync,
        report_b.sync,
        config.sync.audio_pattern_tolerance,
        config.sync.motion_pattern_tolerance,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{indices, LandmarkFrame, LandmarkPoint, PoseBackend};

    fn frame(t: i64, bend: f32) -> LandmarkFrame {
        let mut lm = vec![LandmarkPoint::new(0.5, 0.5, 1.0); 33];
        lm[indices::LEFT_SHOULDER] = LandmarkPoint::new(0.6, 0.3, 1.0);
        lm[indices::RIGHT_SHOULDER] = LandmarkPoint::new(0.4, 0.3, 1.0);
        lm[indices::LEFT_ELBOW] = LandmarkPoint::new(0.7, 0.3, 1.0);
        lm[indices::RIGHT_ELBOW] = LandmarkPoint::new(0.3, 0.3, 1.0);
        lm[indices::LEFT_WRIST] = LandmarkPoint::new(0.7 + 0.1 * bend.cos(), 0.3 - 0.1 * bend.sin(), 1.0);
        lm[indices::RIGHT_WRIST] = LandmarkPoint::new(0.3 - 0.1 * bend.cos(), 0.3 - 0.1 * bend.sin(), 1.0);
        lm[indices::LEFT_HIP] = LandmarkPoint::new(0.58, 0.6, 1.0);
        lm[indices::RIGHT_HIP] = LandmarkPoint::new(0.42, 0.6, 1.0);
        lm[indices::LEFT_KNEE] = LandmarkPoint::new(0.58, 0.75, 1.0);
        lm[indices::RIGHT_KNEE] = LandmarkPoint::new(0.42, 0.75, 1.0);
        lm[indices::LEFT_ANKLE] = LandmarkPoint::new(0.58, 0.9, 1.0);
        lm[indices::RIGHT_ANKLE] = LandmarkPoint::new(0.42, 0.9, 1.0);
        LandmarkFrame::new(t, lm)
    }

    fn dance(n: usize, speed: f32) -> LandmarkStream {
        let frames = (0..n)
            .map(|i| frame(i as i64 * 100, (i as f32 * speed).sin().abs() * 1.4))
            .collect();
        LandmarkStream::new(PoseBackend::Keypoints2d, 10.0, frames)
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_compare_same_dance() {
        let a = dance(100, 0.15);
        let report =
            compare_streams(&a, &a, &ChoreoConfig::default(), &CancelToken::new()).unwrap();
        assert!((report.comparison.similarity - 1.0).abs() < 1e-6);
        assert!(report.flags.contains(&QualityFlag::IdenticalInput));
        assert!(!report.segments_a.is_empty());
        assert_eq!(report.phrases.len(), report.segments_a.len());
    }

    #[test]
    fn test_different_dances_score_lower() {
        let a = dance(100, 0.15);
        let b = dance(100, 0.45);
        let config = ChoreoConfig::default();
        let same = compare_streams(&a, &a, &config, &CancelToken::new()).unwrap();
        let diff = compare_streams(&a, &b, &config, &CancelToken::new()).unwrap();
        assert!(diff.comparison.similarity < same.comparison.similarity);
    }

    #[test]
    fn test_no_pose_is_no_valid_frames() {
        let a = dance(80, 0.15);
        let mut b = dance(80, 0.15);
        for f in b.frames.iter_mut() {
            f.landmarks.truncate(5);
        }
        let result = compare_streams(&a, &b, &ChoreoConfig::default(), &CancelToken::new());
        assert!(matches!(result, Err(ChoreoError::NoValidFrames)));
    }

    #[test]
    fn test_invalid_config_rejected_first() {
        let mut config = ChoreoConfig::default();
        config.compare.alpha = -1.0;
        let a = dance(10, 0.1);
        let result = compare_streams(&a, &a, &config, &CancelToken::new());
        assert!(matches!(result, Err(ChoreoError::Config(_))));
    }

    #[test]
    fn test_cancelled_compare() {
        let token = CancelToken::new();
        token.cancel();
        let a = dance(80, 0.15);
        let result = compare_streams(&a, &a, &ChoreoConfig::default(), &token);
        assert!(matches!(result, Err(ChoreoError::Cancelled)));
    }

    #[test]
    fn test_analyze_sync_empty_audio() {
        let audio = AudioInput::Envelope {
            rms: vec![],
            hop_samples: 400,
            window_samples: 800,
            sample_rate: 16_000,
        };
        let result = analyze_sync(&dance(80, 0.15), &audio, &ChoreoConfig::default(), &CancelToken::new());
        assert!(matches!(result, Err(ChoreoError::EmptyAudio)));
    }

    #[test]
    fn test_analyze_sync_reports_peaks() {
        // One envelope frame per 25 ms, a beat every 1000 ms
        let rms: Vec<f32> = (0..400).map(|i| if i % 40 == 20 { 1.0 } else { 0.05 }).collect();
        let audio = AudioInput::Envelope {
            rms,
            hop_samples: 400,
            window_samples: 800,
            sample_rate: 16_000,
        };
        let report =
            analyze_sync(&dance(100, 0.15), &audio, &ChoreoConfig::default(), &CancelToken::new())
                .unwrap();
        assert_eq!(report.audio_peaks_ms.len(), 10);
        assert_eq!(report.audio_peaks_ms[0], 500);
        assert!(!report.motion_peaks_ms.is_empty());
        assert!((0.0..=1.0).contains(&report.sync.match_rate));
    }

    #[test]
    fn test_compare_rhythm_self() {
        let rms: Vec<f32> = (0..400).map(|i| if i % 40 == 20 { 1.0 } else { 0.05 }).collect();
        let audio = AudioInput::Envelope {
            rms,
            hop_samples: 400,
            window_samples: 800,
            sample_rate: 16_000,
        };
        let stream = dance(100, 0.15);
        let r = compare_rhythm(
            (&stream, &audio),
            (&stream, &audio),
            &ChoreoConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert!((r.audio_similarity - 1.0).abs() < 1e-6);
        assert!((r.motion_similarity - 1.0).abs() < 1e-6);
        assert_eq!(r.interpretation, crate::sync::PatternInterpretation::BothAligned);
    }
}
