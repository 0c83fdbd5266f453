//! Duration-normalized peak patterns for comparing two performances
//!
//! Two clips of different length can still share a rhythm: peak times are
//! divided by clip duration before matching.

use serde::{Deserialize, Serialize};

use super::lag::SyncResult;
use super::matching::greedy_match_rate;

/// Both scores at or above this count as "close"
pub const PATTERN_CLOSE_THRESHOLD: f32 = 0.7;

/// Peak times as fractions of the clip duration
pub fn normalize_peaks(peaks_ms: &[i64], duration_ms: i64) -> Vec<f32> {
    let denom = duration_ms.max(1) as f32;
    peaks_ms.iter().map(|&p| p as f32 / denom).collect()
}

/// Greedy nearest-unused matching of normalized peak positions.
pub fn pattern_similarity(a: &[f32], b: &[f32], tolerance: f32) -> f32 {
    greedy_match_rate(a, b, tolerance, |x, y| (y - x).abs())
}

/// How the audio and motion rhythms of two performances relate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternInterpretation {
    /// Both audio and motion peak patterns are close
    BothAligned,
    /// Same music, different movement rhythm
    AudioOnly,
    /// Same movement rhythm, different audio
    MotionOnly,
    Divergent,
}

impl PatternInterpretation {
    pub fn from_scores(audio_similarity: f32, motion_similarity: f32) -> Self {
        let audio_close = audio_similarity >= PATTERN_CLOSE_THRESHOLD;
        let motion_close = motion_similarity >= PATTERN_CLOSE_THRESHOLD;
        match (audio_close, motion_close) {
            (true, true) => PatternInterpretation::BothAligned,
            (true, false) => PatternInterpretation::AudioOnly,
            (false, true) => PatternInterpretation::MotionOnly,
            (false, false) => PatternInterpretation::Divergent,
        }
    }
}

/// Peak trains of one performance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakTrack {
    pub audio_peaks_ms: Vec<i64>,
    pub motion_peaks_ms: Vec<i64>,
    pub audio_duration_ms: i64,
    pub motion_duration_ms: i64,
}

/// Cross-performance rhythm comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultimodalComparison {
    pub audio_similarity: f32,
    pub motion_similarity: f32,
    pub interpretation: PatternInterpretation,
    /// Audio-vs-motion sync inside each performance
    pub sync_a: SyncResult,
    pub sync_b: SyncResult,
}

/// Compare the rhythm of two performances.
pub fn compare_patterns(
    a: &PeakTrack,
    b: &PeakTrack,
    sync_a: SyncResult,
    sync_b: SyncResult,
    audio_tolerance: f32,
    motion_tolerance: f32,
) -> MultimodalComparison {
    let audio_similarity = pattern_similarity(
        &normalize_peaks(&a.audio_peaks_ms, a.audio_duration_ms),
        &normalize_peaks(&b.audio_peaks_ms, b.audio_duration_ms),
        audio_tolerance,
    );
    let motion_similarity = pattern_similarity(
        &normalize_peaks(&a.motion_peaks_ms, a.motion_duration_ms),
        &normalize_peaks(&b.motion_peaks_ms, b.motion_duration_ms),
        motion_tolerance,
    );

    MultimodalComparison {
        audio_similarity,
        motion_similarity,
        interpretation: PatternInterpretation::from_scores(audio_similarity, motion_similarity),
        sync_a,
        sync_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_guards_zero_duration() {
        assert_eq!(normalize_peaks(&[0, 5], 0), vec![0.0, 5.0]);
        assert_eq!(normalize_peaks(&[500], 1000), vec![0.5]);
    }

    #[test]
    fn test_same_rhythm_different_tempo() {
        let a = normalize_peaks(&[1000, 2000, 3000], 4000);
        let b = normalize_peaks(&[2000, 4000, 6000], 8000);
        assert_relative_eq!(pattern_similarity(&a, &b, 0.02), 1.0);
    }

    #[test]
    fn test_interpretation() {
        assert_eq!(
            PatternInterpretation::from_scores(0.9, 0.7),
            PatternInterpretation::BothAligned
        );
        assert_eq!(
            PatternInterpretation::from_scores(0.9, 0.2),
            PatternInterpretation::AudioOnly
        );
        assert_eq!(
            PatternInterpretation::from_scores(0.1, 0.8),
            PatternInterpretation::MotionOnly
        );
        assert_eq!(
            PatternInterpretation::from_scores(0.1, 0.1),
            PatternInterpretation::Divergent
        );
    }

    #[test]
    fn test_compare_patterns() {
        let a = PeakTrack {
            audio_peaks_ms: vec![500, 1500],
            motion_peaks_ms: vec![520, 1530],
            audio_duration_ms: 2000,
            motion_duration_ms: 2000,
        };
        let b = PeakTrack {
            motion_peaks_ms: vec![100, 300],
            ..a.clone()
        };
        let sync = SyncResult {
            lag_ms: 0,
            match_rate: 1.0,
        };
        let r = compare_patterns(&a, &b, sync, sync, 0.02, 0.03);
        assert_relative_eq!(r.audio_similarity, 1.0);
        assert_relative_eq!(r.motion_similarity, 0.0);
        assert_eq!(r.interpretation, PatternInterpretation::AudioOnly);
    }
}
