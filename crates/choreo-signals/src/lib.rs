//! # choreo-signals
//!
//! Motion-feature comparison engine for choreography and exercise videos.
//!
//! This crate provides:
//! - **Pose normalization**: translation/scale/rotation-invariant landmark frames
//! - **Motion features**: joint angles + smoothed angular velocity per frame
//! - **Banded DTW**: similarity scoring between two performances
//! - **Phrase segmentation**: energy-based cuts and per-phrase matching
//! - **Cross-modal sync**: audio vs. motion peak lag estimation
//!
//! ## Pipeline
//!
//! ```text
//! LandmarkStream ──► normalize ──► features ──► energy + trim ──► downsample ──► DTW
//!                                                   │
//!                                                   ├──► segment ──► phrase_match
//!                                                   └──► peaks ──┐
//! AudioInput ──► RMS envelope ──► peaks ─────────────────────────┴──► synchronize
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use choreo_signals::{compare_streams, CancelToken, ChoreoConfig};
//!
//! let config = ChoreoConfig::default();
//! let report = compare_streams(&stream_a, &stream_b, &config, &CancelToken::new())?;
//! println!("similarity {:.3} ({:?})", report.comparison.similarity, report.comparison.confidence);
//! ```

pub mod align;
pub mod config;
pub mod dsp;
pub mod motion;
pub mod pipeline;
pub mod pose;
pub mod quality;
pub mod sync;

pub use align::{
    compare, compare_pooled, dtw_cost, phrase_match, phrase_match_by_peaks, similarity_from_cost,
    Comparison, Confidence, DistanceMetric, LimbWeights, Phrase, PhraseCandidate,
    PooledComparison,
};
pub use config::{ChoreoConfig, ConfigError};
pub use dsp::{audio_peaks_ms, detect_peaks, moving_average, rms_envelope, AudioInput};
pub use motion::{downsample, motion_energy, segment, trim_range, Segment, SegmentReason, TrimRange};
pub use pipeline::{
    analyze_sync, compare_rhythm, compare_streams, CancelToken, ComparisonReport, SyncReport,
};
pub use pose::{
    extract_features, normalize_frame, BodyPart, FeatureSet, FrameVector, Joint, LandmarkFrame,
    LandmarkPoint, LandmarkStream, PoseBackend,
};
pub use quality::{QualityFlag, StabilityLabel, StabilityReport};
pub use sync::{estimate_lag, match_rate, synchronize, MultimodalComparison, SyncResult};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, ChoreoError>;

/// Errors surfaced by the engine.
///
/// Input insufficiency has its own variants so callers can ask for a
/// re-capture instead of treating it as a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum ChoreoError {
    #[error("insufficient landmarks: expected at least {expected}, got {got}")]
    InsufficientLandmarks { expected: usize, got: usize },

    #[error("audio input is empty")]
    EmptyAudio,

    #[error("no valid pose frames after extraction")]
    NoValidFrames,

    #[error("cannot align an empty sequence (len_a={len_a}, len_b={len_b})")]
    EmptySequence { len_a: usize, len_b: usize },

    #[error("feature width mismatch: {dims_a} vs {dims_b} columns")]
    DimensionMismatch { dims_a: usize, dims_b: usize },

    #[error("insufficient input: {0:?}")]
    InsufficientInput(Vec<QualityFlag>),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("processing cancelled")]
    Cancelled,
}

impl ChoreoError {
    /// Whether a better capture (more frames, visible body, audible track)
    /// could fix this error.
    pub fn is_input_insufficiency(&self) -> bool {
        matches!(
            self,
            ChoreoError::InsufficientLandmarks { .. }
                | ChoreoError::EmptyAudio
                | ChoreoError::NoValidFrames
                | ChoreoError::EmptySequence { .. }
                | ChoreoError::InsufficientInput(_)
        )
    }
}
