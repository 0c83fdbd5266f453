//! Result-quality flags and repeated-run stability
//!
//! Degraded input does not fail the pipeline by default. It is reported as
//! a flag next to the result so callers can decide whether to trust it.

use serde::{Deserialize, Serialize};

use crate::config::QualityConfig;

/// Quality issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Fewer valid frames than the configured minimum
    InsufficientFrames,
    /// Pose detected in too few of the supplied frames
    LowPoseConfidence,
    /// No frame produced a feature row
    ExtractionFailed,
    /// Both inputs are the same sequence
    IdenticalInput,
    /// Energy never rose above the trim threshold
    NoMotionDetected,
    /// Alignment distance was not finite
    DegenerateDistance,
}

impl QualityFlag {
    /// Flags that `hard_fail` turns into errors
    pub fn is_input_insufficiency(&self) -> bool {
        matches!(
            self,
            QualityFlag::InsufficientFrames
                | QualityFlag::LowPoseConfidence
                | QualityFlag::ExtractionFailed
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            QualityFlag::InsufficientFrames => "too few tracked frames",
            QualityFlag::LowPoseConfidence => "pose missing in many frames",
            QualityFlag::ExtractionFailed => "no usable pose frames",
            QualityFlag::IdenticalInput => "both inputs are identical",
            QualityFlag::NoMotionDetected => "no motion above the trim threshold",
            QualityFlag::DegenerateDistance => "alignment distance not finite",
        }
    }
}

/// Flags for one extracted video
pub fn assess_extraction(
    frames_total: usize,
    frames_valid: usize,
    no_motion: bool,
    config: &QualityConfig,
) -> Vec<QualityFlag> {
    let mut flags = Vec::new();

    if frames_valid == 0 {
        flags.push(QualityFlag::ExtractionFailed);
    }
    if frames_valid < config.min_frames {
        flags.push(QualityFlag::InsufficientFrames);
    }
    let pose_rate = if frames_total > 0 {
        frames_valid as f32 / frames_total as f32
    } else {
        0.0
    };
    if pose_rate < config.min_pose_rate {
        flags.push(QualityFlag::LowPoseConfidence);
    }
    if no_motion && frames_valid > 0 {
        flags.push(QualityFlag::NoMotionDetected);
    }

    flags
}

/// Append flags from `extra` not yet present in `flags`
pub fn merge_flags(flags: &mut Vec<QualityFlag>, extra: &[QualityFlag]) {
    for flag in extra {
        if !flags.contains(flag) {
            flags.push(*flag);
        }
    }
}

/// Stability label from repeated runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityLabel {
    High,
    Medium,
    Low,
}

/// Spread of similarity scores across repeated runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    /// Finite runs that entered the statistics
    pub similarity_runs: Vec<f32>,
    pub mean: f32,
    /// Population standard deviation
    pub std: f32,
    /// `clamp(1 - 2 * std, 0, 1)`
    pub confidence: f32,
    pub label: StabilityLabel,
}

impl StabilityReport {
    pub fn from_runs(runs: &[f32]) -> Self {
        let values: Vec<f32> = runs.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return Self {
                similarity_runs: vec![],
                mean: 0.0,
                std: 0.0,
                confidence: 0.0,
                label: StabilityLabel::Low,
            };
        }

        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        let std = variance.sqrt();
        let confidence = (1.0 - 2.0 * std).clamp(0.0, 1.0);
        let label = if confidence >= 0.85 {
            StabilityLabel::High
        } else if confidence >= 0.7 {
            StabilityLabel::Medium
        } else {
            StabilityLabel::Low
        };

        Self {
            similarity_runs: values,
            mean,
            std,
            confidence,
            label,
        }
    }
}
