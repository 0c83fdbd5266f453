//! Landmark input contracts and BlazePose joint indices
//!
//! The engine never runs a pose model. Clients inject per-frame landmark
//! sets from MediaPipe, MoveNet-style keypoint models or any other source
//! that follows the 33-point BlazePose schema.

use serde::{Deserialize, Serialize};

/// MediaPipe BlazePose 33 landmark indices
pub mod indices {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;

    /// Fewer points than this means the pose was not detected
    pub const MIN_LANDMARKS: usize = 25;
    /// Full BlazePose landmark count
    pub const BLAZEPOSE_COUNT: usize = 33;
}

/// Single detector output point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    /// Depth, only present for 3D backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Visibility / score (0-1)
    #[serde(
        default = "default_confidence",
        alias = "score",
        alias = "visibility",
        alias = "v"
    )]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, z: None, confidence }
    }

    pub fn with_depth(x: f32, y: f32, z: f32, confidence: f32) -> Self {
        Self { x, y, z: Some(z), confidence }
    }
}

/// Landmarks detected in one video frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    #[serde(default)]
    pub timestamp_ms: i64,
    #[serde(default, alias = "keypoints")]
    pub landmarks: Vec<LandmarkPoint>,
}

impl LandmarkFrame {
    pub fn new(timestamp_ms: i64, landmarks: Vec<LandmarkPoint>) -> Self {
        Self { timestamp_ms, landmarks }
    }
}

/// Which kind of detector produced the stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseBackend {
    /// MediaPipe Pose: 33 points with relative depth
    #[default]
    MediaPipe3d,
    /// 2D keypoint model: depth is ignored even if present
    Keypoints2d,
}

impl PoseBackend {
    pub fn has_depth(&self) -> bool {
        matches!(self, PoseBackend::MediaPipe3d)
    }
}

/// A whole clip of landmark frames sampled at a nominal rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkStream {
    #[serde(default)]
    pub backend: PoseBackend,
    #[serde(default = "default_sample_fps")]
    pub sample_fps: f32,
    pub frames: Vec<LandmarkFrame>,
}

fn default_sample_fps() -> f32 {
    10.0
}

impl LandmarkStream {
    pub fn new(backend: PoseBackend, sample_fps: f32, frames: Vec<LandmarkFrame>) -> Self {
        Self { backend, sample_fps, frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Nominal clip duration derived from the frame timestamps
    pub fn duration_ms(&self) -> i64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => (last.timestamp_ms - first.timestamp_ms).max(0),
            _ => 0,
        }
    }
}
