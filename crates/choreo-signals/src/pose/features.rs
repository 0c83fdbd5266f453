//! Per-frame motion features
//!
//! Layout of one feature row (k = 5 angles, 2k = 10 dims):
//!
//! | dims | meaning |
//! |------|---------|
//! | 0-1  | left / right elbow angle |
//! | 2-3  | left / right knee angle |
//! | 4    | torso tilt from vertical |
//! | 5-9  | smoothed per-frame change of dims 0-4, scaled by `dangle_weight` |
//!
//! Angles are in radians and weighted by the weakest landmark confidence
//! that went into them, so poorly tracked limbs pull toward zero.

use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};

use super::landmarks::{indices, LandmarkPoint, LandmarkStream};
use super::normalize::{normalize_frame_with_depth, FrameVector};
use crate::config::{ChoreoConfig, ConfigError};
use crate::dsp::{detect_peaks, row_delta, smooth_columns};
use crate::motion::{motion_energy, trim_range, TrimRange};
use crate::pipeline::CancelToken;
use crate::quality::{assess_extraction, QualityFlag};
use crate::{ChoreoError, Result};

/// Number of angle features per frame
pub const ANGLE_COUNT: usize = 5;
/// Full feature row width (angles + deltas)
pub const FEATURE_DIM: usize = 2 * ANGLE_COUNT;

/// Vectors shorter than this are treated as degenerate
const VECTOR_EPSILON: f32 = 1e-6;

/// Joints that carry an angle feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    LeftElbow,
    RightElbow,
    LeftKnee,
    RightKnee,
    Torso,
}

impl Joint {
    pub const ALL: [Joint; ANGLE_COUNT] = [
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::Torso,
    ];

    /// Column of the angle feature; the delta sits at `+ ANGLE_COUNT`
    pub fn angle_index(&self) -> usize {
        match self {
            Joint::LeftElbow => 0,
            Joint::RightElbow => 1,
            Joint::LeftKnee => 2,
            Joint::RightKnee => 3,
            Joint::Torso => 4,
        }
    }

    pub fn body_part(&self) -> BodyPart {
        match self {
            Joint::LeftElbow | Joint::RightElbow => BodyPart::Upper,
            Joint::LeftKnee | Joint::RightKnee => BodyPart::Lower,
            Joint::Torso => BodyPart::Core,
        }
    }

    /// BlazePose landmark indices that define this angle
    fn landmarks(&self) -> &'static [usize] {
        match self {
            Joint::LeftElbow => &[indices::LEFT_SHOULDER, indices::LEFT_ELBOW, indices::LEFT_WRIST],
            Joint::RightElbow => &[indices::RIGHT_SHOULDER, indices::RIGHT_ELBOW, indices::RIGHT_WRIST],
            Joint::LeftKnee => &[indices::LEFT_HIP, indices::LEFT_KNEE, indices::LEFT_ANKLE],
            Joint::RightKnee => &[indices::RIGHT_HIP, indices::RIGHT_KNEE, indices::RIGHT_ANKLE],
            Joint::Torso => &[
                indices::LEFT_SHOULDER,
                indices::RIGHT_SHOULDER,
                indices::LEFT_HIP,
                indices::RIGHT_HIP,
            ],
        }
    }
}

/// Coarse body regions used to explain phrase matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    /// Arms (elbows)
    Upper,
    /// Torso
    Core,
    /// Legs (knees)
    Lower,
}

impl BodyPart {
    pub const ALL: [BodyPart; 3] = [BodyPart::Upper, BodyPart::Core, BodyPart::Lower];

    pub fn joints(&self) -> Vec<Joint> {
        Joint::ALL
            .iter()
            .copied()
            .filter(|j| j.body_part() == *self)
            .collect()
    }

    /// Feature columns (angles and their deltas) owned by this part
    pub fn feature_dims(&self) -> Vec<usize> {
        self.joints()
            .iter()
            .flat_map(|j| [j.angle_index(), j.angle_index() + ANGLE_COUNT])
            .collect()
    }
}

/// Planar angle at `b` formed by `a-b-c`, via the law of cosines on x/y.
pub fn joint_angle(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Option<f32> {
    let v1 = [a[0] - b[0], a[1] - b[1]];
    let v2 = [c[0] - b[0], c[1] - b[1]];
    let n1 = (v1[0] * v1[0] + v1[1] * v1[1]).sqrt();
    let n2 = (v2[0] * v2[0] + v2[1] * v2[1]).sqrt();
    if !(n1 > VECTOR_EPSILON && n2 > VECTOR_EPSILON) {
        return None;
    }
    let cos = ((v1[0] * v2[0] + v1[1] * v2[1]) / (n1 * n2)).clamp(-1.0, 1.0);
    Some(cos.acos())
}

/// Angle between shoulder-center -> hip-center and the image vertical.
///
/// Zero for an upright body (image y grows downward).
pub fn torso_tilt(frame: &FrameVector) -> Option<f32> {
    let ls = frame.point(indices::LEFT_SHOULDER);
    let rs = frame.point(indices::RIGHT_SHOULDER);
    let lh = frame.point(indices::LEFT_HIP);
    let rh = frame.point(indices::RIGHT_HIP);

    let dx = (lh[0] + rh[0]) / 2.0 - (ls[0] + rs[0]) / 2.0;
    let dy = (lh[1] + rh[1]) / 2.0 - (ls[1] + rs[1]) / 2.0;
    let len = (dx * dx + dy * dy).sqrt();
    if !(len > VECTOR_EPSILON) {
        return None;
    }
    Some((dy / len).clamp(-1.0, 1.0).acos())
}

/// Confidence-weighted angles for one frame, `None` if any vector collapses.
pub fn frame_angles(frame: &FrameVector, landmarks: &[LandmarkPoint]) -> Option<[f32; ANGLE_COUNT]> {
    let mut angles = [0.0f32; ANGLE_COUNT];
    for joint in Joint::ALL {
        let idx = joint.landmarks();
        let raw = match joint {
            Joint::Torso => torso_tilt(frame)?,
            _ => joint_angle(frame.point(idx[0]), frame.point(idx[1]), frame.point(idx[2]))?,
        };
        angles[joint.angle_index()] = raw * min_confidence(landmarks, idx);
    }
    Some(angles)
}

fn min_confidence(landmarks: &[LandmarkPoint], idx: &[usize]) -> f32 {
    let c = idx
        .iter()
        .map(|&i| landmarks.get(i).map_or(0.0, |p| p.confidence))
        .fold(f32::INFINITY, f32::min);
    if c.is_finite() {
        c.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Extracted, trimmed features for one video
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// Frames x [`FEATURE_DIM`]
    pub features: Array2<f32>,
    /// One value per consecutive retained frame pair
    pub motion_energy: Array1<f32>,
    /// Active region relative to the untrimmed valid frames
    pub trim_range: TrimRange,
    /// Timestamp of each retained feature row
    pub timestamps_ms: Vec<i64>,
    /// Frames supplied in the stream
    pub frames_total: usize,
    /// Frames that produced a feature row, before trimming
    pub frames_valid: usize,
    pub sample_fps: f32,
    pub flags: Vec<QualityFlag>,
}

impl FeatureSet {
    fn empty(frames_total: usize, sample_fps: f32, flags: Vec<QualityFlag>) -> Self {
        Self {
            features: Array2::zeros((0, FEATURE_DIM)),
            motion_energy: Array1::zeros(0),
            trim_range: TrimRange::full(0),
            timestamps_ms: vec![],
            frames_total,
            frames_valid: 0,
            sample_fps,
            flags,
        }
    }

    /// Retained feature rows
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    /// Share of supplied frames with a usable pose
    pub fn pose_rate(&self) -> f32 {
        if self.frames_total == 0 {
            0.0
        } else {
            self.frames_valid as f32 / self.frames_total as f32
        }
    }

    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Feature rows as nested vectors, for JSON output
    pub fn feature_rows(&self) -> Vec<Vec<f32>> {
        self.features.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    /// Motion transient timestamps.
    ///
    /// Energy index `i` measures the change arriving at retained frame `i + 1`.
    pub fn motion_peaks_ms(&self, min_distance: usize, max_peaks: usize) -> Vec<i64> {
        let energy = self.motion_energy.to_vec();
        detect_peaks(&energy, min_distance, max_peaks)
            .into_iter()
            .filter_map(|i| self.timestamps_ms.get(i + 1).copied())
            .collect()
    }

    /// Span of retained frames in milliseconds
    pub fn duration_ms(&self) -> i64 {
        match (self.timestamps_ms.first(), self.timestamps_ms.last()) {
            (Some(first), Some(last)) => (last - first).max(0),
            _ => 0,
        }
    }
}

/// Normalize every frame, compute features, energy and trim.
///
/// Frames with too few landmarks or degenerate limbs are dropped. Poor
/// input is reported through `FeatureSet::flags`, or as
/// [`ChoreoError::InsufficientInput`] when `quality.hard_fail` is set.
pub fn extract_features(
    stream: &LandmarkStream,
    config: &ChoreoConfig,
    cancel: &CancelToken,
) -> Result<FeatureSet> {
    config.validate()?;
    if !(stream.sample_fps.is_finite() && stream.sample_fps > 0.0) {
        return Err(ConfigError::Validation(format!(
            "sample_fps must be positive, got {}",
            stream.sample_fps
        ))
        .into());
    }
    let fc = &config.features;
    let frames_total = stream.frames.len();
    let use_depth = stream.backend.has_depth();

    let mut angle_rows: Vec<[f32; ANGLE_COUNT]> = Vec::with_capacity(frames_total);
    let mut timestamps: Vec<i64> = Vec::with_capacity(frames_total);

    for frame in &stream.frames {
        if cancel.is_cancelled() {
            return Err(ChoreoError::Cancelled);
        }
        let Some(vector) =
            normalize_frame_with_depth(&frame.landmarks, fc.rotation_normalization, use_depth)
        else {
            continue;
        };
        let Some(angles) = frame_angles(&vector, &frame.landmarks) else {
            continue;
        };
        angle_rows.push(angles);
        timestamps.push(frame.timestamp_ms);
    }

    let frames_valid = angle_rows.len();
    log::debug!("extract: {}/{} frames usable", frames_valid, frames_total);

    if frames_valid == 0 {
        let flags = assess_extraction(frames_total, 0, false, &config.quality);
        report_flags(&flags);
        if config.quality.hard_fail {
            return Err(ChoreoError::InsufficientInput(flags));
        }
        return Ok(FeatureSet::empty(frames_total, stream.sample_fps, flags));
    }

    let raw = Array2::from_shape_fn((frames_valid, ANGLE_COUNT), |(i, j)| angle_rows[i][j]);
    let smoothed = smooth_columns(&raw, fc.smoothing_window);
    let delta = smooth_columns(&row_delta(&smoothed), fc.smoothing_window);

    let mut features = Array2::zeros((frames_valid, FEATURE_DIM));
    features.slice_mut(s![.., ..ANGLE_COUNT]).assign(&smoothed);
    features
        .slice_mut(s![.., ANGLE_COUNT..])
        .assign(&(&delta * fc.dangle_weight));

    let energy = motion_energy(&delta);

    if cancel.is_cancelled() {
        return Err(ChoreoError::Cancelled);
    }

    let trim = trim_range(&energy, fc.trim_energy);
    let no_motion = !energy.is_empty() && energy.iter().all(|&e| e < fc.trim_energy);
    let frames = trim.frame_range(frames_valid);
    let energy_span = trim.energy_range(energy.len());
    if trim.trimmed {
        log::debug!(
            "trim: keeping frames {}..{} of {}",
            frames.start,
            frames.end,
            frames_valid
        );
    }

    let flags = assess_extraction(frames_total, frames_valid, no_motion, &config.quality);
    report_flags(&flags);
    if config.quality.hard_fail && flags.iter().any(|f| f.is_input_insufficiency()) {
        let blocking = flags
            .iter()
            .copied()
            .filter(|f| f.is_input_insufficiency())
            .collect();
        return Err(ChoreoError::InsufficientInput(blocking));
    }

    Ok(FeatureSet {
        features: features.slice(s![frames.clone(), ..]).to_owned(),
        motion_energy: energy.slice(s![energy_span]).to_owned(),
        trim_range: trim,
        timestamps_ms: timestamps[frames].to_vec(),
        frames_total,
        frames_valid,
        sample_fps: stream.sample_fps,
        flags,
    })
}

fn report_flags(flags: &[QualityFlag]) {
    for flag in flags {
        log::warn!("input quality: {}", flag.description());
    }
}
