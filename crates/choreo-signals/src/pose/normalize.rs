//! Body-centric landmark normalization
//!
//! - Origin: midpoint between the hips
//! - Scale: shoulder distance = 1.0
//! - Optional in-plane rotation so the shoulder line is horizontal

use super::landmarks::{indices, LandmarkPoint};

/// Guards the scale factor against collapsed shoulders
const SCALE_EPSILON: f32 = 1e-6;

/// One frame of landmarks in the body-centric frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameVector {
    /// Normalized [x, y, z] per landmark, in input order
    pub points: Vec<[f32; 3]>,
}

impl FrameVector {
    /// Point by index, origin when out of range
    pub fn point(&self, idx: usize) -> [f32; 3] {
        self.points.get(idx).copied().unwrap_or([0.0; 3])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Flatten to [x0, y0, z0, x1, y1, z1, ...]
    pub fn to_flat(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| p.iter().copied()).collect()
    }
}

/// Normalize a frame using depth when the landmarks carry it.
///
/// Returns `None` when fewer than 25 landmarks are present, which callers
/// treat as "pose not detected for this frame".
pub fn normalize_frame(landmarks: &[LandmarkPoint], rotate: bool) -> Option<FrameVector> {
    normalize_frame_with_depth(landmarks, rotate, true)
}

/// Normalize a frame, optionally discarding depth (2D-only backends).
pub fn normalize_frame_with_depth(
    landmarks: &[LandmarkPoint],
    rotate: bool,
    use_depth: bool,
) -> Option<FrameVector> {
    if landmarks.len() < indices::MIN_LANDMARKS {
        return None;
    }

    let raw: Vec<[f32; 3]> = landmarks
        .iter()
        .map(|p| {
            let z = if use_depth { p.z.unwrap_or(0.0) } else { 0.0 };
            [p.x, p.y, z]
        })
        .collect();

    let lhip = raw[indices::LEFT_HIP];
    let rhip = raw[indices::RIGHT_HIP];
    let center = [
        (lhip[0] + rhip[0]) / 2.0,
        (lhip[1] + rhip[1]) / 2.0,
        (lhip[2] + rhip[2]) / 2.0,
    ];

    let lsho = raw[indices::LEFT_SHOULDER];
    let rsho = raw[indices::RIGHT_SHOULDER];
    let shoulder_dist = distance3(lsho, rsho);
    let inv_scale = 1.0 / shoulder_dist.max(SCALE_EPSILON);

    let mut points: Vec<[f32; 3]> = raw
        .iter()
        .map(|p| {
            [
                (p[0] - center[0]) * inv_scale,
                (p[1] - center[1]) * inv_scale,
                (p[2] - center[2]) * inv_scale,
            ]
        })
        .collect();

    if rotate {
        let angle = shoulder_line_angle(
            points[indices::LEFT_SHOULDER],
            points[indices::RIGHT_SHOULDER],
        );
        let (sin, cos) = angle.sin_cos();
        for p in points.iter_mut() {
            let (x, y) = (p[0], p[1]);
            p[0] = x * cos + y * sin;
            p[1] = -x * sin + y * cos;
        }
    }

    Some(FrameVector { points })
}

/// Direction of the right-to-left shoulder vector in the image plane.
///
/// A subject facing the camera has the left shoulder on the image right, so
/// the angle is near zero for an upright frontal pose. The angle is not
/// folded: rotating by its negative maps any in-plane body rotation to the
/// same output.
fn shoulder_line_angle(left: [f32; 3], right: [f32; 3]) -> f32 {
    let dx = left[0] - right[0];
    let dy = left[1] - right[1];
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    dy.atan2(dx)
}

fn distance3(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
