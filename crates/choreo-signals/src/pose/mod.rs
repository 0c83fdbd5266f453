//! Pose module
//!
//! Landmark input types, body-centric normalization and the per-frame
//! angle features every downstream stage consumes.

pub mod features;
pub mod landmarks;
pub mod normalize;

pub use features::{
    extract_features, frame_angles, joint_angle, torso_tilt, BodyPart, FeatureSet, Joint,
    ANGLE_COUNT, FEATURE_DIM,
};
pub use landmarks::{indices, LandmarkFrame, LandmarkPoint, LandmarkStream, PoseBackend};
pub use normalize::{normalize_frame, normalize_frame_with_depth, FrameVector};
