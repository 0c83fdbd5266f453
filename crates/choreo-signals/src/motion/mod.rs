//! Motion module
//!
//! Turns per-frame features into a motion-energy series, trims idle edges,
//! bounds sequence length and cuts performances into phrases.

mod downsample;
mod energy;
mod segment;

pub use downsample::{downsample, downsample_indices};
pub use energy::{motion_energy, trim_range, TrimRange};
pub use segment::{
    min_segment_frames, segment, segment_raw, segment_with_config, segments_from_peaks, Segment,
    SegmentReason,
};
