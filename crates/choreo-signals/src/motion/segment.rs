//! Energy-based phrase segmentation
//!
//! Cuts a performance where the motion energy dips well below its mean
//! (a pause) or right after a strong accent that falls off sharply.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::config::SegmentConfig;

/// Why a segment boundary was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentReason {
    /// Energy fell below the low threshold
    LowEnergy,
    /// A high-energy accent followed by a sharp drop
    PeakDrop,
    /// Remainder after the last cut
    Tail,
    /// No usable cut: the whole series is one segment
    Full,
    /// Bounded by motion-energy peaks
    MotionPeak,
}

/// Half-open span `[start, end)` over energy indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub reason: SegmentReason,
}

impl Segment {
    pub fn new(start: usize, end: usize, reason: SegmentReason) -> Self {
        Self { start, end, reason }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start_sec(&self, fps: f32) -> f32 {
        index_to_sec(self.start, fps)
    }

    pub fn end_sec(&self, fps: f32) -> f32 {
        index_to_sec(self.end, fps)
    }

    pub fn midpoint_sec(&self, fps: f32) -> f32 {
        (self.start_sec(fps) + self.end_sec(fps)) / 2.0
    }

    /// Feature rows covered: energy `[start, end)` touches frames `[start, end]`
    pub fn frame_range(&self, frame_count: usize) -> Range<usize> {
        self.start.min(frame_count)..(self.end + 1).min(frame_count)
    }
}

fn index_to_sec(idx: usize, fps: f32) -> f32 {
    if fps > 0.0 && fps.is_finite() {
        idx as f32 / fps
    } else {
        0.0
    }
}

/// Minimum segment length in energy samples: `max(1, round(min_sec * fps))`
pub fn min_segment_frames(fps: f32, min_sec: f32) -> usize {
    let frames = (min_sec * fps).round();
    if frames.is_finite() && frames >= 1.0 {
        frames as usize
    } else {
        1
    }
}

/// Segment with default thresholds.
pub fn segment(energy: &[f32], fps: f32) -> Vec<Segment> {
    segment_with_config(energy, fps, &SegmentConfig::default())
}

/// Segment, drop pieces shorter than the minimum, fall back to one `Full`
/// segment when nothing useful remains.
///
/// Empty input gives an empty list; non-empty input never does.
pub fn segment_with_config(energy: &[f32], fps: f32, config: &SegmentConfig) -> Vec<Segment> {
    let n = energy.len();
    if n == 0 {
        return vec![];
    }

    let raw = segment_raw(energy, fps, config);
    let min_len = min_segment_frames(fps, config.min_segment_sec);
    let cut_made = raw.iter().any(|s| s.reason != SegmentReason::Tail);

    let kept: Vec<Segment> = raw.into_iter().filter(|s| s.len() >= min_len).collect();
    if !cut_made || kept.is_empty() {
        return vec![Segment::new(0, n, SegmentReason::Full)];
    }

    log::debug!("segmenter: {} segments over {} energy samples", kept.len(), n);
    kept
}

/// Unfiltered cut list. Consecutive segments tile `[0, len)` exactly.
pub fn segment_raw(energy: &[f32], fps: f32, config: &SegmentConfig) -> Vec<Segment> {
    let n = energy.len();
    if n == 0 {
        return vec![];
    }

    let min_len = min_segment_frames(fps, config.min_segment_sec);
    let mean = energy.iter().sum::<f32>() / n as f32;
    let (low, high) = if mean > 0.0 {
        (config.low_ratio * mean, config.high_ratio * mean)
    } else {
        (0.0, 0.0)
    };

    let mut segments = Vec::new();
    let mut last_cut = 0usize;

    for i in 0..n {
        if i - last_cut < min_len {
            continue;
        }
        let value = energy[i];
        if value < low {
            segments.push(Segment::new(last_cut, i, SegmentReason::LowEnergy));
            last_cut = i;
        } else if value > high && i + 1 < n && energy[i + 1] < config.drop_ratio * value {
            segments.push(Segment::new(last_cut, i, SegmentReason::PeakDrop));
            last_cut = i;
        }
    }

    if last_cut < n {
        segments.push(Segment::new(last_cut, n, SegmentReason::Tail));
    }
    segments
}

/// Segments bounded by peak indices over a series of length `len`.
///
/// Boundaries are `0`, each in-range peak, and `len`; zero-length pieces are
/// skipped. Without peaks the whole range is one `Full` segment.
pub fn segments_from_peaks(peaks: &[usize], len: usize) -> Vec<Segment> {
    if len == 0 {
        return vec![];
    }

    let mut bounds: Vec<usize> = std::iter::once(0)
        .chain(peaks.iter().copied().filter(|&p| p > 0 && p < len))
        .chain(std::iter::once(len))
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    if bounds.len() <= 2 {
        return vec![Segment::new(0, len, SegmentReason::Full)];
    }

    bounds
        .windows(2)
        .map(|w| Segment::new(w[0], w[1], SegmentReason::MotionPeak))
        .collect()
}
