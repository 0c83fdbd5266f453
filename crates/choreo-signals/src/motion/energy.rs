//! Motion energy and idle-edge trimming

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Per-transition motion energy.
///
/// `energy[i-1]` is the L1 norm of `smoothed_delta[i]` for every frame
/// `i >= 1`, so the result has one value per consecutive frame pair.
pub fn motion_energy(smoothed_delta: &Array2<f32>) -> Array1<f32> {
    let n = smoothed_delta.nrows();
    if n < 2 {
        return Array1::zeros(0);
    }
    Array1::from_iter((1..n).map(|i| smoothed_delta.row(i).iter().map(|v| v.abs()).sum::<f32>()))
}

/// Active region of a clip, as inclusive energy indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimRange {
    /// First energy index at or above the threshold
    pub first: usize,
    /// Last energy index at or above the threshold
    pub last: usize,
    /// False when trimming was a no-op
    pub trimmed: bool,
}

impl TrimRange {
    /// Keep everything
    pub fn full(energy_len: usize) -> Self {
        Self {
            first: 0,
            last: energy_len.saturating_sub(1),
            trimmed: false,
        }
    }

    /// Energy indices to keep
    pub fn energy_range(&self, energy_len: usize) -> Range<usize> {
        if !self.trimmed {
            return 0..energy_len;
        }
        self.first.min(energy_len)..(self.last + 1).min(energy_len)
    }

    /// Frame indices to keep: energy `[first, last]` spans frames `[first, last + 1]`
    pub fn frame_range(&self, frame_count: usize) -> Range<usize> {
        if !self.trimmed {
            return 0..frame_count;
        }
        self.first.min(frame_count)..(self.last + 2).min(frame_count)
    }
}

/// Locate the first and last energy values `>= threshold`.
///
/// Returns a no-op range when nothing qualifies.
pub fn trim_range(energy: &Array1<f32>, threshold: f32) -> TrimRange {
    let n = energy.len();
    let first = energy.iter().position(|&e| e >= threshold);
    let last = energy.iter().rposition(|&e| e >= threshold);

    match (first, last) {
        (Some(first), Some(last)) if last >= first => TrimRange {
            first,
            last,
            trimmed: first > 0 || last + 1 < n,
        },
        _ => TrimRange::full(n),
    }
}
