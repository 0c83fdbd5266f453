//! Uniform stride downsampling to bound DTW cost

use ndarray::{Array2, Axis};

/// Row indices kept when capping `len` rows at `max_frames`.
///
/// `max_frames == 0` disables the cap.
pub fn downsample_indices(len: usize, max_frames: usize) -> Vec<usize> {
    if max_frames == 0 || len <= max_frames {
        return (0..len).collect();
    }
    let step = len.div_ceil(max_frames);
    (0..len).step_by(step).take(max_frames).collect()
}

/// Keep every `ceil(len / max_frames)`-th row, truncated to `max_frames`.
///
/// Sequences already within the cap pass through, which makes the
/// operation idempotent.
pub fn downsample(seq: &Array2<f32>, max_frames: usize) -> Array2<f32> {
    if max_frames == 0 || seq.nrows() <= max_frames {
        return seq.clone();
    }
    let keep = downsample_indices(seq.nrows(), max_frames);
    log::debug!("downsample: {} -> {} frames", seq.nrows(), keep.len());
    seq.select(Axis(0), &keep)
}
