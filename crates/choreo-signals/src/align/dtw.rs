//! Banded dynamic time warping
//!
//! Two rolling rows keep memory at O(m); the Sakoe-Chiba band keeps time at
//! O(n * band). Inputs are capped by the downsampler before they get here.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::distance::{DistanceMetric, FrameDistance, LimbWeights};
use crate::config::CompareConfig;
use crate::motion::downsample;
use crate::quality::QualityFlag;
use crate::{ChoreoError, Result};

/// Sequence cap applied before alignment
pub const DEFAULT_MAX_FRAMES: usize = 300;

/// Coarse trust bucket for a similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// High >= 0.8, Medium >= `medium_at`, else Low
    pub fn from_similarity(similarity: f32, medium_at: f32) -> Self {
        if similarity >= 0.8 {
            Confidence::High
        } else if similarity >= medium_at {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Buckets used for DTW similarity
    pub fn for_dtw(similarity: f32) -> Self {
        Self::from_similarity(similarity, 0.5)
    }
}

/// Cumulative cost of the cheapest monotone path from (0,0) to (n,m).
///
/// The band radius is widened to `|n - m|` so the end cell is always
/// reachable. Empty input and differing feature widths are errors.
pub fn dtw_cost(a: &Array2<f32>, b: &Array2<f32>, band: usize, dist: &FrameDistance) -> Result<f32> {
    let n = a.nrows();
    let m = b.nrows();
    if n == 0 || m == 0 {
        return Err(ChoreoError::EmptySequence { len_a: n, len_b: m });
    }
    if a.ncols() != b.ncols() {
        return Err(ChoreoError::DimensionMismatch {
            dims_a: a.ncols(),
            dims_b: b.ncols(),
        });
    }

    let radius = band.max(n.abs_diff(m));
    let mut prev = vec![f32::INFINITY; m + 1];
    let mut curr = vec![f32::INFINITY; m + 1];
    prev[0] = 0.0;

    for i in 1..=n {
        curr.fill(f32::INFINITY);
        let j_start = i.saturating_sub(radius).max(1);
        let j_end = (i + radius).min(m);
        let row_a = a.row(i - 1);
        for j in j_start..=j_end {
            let d = dist.distance(row_a, b.row(j - 1));
            let best = prev[j].min(curr[j - 1]).min(prev[j - 1]);
            curr[j] = d + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    Ok(prev[m])
}

/// `clamp(exp(-alpha * cost / max(n, m)), 0, 1)`; any non-finite step -> 0
pub fn similarity_from_cost(cost: f32, n: usize, m: usize, alpha: f32) -> f32 {
    let norm = n.max(m);
    if norm == 0 {
        return 0.0;
    }
    let distance = cost / norm as f32;
    if !distance.is_finite() {
        return 0.0;
    }
    let score = (-alpha * distance).exp();
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

/// Outcome of aligning two feature sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// 0..1, higher is more alike
    pub similarity: f32,
    /// Path cost per step
    pub distance: f32,
    pub dtw_cost: f32,
    pub confidence: Confidence,
    /// Frames aligned after downsampling
    pub frames_a: usize,
    pub frames_b: usize,
    /// Band radius actually used
    pub band: usize,
    pub metric: DistanceMetric,
    pub flags: Vec<QualityFlag>,
}

/// Weighted-Euclidean DTW comparison with the default frame cap.
pub fn compare(
    features_a: &Array2<f32>,
    features_b: &Array2<f32>,
    weights: &LimbWeights,
    alpha: f32,
    band: usize,
) -> Result<Comparison> {
    let config = CompareConfig {
        alpha,
        band,
        weights: *weights,
        max_frames: DEFAULT_MAX_FRAMES,
        metric: DistanceMetric::WeightedEuclidean,
        ..CompareConfig::default()
    };
    compare_with_config(features_a, features_b, &config)
}

/// Downsample both inputs, align, and score.
///
/// The config is validated first, so a bad `alpha` or weight set surfaces as
/// [`ChoreoError::Config`] instead of a misleading score.
pub fn compare_with_config(
    features_a: &Array2<f32>,
    features_b: &Array2<f32>,
    config: &CompareConfig,
) -> Result<Comparison> {
    config.validate()?;

    let a = downsample(features_a, config.max_frames);
    let b = downsample(features_b, config.max_frames);
    let dist = FrameDistance::new(config.metric, &config.weights, a.ncols());

    let cost = dtw_cost(&a, &b, config.band, &dist)?;
    let (n, m) = (a.nrows(), b.nrows());
    let distance = cost / n.max(m) as f32;

    let mut flags = Vec::new();
    if features_a == features_b {
        flags.push(QualityFlag::IdenticalInput);
    }
    if !distance.is_finite() {
        log::warn!("dtw: non-finite distance for {}x{} alignment", n, m);
        flags.push(QualityFlag::DegenerateDistance);
    }

    let similarity = similarity_from_cost(cost, n, m, config.alpha);
    log::debug!(
        "dtw: {}x{} band {} -> cost {:.4}, similarity {:.4}",
        n,
        m,
        config.band.max(n.abs_diff(m)),
        cost,
        similarity
    );

    Ok(Comparison {
        similarity,
        distance,
        dtw_cost: cost,
        confidence: Confidence::for_dtw(similarity),
        frames_a: n,
        frames_b: m,
        band: config.band.max(n.abs_diff(m)),
        metric: config.metric,
        flags,
    })
}
