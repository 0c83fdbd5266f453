//! Order-free comparison of mean-pooled feature vectors
//!
//! Cheap first look: ignores timing entirely, so two performances of the
//! same moves in a different order still score high.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::distance::cosine_similarity;
use super::dtw::Confidence;

/// Medium bucket starts higher than for DTW
const POOLED_MEDIUM_AT: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledComparison {
    /// Cosine similarity of the pooled vectors, clamped to 0..1
    pub similarity: f32,
    pub confidence: Confidence,
    pub frames_a: usize,
    pub frames_b: usize,
}

/// Column means, `None` for an empty sequence
pub fn mean_pool(features: &Array2<f32>) -> Option<Array1<f32>> {
    if features.nrows() == 0 {
        return None;
    }
    features.mean_axis(Axis(0))
}

pub fn compare_pooled(features_a: &Array2<f32>, features_b: &Array2<f32>) -> PooledComparison {
    let similarity = match (mean_pool(features_a), mean_pool(features_b)) {
        (Some(a), Some(b)) if a.len() == b.len() => {
            cosine_similarity(a.view(), b.view()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };

    PooledComparison {
        similarity,
        confidence: Confidence::from_similarity(similarity, POOLED_MEDIUM_AT),
        frames_a: features_a.nrows(),
        frames_b: features_b.nrows(),
    }
}
