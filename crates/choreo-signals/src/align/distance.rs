//! Frame-to-frame distance metrics

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::pose::{BodyPart, Joint, ANGLE_COUNT, FEATURE_DIM};

/// Per-frame distance used inside DTW
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance with per-limb weights
    #[default]
    WeightedEuclidean,
    /// `1 - cosine similarity`
    Cosine,
}

/// Relative importance of each limb group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimbWeights {
    pub arms: f32,
    pub legs: f32,
    pub torso: f32,
}

impl Default for LimbWeights {
    fn default() -> Self {
        Self {
            arms: 1.2,
            legs: 1.0,
            torso: 0.8,
        }
    }
}

impl LimbWeights {
    pub fn uniform() -> Self {
        Self {
            arms: 1.0,
            legs: 1.0,
            torso: 1.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.arms, self.legs, self.torso]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }

    pub fn for_part(&self, part: BodyPart) -> f32 {
        match part {
            BodyPart::Upper => self.arms,
            BodyPart::Core => self.torso,
            BodyPart::Lower => self.legs,
        }
    }

    /// Weight per feature column.
    ///
    /// Only the standard 10-column layout maps to limbs; any other width
    /// gets uniform weights.
    pub fn per_dim(&self, dims: usize) -> Vec<f32> {
        if dims != FEATURE_DIM {
            return vec![1.0; dims];
        }
        let mut weights = vec![1.0; dims];
        for joint in Joint::ALL {
            let w = self.for_part(joint.body_part());
            weights[joint.angle_index()] = w;
            weights[joint.angle_index() + ANGLE_COUNT] = w;
        }
        weights
    }
}

/// Metric bound to a concrete weight vector
#[derive(Debug, Clone)]
pub struct FrameDistance {
    metric: DistanceMetric,
    weights: Vec<f32>,
}

impl FrameDistance {
    pub fn new(metric: DistanceMetric, weights: &LimbWeights, dims: usize) -> Self {
        Self {
            metric,
            weights: weights.per_dim(dims),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn distance(&self, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
        match self.metric {
            DistanceMetric::WeightedEuclidean => weighted_euclidean(a, b, &self.weights),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }
}

/// `sqrt(sum(w_i * (a_i - b_i)^2))`; missing weights count as 1
pub fn weighted_euclidean(a: ArrayView1<f32>, b: ArrayView1<f32>, weights: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .enumerate()
        .map(|(i, (x, y))| {
            let w = weights.get(i).copied().unwrap_or(1.0);
            w * (x - y) * (x - y)
        })
        .sum::<f32>()
        .sqrt()
}

/// Cosine similarity, 0 when either vector has zero norm
pub fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na = a.dot(&a).sqrt();
    let nb = b.dot(&b).sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

/// `1 - cos`: two zero vectors are identical (0), one zero vector is
/// orthogonal to anything (1)
pub fn cosine_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let a_zero = a.iter().all(|v| *v == 0.0);
    let b_zero = b.iter().all(|v| *v == 0.0);
    match (a_zero, b_zero) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => 1.0 - cosine_similarity(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_per_dim_layout() {
        let w = LimbWeights::default().per_dim(FEATURE_DIM);
        assert_eq!(w, vec![1.2, 1.2, 1.0, 1.0, 0.8, 1.2, 1.2, 1.0, 1.0, 0.8]);
        assert_eq!(LimbWeights::default().per_dim(4), vec![1.0; 4]);
    }

    #[test]
    fn test_weighted_euclidean() {
        let a = array![1.0, 0.0];
        let b = array![0.0, 0.0];
        assert_relative_eq!(weighted_euclidean(a.view(), b.view(), &[4.0, 1.0]), 2.0);
        assert_relative_eq!(weighted_euclidean(a.view(), a.view(), &[4.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vectors() {
        let z = Array1::<f32>::zeros(3);
        let v = array![1.0, 2.0, 3.0];
        assert_eq!(cosine_distance(z.view(), z.view()), 0.0);
        assert_eq!(cosine_distance(z.view(), v.view()), 1.0);
        assert_eq!(cosine_distance(v.view(), z.view()), 1.0);
    }

    #[test]
    fn test_cosine_distance_range() {
        let a = array![1.0, 0.0];
        let b = array![-1.0, 0.0];
        assert_relative_eq!(cosine_distance(a.view(), b.view()), 2.0);
        assert_relative_eq!(cosine_distance(a.view(), a.view()), 0.0);
    }

    #[test]
    fn test_weights_validation() {
        assert!(LimbWeights::default().is_valid());
        let bad = LimbWeights {
            legs: f32::NAN,
            ..LimbWeights::default()
        };
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_metric_serde_names() {
        let m: DistanceMetric = serde_json::from_str("\"weighted_euclidean\"").unwrap();
        assert_eq!(m, DistanceMetric::WeightedEuclidean);
    }
}
