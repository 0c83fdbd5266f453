//! Alignment module
//!
//! - `dtw` - banded DTW similarity between two feature sequences
//! - `pooled` - order-free mean-pooled comparison
//! - `phrase` - per-phrase matching with body-part explanations

mod distance;
mod dtw;
mod phrase;
mod pooled;

pub use distance::{
    cosine_distance, cosine_similarity, weighted_euclidean, DistanceMetric, FrameDistance,
    LimbWeights,
};
pub use dtw::{
    compare, compare_with_config, dtw_cost, similarity_from_cost, Comparison, Confidence,
    DEFAULT_MAX_FRAMES,
};
pub use phrase::{phrase_match, phrase_match_by_peaks, Phrase, PhraseCandidate};
pub use pooled::{compare_pooled, mean_pool, PooledComparison};
