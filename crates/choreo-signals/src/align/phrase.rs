//! Phrase-level matching
//!
//! Every phrase of performance A is aligned against every phrase of B.
//! The best candidates are kept together with a per-body-part breakdown
//! that explains where the match is strong and where it falls apart.

use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::dtw::{compare_with_config, Confidence};
use super::pooled::mean_pool;
use crate::config::ChoreoConfig;
use crate::dsp::detect_peaks;
use crate::motion::{segments_from_peaks, Segment, SegmentReason};
use crate::pose::{BodyPart, FeatureSet, Joint};

/// One B segment scored against an A phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseCandidate {
    pub segment: Segment,
    pub start_sec: f32,
    pub end_sec: f32,
    /// DTW similarity of the two segments
    pub similarity: f32,
    pub dtw_cost: f32,
    /// Similarity of the pooled features per body part
    pub parts: BTreeMap<BodyPart, f32>,
    /// The two best-matching parts, strongest first
    pub dominant: Vec<BodyPart>,
    pub weakest: BodyPart,
    /// Segment midpoints further apart than the configured tolerance
    pub timing_mismatch: bool,
}

/// A phrase of performance A and its best counterparts in B
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: usize,
    pub start: usize,
    pub end: usize,
    pub reason: SegmentReason,
    pub start_sec: f32,
    pub end_sec: f32,
    /// Best-matching B segment
    pub matched: Option<Segment>,
    pub similarity: f32,
    pub confidence: Confidence,
    /// Joints of the dominant body parts of the best match
    pub key_joints: BTreeSet<Joint>,
    /// Top-k candidates, best first
    pub candidates: Vec<PhraseCandidate>,
}

/// Match every A segment against every B segment.
pub fn phrase_match(
    features_a: &FeatureSet,
    features_b: &FeatureSet,
    segments_a: &[Segment],
    segments_b: &[Segment],
    config: &ChoreoConfig,
) -> Vec<Phrase> {
    let build = |(id, seg): (usize, &Segment)| {
        build_phrase(id, seg, features_a, features_b, segments_b, config)
    };

    #[cfg(feature = "parallel")]
    let phrases: Vec<Phrase> = segments_a.par_iter().enumerate().map(build).collect();
    #[cfg(not(feature = "parallel"))]
    let phrases: Vec<Phrase> = segments_a.iter().enumerate().map(build).collect();

    log::debug!(
        "phrase match: {} x {} segments",
        segments_a.len(),
        segments_b.len()
    );
    phrases
}

/// Cut both performances at motion-energy peaks, then match.
pub fn phrase_match_by_peaks(
    set_a: &FeatureSet,
    set_b: &FeatureSet,
    config: &ChoreoConfig,
) -> Vec<Phrase> {
    let segments_a = peak_segments(set_a, config);
    let segments_b = peak_segments(set_b, config);
    phrase_match(set_a, set_b, &segments_a, &segments_b, config)
}

fn peak_segments(set: &FeatureSet, config: &ChoreoConfig) -> Vec<Segment> {
    let energy = set.motion_energy.to_vec();
    let peaks = detect_peaks(
        &energy,
        config.sync.motion_min_distance,
        config.sync.max_peaks,
    );
    segments_from_peaks(&peaks, energy.len())
}

fn build_phrase(
    id: usize,
    seg_a: &Segment,
    set_a: &FeatureSet,
    set_b: &FeatureSet,
    segments_b: &[Segment],
    config: &ChoreoConfig,
) -> Phrase {
    let rows_a = segment_rows(set_a, seg_a);

    let mut candidates: Vec<PhraseCandidate> = segments_b
        .iter()
        .filter_map(|seg_b| score_candidate(&rows_a, seg_a, set_a, seg_b, set_b, config))
        .collect();
    candidates.sort_by(|x, y| y.similarity.total_cmp(&x.similarity));
    candidates.truncate(config.compare.top_k.max(1));

    let best = candidates.first();
    let similarity = best.map_or(0.0, |c| c.similarity);
    let key_joints = best
        .map(|c| {
            c.dominant
                .iter()
                .flat_map(|part| part.joints())
                .collect::<BTreeSet<Joint>>()
        })
        .unwrap_or_default();

    Phrase {
        id,
        start: seg_a.start,
        end: seg_a.end,
        reason: seg_a.reason,
        start_sec: seg_a.start_sec(set_a.sample_fps),
        end_sec: seg_a.end_sec(set_a.sample_fps),
        matched: best.map(|c| c.segment),
        similarity,
        confidence: Confidence::for_dtw(similarity),
        key_joints,
        candidates,
    }
}

fn score_candidate(
    rows_a: &Array2<f32>,
    seg_a: &Segment,
    set_a: &FeatureSet,
    seg_b: &Segment,
    set_b: &FeatureSet,
    config: &ChoreoConfig,
) -> Option<PhraseCandidate> {
    let rows_b = segment_rows(set_b, seg_b);
    if rows_b.nrows() == 0 {
        log::debug!(
            "phrase match: segment {}..{} has no frames in B, skipped",
            seg_b.start,
            seg_b.end
        );
        return None;
    }

    let (similarity, dtw_cost) = match compare_with_config(rows_a, &rows_b, &config.compare) {
        Ok(c) => (c.similarity, c.dtw_cost),
        Err(e) => {
            log::warn!(
                "phrase match: A {}..{} vs B {}..{} not aligned: {}",
                seg_a.start,
                seg_a.end,
                seg_b.start,
                seg_b.end,
                e
            );
            (0.0, f32::INFINITY)
        }
    };

    let parts = part_similarities(rows_a, &rows_b, config.compare.alpha);
    let mut ranked: Vec<(BodyPart, f32)> = parts.iter().map(|(p, s)| (*p, *s)).collect();
    // Stable sort keeps Upper, Core, Lower order on ties
    ranked.sort_by(|x, y| y.1.total_cmp(&x.1));
    let dominant = ranked.iter().take(2).map(|(p, _)| *p).collect();
    let weakest = ranked.last().map_or(BodyPart::Core, |(p, _)| *p);

    let mid_gap = (seg_a.midpoint_sec(set_a.sample_fps) - seg_b.midpoint_sec(set_b.sample_fps)).abs();

    Some(PhraseCandidate {
        segment: *seg_b,
        start_sec: seg_b.start_sec(set_b.sample_fps),
        end_sec: seg_b.end_sec(set_b.sample_fps),
        similarity,
        dtw_cost,
        parts,
        dominant,
        weakest,
        timing_mismatch: mid_gap >= config.segment.timing_mismatch_sec,
    })
}

fn segment_rows(set: &FeatureSet, seg: &Segment) -> Array2<f32> {
    let range = seg.frame_range(set.features.nrows());
    set.features.slice(s![range, ..]).to_owned()
}

/// `exp(-alpha * rms)` of the pooled difference over each part's columns
fn part_similarities(rows_a: &Array2<f32>, rows_b: &Array2<f32>, alpha: f32) -> BTreeMap<BodyPart, f32> {
    let pooled = match (mean_pool(rows_a), mean_pool(rows_b)) {
        (Some(a), Some(b)) if a.len() == b.len() => Some((a, b)),
        _ => None,
    };

    BodyPart::ALL
        .iter()
        .map(|part| {
            let score = pooled
                .as_ref()
                .map_or(0.0, |(a, b)| part_score(a, b, &part.feature_dims(), alpha));
            (*part, score)
        })
        .collect()
}

fn part_score(a: &Array1<f32>, b: &Array1<f32>, dims: &[usize], alpha: f32) -> f32 {
    let used: Vec<f32> = dims
        .iter()
        .filter(|&&d| d < a.len())
        .map(|&d| (a[d] - b[d]).powi(2))
        .collect();
    if used.is_empty() {
        return 0.0;
    }
    let rms = (used.iter().sum::<f32>() / used.len() as f32).sqrt();
    let score = (-alpha * rms).exp();
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
