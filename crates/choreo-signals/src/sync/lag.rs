//! Peak-train lag estimation and match rate

use serde::{Deserialize, Serialize};

use super::matching::greedy_match_rate;
use crate::config::SyncConfig;

/// Pairwise offsets beyond this are not considered
pub const MAX_LAG_MS: i64 = 2000;
/// Histogram bin width for offsets
pub const LAG_BIN_MS: i64 = 50;
/// Peaks considered per input
pub const MAX_SYNC_PEAKS: usize = 200;

/// Lag and agreement between audio and motion transients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Motion minus audio, in ms. Positive means motion trails audio.
    pub lag_ms: i64,
    /// Share of peaks matched after lag compensation, 0..1
    pub match_rate: f32,
}

/// Mode of pairwise `motion - audio` offsets with default bins.
pub fn estimate_lag(audio_ms: &[i64], motion_ms: &[i64]) -> i64 {
    estimate_lag_with(audio_ms, motion_ms, MAX_LAG_MS, LAG_BIN_MS, MAX_SYNC_PEAKS)
}

/// Histogram every pairwise offset within `max_lag_ms` into `bin_ms` bins
/// (round half to even) and return the center of the fullest bin.
///
/// Ties go to the bin that was filled first. No usable pair gives 0.
pub fn estimate_lag_with(
    audio_ms: &[i64],
    motion_ms: &[i64],
    max_lag_ms: i64,
    bin_ms: i64,
    max_peaks: usize,
) -> i64 {
    if audio_ms.is_empty() || motion_ms.is_empty() || bin_ms <= 0 {
        return 0;
    }

    // (bin, count) in first-seen order
    let mut bins: Vec<(i64, usize)> = Vec::new();
    for &ta in audio_ms.iter().take(max_peaks) {
        for &tm in motion_ms.iter().take(max_peaks) {
            let d = tm - ta;
            if d.abs() > max_lag_ms {
                continue;
            }
            let k = (d as f64 / bin_ms as f64).round_ties_even() as i64;
            match bins.iter_mut().find(|(bin, _)| *bin == k) {
                Some((_, count)) => *count += 1,
                None => bins.push((k, 1)),
            }
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for &(bin, count) in &bins {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((bin, count));
        }
    }

    best.map_or(0, |(bin, _)| bin * bin_ms)
}

/// Greedy one-to-one matching after removing `lag_ms` from `b`.
///
/// Each `a` takes the nearest unused `b` within `tolerance_ms`.
/// Rate is `matches / max(|a|, |b|, 1)`.
pub fn match_rate(a_ms: &[i64], b_ms: &[i64], tolerance_ms: i64, lag_ms: i64) -> f32 {
    greedy_match_rate(a_ms, b_ms, tolerance_ms, |ta, tb| ((tb - lag_ms) - ta).abs())
}

/// Estimate lag, then score agreement with default lag settings.
pub fn synchronize(peaks_audio_ms: &[i64], peaks_motion_ms: &[i64], tolerance_ms: i64) -> SyncResult {
    let config = SyncConfig {
        tolerance_ms,
        ..SyncConfig::default()
    };
    synchronize_with_config(peaks_audio_ms, peaks_motion_ms, &config)
}

pub fn synchronize_with_config(
    peaks_audio_ms: &[i64],
    peaks_motion_ms: &[i64],
    config: &SyncConfig,
) -> SyncResult {
    let audio = &peaks_audio_ms[..peaks_audio_ms.len().min(config.max_peaks)];
    let motion = &peaks_motion_ms[..peaks_motion_ms.len().min(config.max_peaks)];

    let lag_ms = estimate_lag_with(audio, motion, config.max_lag_ms, config.bin_ms, config.max_peaks);
    let rate = match_rate(audio, motion, config.tolerance_ms, lag_ms);
    log::debug!(
        "sync: {} audio / {} motion peaks -> lag {} ms, match rate {:.3}",
        audio.len(),
        motion.len(),
        lag_ms,
        rate
    );

    SyncResult {
        lag_ms,
        match_rate: rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_lag_is_zero() {
        assert_eq!(estimate_lag(&[], &[100, 200]), 0);
        assert_eq!(estimate_lag(&[100], &[]), 0);
    }

    #[test]
    fn test_out_of_range_offsets_ignored() {
        assert_eq!(estimate_lag(&[0], &[5000]), 0);
    }

    #[test]
    fn test_constant_shift() {
        let audio = [100, 600, 1100, 1600];
        let motion: Vec<i64> = audio.iter().map(|t| t + 120).collect();
        // 120 / 50 = 2.4 -> bin 2 -> 100 ms
        assert_eq!(estimate_lag(&audio, &motion), 100);
    }

    #[test]
    fn test_half_bin_rounds_to_even() {
        // 75 / 50 = 1.5 -> 2, 125 / 50 = 2.5 -> 2
        assert_eq!(estimate_lag(&[0], &[75]), 100);
        assert_eq!(estimate_lag(&[0], &[125]), 100);
        // -25 / 50 = -0.5 -> 0
        assert_eq!(estimate_lag(&[100], &[75]), 0);
    }

    #[test]
    fn test_tie_goes_to_first_bin() {
        // Offsets +200 and -300, one each: first seen wins
        assert_eq!(estimate_lag(&[1000], &[1200, 700]), 200);
    }

    #[test]
    fn test_match_rate_basic() {
        let a = [100, 600, 1100];
        let b = [150, 650, 1150];
        assert_relative_eq!(match_rate(&a, &b, 150, 50), 1.0);
        assert_relative_eq!(match_rate(&a, &b, 10, 0), 0.0);
    }

    #[test]
    fn test_match_rate_one_to_one() {
        // Two audio peaks compete for a single motion peak
        assert_relative_eq!(match_rate(&[100, 110], &[105], 150, 0), 0.5);
    }

    #[test]
    fn test_match_rate_uses_larger_count() {
        assert_relative_eq!(match_rate(&[100], &[100, 900, 1700, 2500], 150, 0), 0.25);
    }

    #[test]
    fn test_synchronize() {
        let r = synchronize(&[100, 600, 1100], &[150, 650, 1150], 150);
        assert_eq!(r.lag_ms, 50);
        assert_relative_eq!(r.match_rate, 1.0);
    }

    #[test]
    fn test_peak_cap() {
        let audio: Vec<i64> = (0..500).map(|i| i * 100).collect();
        let r = synchronize(&audio, &audio, 150);
        assert_eq!(r.lag_ms, 0);
        assert_relative_eq!(r.match_rate, 1.0);
    }
}
