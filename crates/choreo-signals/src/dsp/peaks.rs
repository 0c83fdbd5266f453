//! Adaptive-threshold peak picking
//!
//! Shared by the audio RMS envelope and the motion-energy series.

/// Hard cap on peaks returned per series
pub const MAX_PEAKS: usize = 200;

/// Find local maxima above `mean + 0.5 * std` (population std).
///
/// Index `i` in `[1, len-2]` qualifies when it exceeds the threshold and is
/// `>=` both neighbours. Candidates closer than `min_distance` samples to the
/// previously accepted peak are skipped. Stops after `max_peaks`.
pub fn detect_peaks(series: &[f32], min_distance: usize, max_peaks: usize) -> Vec<usize> {
    let n = series.len();
    if n < 3 || max_peaks == 0 {
        return vec![];
    }

    let mean: f32 = series.iter().sum::<f32>() / n as f32;
    let std: f32 = (series.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n as f32).sqrt();
    let threshold = mean + 0.5 * std;

    let mut peaks = Vec::new();
    let mut last_peak: Option<usize> = None;

    for i in 1..n - 1 {
        if let Some(last) = last_peak {
            if i - last < min_distance {
                continue;
            }
        }
        if series[i] > threshold && series[i] >= series[i - 1] && series[i] >= series[i + 1] {
            peaks.push(i);
            last_peak = Some(i);
            if peaks.len() >= max_peaks {
                break;
            }
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_series_has_no_peaks() {
        assert!(detect_peaks(&[], 1, 10).is_empty());
        assert!(detect_peaks(&[1.0, 5.0], 1, 10).is_empty());
    }

    #[test]
    fn test_single_spike() {
        let mut s = vec![0.0; 20];
        s[7] = 5.0;
        assert_eq!(detect_peaks(&s, 3, 200), vec![7]);
    }

    #[test]
    fn test_edges_never_peak() {
        let mut s = vec![0.0; 10];
        s[0] = 9.0;
        s[9] = 9.0;
        assert!(detect_peaks(&s, 1, 200).is_empty());
    }

    #[test]
    fn test_min_distance_suppresses_neighbours() {
        let mut s = vec![0.0; 20];
        s[5] = 5.0;
        s[7] = 5.0;
        s[15] = 5.0;
        assert_eq!(detect_peaks(&s, 3, 200), vec![5, 15]);
        assert_eq!(detect_peaks(&s, 2, 200), vec![5, 7, 15]);
    }

    #[test]
    fn test_plateau_counts_first_sample() {
        let mut s = vec![0.0; 12];
        s[4] = 3.0;
        s[5] = 3.0;
        // Both plateau samples qualify; min distance keeps only the first
        assert_eq!(detect_peaks(&s, 2, 200), vec![4]);
    }

    #[test]
    fn test_max_peaks_cap() {
        let s: Vec<f32> = (0..100).map(|i| if i % 4 == 2 { 1.0 } else { 0.0 }).collect();
        assert_eq!(detect_peaks(&s, 1, 5).len(), 5);
    }

    #[test]
    fn test_flat_series_has_no_peaks() {
        assert!(detect_peaks(&[1.0; 30], 1, 200).is_empty());
    }
}
