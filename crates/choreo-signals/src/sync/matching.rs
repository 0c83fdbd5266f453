//! Greedy one-to-one event matching shared by lag scoring and peak patterns

/// Fraction of events paired within `tolerance`.
///
/// Each `a` takes the nearest unused `b` whose `gap` is within `tolerance`;
/// the first such `b` wins on an exact tie. Rate is
/// `matches / max(|a|, |b|, 1)`, and 0 when either side is empty.
pub(crate) fn greedy_match_rate<T, D, F>(a: &[T], b: &[T], tolerance: D, gap: F) -> f32
where
    T: Copy,
    D: Copy + PartialOrd,
    F: Fn(T, T) -> D,
{
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut used = vec![false; b.len()];
    let mut matches = 0usize;

    for &x in a {
        let mut best: Option<(usize, D)> = None;
        for (j, &y) in b.iter().enumerate() {
            if used[j] {
                continue;
            }
            let d = gap(x, y);
            if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((j, d));
            }
        }
        if let Some((j, _)) = best {
            used[j] = true;
            matches += 1;
        }
    }

    matches as f32 / a.len().max(b.len()).max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{match_rate, normalize_peaks, pattern_similarity};
    use approx::assert_relative_eq;

    #[test]
    fn test_nearest_unused_wins() {
        // 10 takes 12 (closer than 5); 11 then falls back to 5
        let rate = greedy_match_rate(&[10i64, 11], &[5, 12], 6, |x, y| (y - x).abs());
        assert_relative_eq!(rate, 1.0);
        let rate = greedy_match_rate(&[10i64, 11], &[5, 12], 2, |x, y| (y - x).abs());
        assert_relative_eq!(rate, 0.5);
    }

    #[test]
    fn test_empty_side_is_zero() {
        assert_eq!(greedy_match_rate::<f32, f32, _>(&[], &[1.0], 1.0, |x, y| (y - x).abs()), 0.0);
        assert_eq!(greedy_match_rate::<f32, f32, _>(&[1.0], &[], 1.0, |x, y| (y - x).abs()), 0.0);
    }

    #[test]
    fn test_nan_gap_never_matches() {
        let rate = greedy_match_rate(&[f32::NAN, 0.5], &[0.5, 0.9], 0.1, |x: f32, y: f32| (y - x).abs());
        assert_relative_eq!(rate, 0.5);
    }

    #[test]
    fn test_millisecond_and_normalized_matching_agree() {
        let a_ms = [0i64, 1000, 2000, 3000];
        let b_ms = [40i64, 1080, 2600];
        let by_ms = match_rate(&a_ms, &b_ms, 100, 0);

        let a = normalize_peaks(&a_ms, 4000);
        let b = normalize_peaks(&b_ms, 4000);
        let by_position = pattern_similarity(&a, &b, 100.0 / 4000.0);

        assert_relative_eq!(by_ms, 0.5);
        assert_relative_eq!(by_position, by_ms);
    }
}
