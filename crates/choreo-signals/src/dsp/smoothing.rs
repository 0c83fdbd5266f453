//! Centered moving-average smoothing and frame deltas

use ndarray::{Array2, Axis};

/// Centered moving average.
///
/// Each output sample averages `values[i - w/2 ..= i + (w-1)/2]`, exactly `w`
/// samples; an even window leans one sample toward the past. The span is
/// clipped at the edges so border samples average fewer inputs. A window of
/// 0 or 1 returns the input unchanged.
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }

    let before = window / 2;
    let after = (window - 1) / 2;
    let n = values.len();

    // Prefix sums keep this O(n) for long clips
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    for &v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v as f64);
    }

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(n);
            ((prefix[end] - prefix[start]) / (end - start) as f64) as f32
        })
        .collect()
}

/// Apply [`moving_average`] independently to every column.
pub fn smooth_columns(data: &Array2<f32>, window: usize) -> Array2<f32> {
    let mut out = data.clone();
    if window <= 1 || data.nrows() == 0 {
        return out;
    }

    for mut column in out.axis_iter_mut(Axis(1)) {
        let smoothed = moving_average(&column.to_vec(), window);
        for (dst, src) in column.iter_mut().zip(smoothed) {
            *dst = src;
        }
    }
    out
}

/// First difference along rows: `delta[i] = data[i] - data[i-1]`, `delta[0] = 0`.
pub fn row_delta(data: &Array2<f32>) -> Array2<f32> {
    let mut delta = Array2::zeros(data.raw_dim());
    for i in 1..data.nrows() {
        let diff = &data.row(i) - &data.row(i - 1);
        delta.row_mut(i).assign(&diff);
    }
    delta
}
