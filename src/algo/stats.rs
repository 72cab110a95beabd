//! Small descriptive statistics used by thresholding and scoring.

/// Value at `fraction` of a sorted slice, interpolating linearly between
/// neighboring order statistics.
///
/// `fraction` is clamped to `[0, 1]`. Returns `None` for an empty slice.
///
/// ```
/// use fundi::algo::stats::percentile;
///
/// let sorted = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(percentile(&sorted, 0.0), Some(1.0));
/// assert_eq!(percentile(&sorted, 0.5), Some(2.5));
/// assert_eq!(percentile(&sorted, 1.0), Some(4.0));
/// ```
pub fn percentile(sorted: &[f64], fraction: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let k = (sorted.len() - 1) as f64 * fraction.clamp(0.0, 1.0);
    let lo = k.floor();
    let hi = k.ceil();
    if lo == hi {
        return Some(sorted[k as usize]);
    }
    Some(sorted[lo as usize] * (hi - k) + sorted[hi as usize] * (k - lo))
}

/// Sort a copy of the finite values in `values`.
pub fn sorted_finite(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation, 0 for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Logistic function `1 / (1 + exp(-gain * (x - center)))`.
///
/// A zero gain yields exactly 0.5 for every input.
#[inline]
pub fn sigmoid(x: f64, gain: f64, center: f64) -> f64 {
    1.0 / (1.0 + (-gain * (x - center)).exp())
}

/// Reciprocal that maps zero (and non-finite results) to zero.
#[inline]
pub(crate) fn safe_recip(scale: f64, value: f64) -> f64 {
    let r = scale / value;
    if value == 0.0 || !r.is_finite() {
        0.0
    } else {
        r
    }
}
