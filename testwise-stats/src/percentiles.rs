//! Empirical Quantiles
//!
//! Linear interpolation between closest ranks (the "type 7" definition),
//! which is what the IQR outlier fences and the median-centered homogeneity
//! test are defined against.

/// Quantile of an already sorted slice, `q` in `[0, 1]`.
///
/// Returns NaN for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}

/// Quantile of unsorted values (sorts a copy)
///
/// # Examples
///
/// ```
/// # use testwise_stats::quantile;
/// let values = [5.0, 1.0, 3.0, 2.0, 4.0];
/// assert_eq!(quantile(&values, 0.5), 3.0);
/// ```
pub fn quantile(values: &[f64], q: f64) -> f64 {
    quantile_sorted(&sorted_copy(values), q)
}

/// Median of unsorted values
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// First and third quartiles of unsorted values
pub fn quartiles(values: &[f64]) -> (f64, f64) {
    let sorted = sorted_copy(values);
    (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
}

/// Ascending copy; NaN never reaches here because samples are cleaned
pub(crate) fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert!((median(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 3.0).abs() < f64::EPSILON);
        assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let (q1, q3) = quartiles(&values);
        assert!((q1 - 25.75).abs() < 1e-12);
        assert!((q3 - 75.25).abs() < 1e-12);
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(quantile(&[42.0], 0.9), 42.0);
        assert!(quantile(&[], 0.5).is_nan());
    }
}
