//! Rank Tests
//!
//! - Mann-Whitney U for two independent samples
//! - Wilcoxon signed-rank for paired samples
//!
//! p-values come from `anofox_statistics`, exact for small tie-free samples and
//! normal-approximated with tie correction otherwise. Statistics are reported
//! in a fixed convention: U of the first sample and `min(W+, W-)`. All
//! p-values are two-sided.

use crate::error::{InferenceError, Result};
use anofox_statistics::parametric::ttest::Alternative;
use anofox_statistics::nonparametric::wilcoxon;
use serde::{Deserialize, Serialize};
use testwise_stats::standard_normal_quantile;

/// Largest size of either group for the exact Mann-Whitney distribution
pub const MANN_WHITNEY_EXACT_MAX: usize = 8;

/// Largest number of non-zero differences for the exact signed-rank distribution
pub const WILCOXON_EXACT_MAX: usize = 50;

/// Result of a rank test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankTestResult {
    /// U of the first sample, or min(W+, W-)
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Normal deviate when the approximation was used
    pub z_value: Option<f64>,
    /// Whether the exact null distribution was used
    pub exact: bool,
}

/// Average ranks (1-based) and the sizes of tied runs longer than one
pub fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share the average of ranks start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }
    (ranks, ties)
}

/// Signed normal deviate equivalent to a two-sided p-value
fn deviate(p_value: f64, direction: f64) -> Option<f64> {
    let magnitude = -standard_normal_quantile(p_value / 2.0);
    magnitude
        .is_finite()
        .then(|| magnitude.max(0.0).copysign(direction))
}

fn checked_p_value(test: &str, p_value: f64) -> Result<f64> {
    if p_value.is_finite() {
        Ok(p_value.clamp(0.0, 1.0))
    } else {
        Err(InferenceError::DegenerateInput(format!(
            "{} p-value is undefined",
            test
        )))
    }
}

/// Mann-Whitney U test
///
/// The statistic is U of `a`. The exact distribution is used when both
/// samples have at most [`MANN_WHITNEY_EXACT_MAX`] values and there are no
/// ties; otherwise the normal approximation with tie and continuity
/// correction.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<RankTestResult> {
    if a.is_empty() || b.is_empty() {
        return Err(InferenceError::NotEnoughSamples {
            got: a.len().min(b.len()),
            min: 1,
        });
    }

    let (n1, n2) = (a.len(), b.len());
    let combined: Vec<f64> = a.iter().chain(b).copied().collect();
    let (ranks, ties) = average_ranks(&combined);
    if ties.first() == Some(&combined.len()) {
        return Err(InferenceError::DegenerateInput(
            "all observations are tied".to_string(),
        ));
    }

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let exact = ties.is_empty() && n1.max(n2) <= MANN_WHITNEY_EXACT_MAX;

    let result = wilcoxon::mann_whitney_u(a, b, Alternative::TwoSided, true, exact, None, None)?;
    let p_value = checked_p_value("Mann-Whitney", result.p_value)?;

    Ok(RankTestResult {
        statistic: u1,
        p_value,
        z_value: if exact {
            None
        } else {
            deviate(p_value, u1 - (n1 * n2) as f64 / 2.0)
        },
        exact,
    })
}

/// Wilcoxon signed-rank test on `(first, second)` pairs
///
/// Zero differences are dropped before ranking. The statistic is
/// `min(W+, W-)`. The exact distribution is used for at most
/// [`WILCOXON_EXACT_MAX`] differences with no ties and no zeros; otherwise the
/// normal approximation with tie correction.
pub fn wilcoxon_signed_rank(pairs: &[(f64, f64)]) -> Result<RankTestResult> {
    let diffs: Vec<f64> = pairs.iter().map(|(x, y)| x - y).collect();
    let zeros = diffs.iter().filter(|d| **d == 0.0).count();
    let nonzero: Vec<f64> = diffs.into_iter().filter(|d| *d != 0.0).collect();
    if nonzero.is_empty() {
        return Err(InferenceError::DegenerateInput(
            "all paired differences are zero".to_string(),
        ));
    }

    let magnitudes: Vec<f64> = nonzero.iter().map(|d| d.abs()).collect();
    let (ranks, ties) = average_ranks(&magnitudes);
    let w_plus: f64 = nonzero
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let n = nonzero.len();
    let half_total = (n * (n + 1)) as f64 / 4.0;
    let statistic = w_plus.min(2.0 * half_total - w_plus);
    let exact = n <= WILCOXON_EXACT_MAX && ties.is_empty() && zeros == 0;

    let (first, second): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
    let result = wilcoxon::wilcoxon_signed_rank(
        &first,
        &second,
        Alternative::TwoSided,
        true,
        exact,
        None,
        None,
    )?;
    let p_value = checked_p_value("Wilcoxon signed-rank", result.p_value)?;

    Ok(RankTestResult {
        statistic,
        p_value,
        z_value: if exact {
            None
        } else {
            deviate(p_value, w_plus - half_total)
        },
        exact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_ranks_with_ties() {
        let (ranks, ties) = average_ranks(&[10.0, 20.0, 20.0, 5.0]);
        assert_eq!(ranks, vec![2.0, 3.5, 3.5, 1.0]);
        assert_eq!(ties, vec![2]);
    }

    #[test]
    fn test_deviate_sign_and_scale() {
        assert!((deviate(0.05, -1.0).unwrap() + 1.959963984540054).abs() < 1e-9);
        assert!((deviate(0.05, 3.0).unwrap() - 1.959963984540054).abs() < 1e-9);
        assert_eq!(deviate(1.0, 1.0), Some(0.0));
        assert_eq!(deviate(0.0, 1.0), None);
    }

    #[test]
    fn test_mann_whitney_exact_complete_separation() {
        let result = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert!(result.exact);
        assert!(result.z_value.is_none());
        assert_eq!(result.statistic, 0.0);
        // 2 / C(6,3)
        assert!((result.p_value - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_mann_whitney_exact_symmetric_case_is_one() {
        let result = mann_whitney_u(&[1.0, 4.0], &[2.0, 3.0]).unwrap();
        assert_eq!(result.statistic, 2.0);
        assert!((result.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mann_whitney_exact_needs_both_groups_small() {
        let small = [0.5, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5];
        let large: Vec<f64> = (0..200).map(|i| i as f64 * 0.1 + 0.01).collect();
        let result = mann_whitney_u(&small, &large).unwrap();
        assert!(!result.exact);
        assert!(result.z_value.is_some());
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn test_mann_whitney_asymptotic_with_ties() {
        let a: Vec<f64> = (0..30).map(|i| (i / 3) as f64).collect();
        let b: Vec<f64> = (0..30).map(|i| (i / 3) as f64 + 5.0).collect();
        let result = mann_whitney_u(&a, &b).unwrap();
        assert!(!result.exact);
        assert!(result.z_value.unwrap() < 0.0);
        assert!(result.p_value < 0.001);
        assert!(result.statistic < 450.0);
    }

    #[test]
    fn test_mann_whitney_all_tied() {
        assert!(matches!(
            mann_whitney_u(&[1.0; 10], &[1.0; 10]),
            Err(InferenceError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_wilcoxon_exact_all_positive() {
        let pairs: Vec<(f64, f64)> = (1..=6).map(|i| (i as f64 * 1.5, 0.0)).collect();
        let result = wilcoxon_signed_rank(&pairs).unwrap();
        assert!(result.exact);
        assert_eq!(result.statistic, 0.0);
        // 2 * 1/64
        assert!((result.p_value - 2.0 / 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_wilcoxon_zeros_force_approximation() {
        let pairs = vec![(1.0, 1.0), (3.0, 1.0), (5.0, 1.5), (2.0, 4.5), (9.0, 1.0)];
        let result = wilcoxon_signed_rank(&pairs).unwrap();
        assert!(!result.exact);
        // differences 2, 3.5, -2.5, 8 -> ranks 1, 3, 2, 4; W- = 2
        assert_eq!(result.statistic, 2.0);
        assert!(result.z_value.unwrap() > 0.0);
    }

    #[test]
    fn test_wilcoxon_all_zero() {
        assert!(matches!(
            wilcoxon_signed_rank(&[(1.0, 1.0), (2.0, 2.0)]),
            Err(InferenceError::DegenerateInput(_))
        ));
    }
}
