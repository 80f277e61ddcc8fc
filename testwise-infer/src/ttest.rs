//! Student t-tests
//!
//! Two-sided tests on means:
//! - pooled-variance two-sample (df = n1 + n2 - 2)
//! - Welch unequal-variance two-sample (Welch-Satterthwaite df)
//! - paired, on within-pair differences (df = pairs - 1)
//!
//! Statistics and p-values come from `anofox_statistics`; inputs are checked
//! for size and spread first so degenerate designs fail with a typed error.

use crate::error::{InferenceError, Result};
use anofox_statistics::parametric::ttest::{Alternative, TTestKind, t_test};
use serde::{Deserialize, Serialize};

/// Result of a t-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    /// t statistic
    pub statistic: f64,
    /// Degrees of freedom
    pub df: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Mean of the first sample minus mean of the second (or mean difference)
    pub mean_difference: f64,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn require(values: &[f64], min: usize) -> Result<()> {
    if values.len() < min {
        return Err(InferenceError::NotEnoughSamples {
            got: values.len(),
            min,
        });
    }
    Ok(())
}

fn run(a: &[f64], b: &[f64], kind: TTestKind, mean_difference: f64) -> Result<TTestResult> {
    let result = t_test(a, b, kind, Alternative::TwoSided, 0.0, None)?;
    if !result.statistic.is_finite() || !result.p_value.is_finite() {
        return Err(InferenceError::DegenerateInput(
            "t statistic is undefined (zero standard error)".to_string(),
        ));
    }
    Ok(TTestResult {
        statistic: result.statistic,
        df: result.df,
        p_value: result.p_value.clamp(0.0, 1.0),
        mean_difference,
    })
}

fn has_spread(values: &[f64]) -> bool {
    values.iter().any(|x| *x != values[0])
}

fn two_sample(a: &[f64], b: &[f64], kind: TTestKind) -> Result<TTestResult> {
    require(a, 2)?;
    require(b, 2)?;
    if !has_spread(a) && !has_spread(b) {
        return Err(InferenceError::DegenerateInput(
            "t statistic is undefined (zero standard error)".to_string(),
        ));
    }
    run(a, b, kind, mean(a) - mean(b))
}

/// Pooled-variance two-sample t-test
pub fn pooled_t_test(a: &[f64], b: &[f64]) -> Result<TTestResult> {
    two_sample(a, b, TTestKind::Student)
}

/// Welch unequal-variance two-sample t-test
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TTestResult> {
    two_sample(a, b, TTestKind::Welch)
}

/// Row-aligned pairs with a missing side dropped
///
/// Both inputs are raw (NaN marks missing); unequal lengths cannot be paired.
pub fn aligned_pairs(a: &[f64], b: &[f64]) -> Result<Vec<(f64, f64)>> {
    if a.len() != b.len() {
        return Err(InferenceError::InvalidArgument(format!(
            "paired test needs equally sized groups, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter()
        .zip(b)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect())
}

/// Paired t-test on `(first, second)` pairs
pub fn paired_t_test(pairs: &[(f64, f64)]) -> Result<TTestResult> {
    let diffs: Vec<f64> = pairs.iter().map(|(x, y)| x - y).collect();
    require(&diffs, 2)?;
    if !has_spread(&diffs) {
        return Err(InferenceError::DegenerateInput(
            "paired differences have zero variance".to_string(),
        ));
    }

    let (first, second): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
    run(&first, &second, TTestKind::Paired, mean(&diffs))
}
