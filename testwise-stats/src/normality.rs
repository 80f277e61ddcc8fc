//! Normality Tests
//!
//! Thin wrappers over the `normality` crate that map its results and errors
//! into this crate's types:
//! - Lilliefors: Kolmogorov-Smirnov distance against a normal with estimated
//!   mean and standard deviation (decisive)
//! - Jarque-Bera: omnibus skewness/kurtosis statistic (reported)
//! - Shapiro-Wilk: order-statistic W test (reported, up to 5000 values)
//!
//! The standard normal helpers used across the workspace live here as well.

use crate::error::{DiagnosisError, Result};
use crate::moments::is_constant;
use normality::{Computation, Error as NormalityError};
use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{FRAC_1_SQRT_2, SQRT_2};

/// Significance level used for every normality decision
pub const NORMALITY_ALPHA: f64 = 0.05;

/// Largest sample the Shapiro-Wilk approximation supports
pub const SHAPIRO_WILK_MAX_N: usize = 5000;

/// Statistic and p-value of one hypothesis test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestStatistic {
    /// Test statistic
    pub statistic: f64,
    /// p-value in `[0, 1]`
    pub p_value: f64,
}

impl TestStatistic {
    /// Whether the null hypothesis is rejected at `alpha`
    pub fn rejects(&self, alpha: f64) -> bool {
        self.p_value <= alpha
    }
}

impl From<Computation<f64>> for TestStatistic {
    fn from(computation: Computation<f64>) -> Self {
        Self {
            statistic: computation.statistic,
            p_value: computation.p_value.clamp(0.0, 1.0),
        }
    }
}

/// All normality tests run on one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTests {
    /// Empirical-CDF test; decides normality
    pub lilliefors: TestStatistic,
    /// Moment-based test; reported only
    pub jarque_bera: TestStatistic,
    /// Order-statistic test; reported only, absent above 5000 values
    pub shapiro_wilk: Option<TestStatistic>,
}

/// Standard normal CDF
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

/// Standard normal upper tail `1 - Phi(x)` without cancellation
pub fn standard_normal_sf(x: f64) -> f64 {
    0.5 * erfc(x * FRAC_1_SQRT_2)
}

/// Standard normal quantile `Phi^-1(p)` for `p` in `(0, 1)`
pub fn standard_normal_quantile(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

fn require_spread(test: &str, values: &[f64], min: usize) -> Result<()> {
    if values.len() < min {
        return Err(DiagnosisError::NotEnoughSamples {
            got: values.len(),
            min,
        });
    }
    if is_constant(values) {
        return Err(DiagnosisError::DegenerateInput(format!(
            "{} test needs non-zero variance",
            test
        )));
    }
    Ok(())
}

fn map_result(
    test: &str,
    result: std::result::Result<Computation<f64>, NormalityError>,
) -> Result<TestStatistic> {
    match result {
        Ok(computation) => Ok(computation.into()),
        Err(NormalityError::InsufficientSampleSize { given, needed }) => {
            Err(DiagnosisError::NotEnoughSamples {
                got: given,
                min: needed,
            })
        }
        Err(NormalityError::ZeroRange) => Err(DiagnosisError::DegenerateInput(format!(
            "{} test needs non-zero range",
            test
        ))),
        Err(other) => Err(DiagnosisError::InvalidInput(format!(
            "{} test failed: {:?}",
            test, other
        ))),
    }
}

/// Lilliefors test for normality (n >= 5)
pub fn lilliefors(values: &[f64]) -> Result<TestStatistic> {
    require_spread("Lilliefors", values, 5)?;
    map_result(
        "Lilliefors",
        normality::lilliefors(values.iter().copied()),
    )
}

/// Jarque-Bera test for normality (n >= 3)
pub fn jarque_bera(values: &[f64]) -> Result<TestStatistic> {
    require_spread("Jarque-Bera", values, 3)?;
    map_result(
        "Jarque-Bera",
        normality::jarque_bera(values.iter().copied()),
    )
}

/// Shapiro-Wilk W test for normality (3 <= n <= 5000)
pub fn shapiro_wilk(values: &[f64]) -> Result<TestStatistic> {
    require_spread("Shapiro-Wilk", values, 3)?;
    if values.len() > SHAPIRO_WILK_MAX_N {
        return Err(DiagnosisError::InvalidArgument(format!(
            "Shapiro-Wilk test supports at most {} values, got {}",
            SHAPIRO_WILK_MAX_N,
            values.len()
        )));
    }
    map_result(
        "Shapiro-Wilk",
        normality::shapiro_wilk(values.iter().copied()),
    )
}

/// Run all normality tests on clean values (n >= 5)
///
/// Shapiro-Wilk is skipped with a warning above [`SHAPIRO_WILK_MAX_N`].
pub fn normality_tests(values: &[f64]) -> Result<NormalityTests> {
    let shapiro_wilk = if values.len() > SHAPIRO_WILK_MAX_N {
        tracing::warn!(
            n = values.len(),
            max = SHAPIRO_WILK_MAX_N,
            "Sample too large for Shapiro-Wilk, test skipped"
        );
        None
    } else {
        Some(shapiro_wilk(values)?)
    };

    Ok(NormalityTests {
        lilliefors: lilliefors(values)?,
        jarque_bera: jarque_bera(values)?,
        shapiro_wilk,
    })
}
