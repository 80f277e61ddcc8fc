//! Variance Homogeneity
//!
//! Brown-Forsythe test: a one-way ANOVA on absolute deviations from each
//! group's median. Robust to non-normal groups where a variance-ratio F test
//! is not.

use crate::moments::is_constant;
use crate::normality::NORMALITY_ALPHA;
use crate::percentiles::median;
use crate::sample::GroupedSample;
use serde::{Deserialize, Serialize};

/// Homogeneity verdict across the groups of a grouped sample
///
/// When the test cannot be computed the verdict is the inconclusive sentinel:
/// `p_value` NaN, `is_homogeneous` false and no statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomogeneityVerdict {
    /// Brown-Forsythe p-value (NaN when inconclusive)
    pub p_value: f64,
    /// `p_value > 0.05`
    pub is_homogeneous: bool,
    /// Brown-Forsythe F statistic
    pub statistic: Option<f64>,
}

impl HomogeneityVerdict {
    /// The "could not be computed" sentinel
    pub fn inconclusive() -> Self {
        Self {
            p_value: f64::NAN,
            is_homogeneous: false,
            statistic: None,
        }
    }

    /// Whether this is the sentinel
    pub fn is_inconclusive(&self) -> bool {
        self.p_value.is_nan()
    }

    /// Homogeneity flag with a caller-supplied answer for the sentinel.
    ///
    /// Without an override an inconclusive verdict counts as non-homogeneous.
    pub fn resolve(&self, inconclusive_default: Option<bool>) -> bool {
        if self.is_inconclusive() {
            inconclusive_default.unwrap_or(false)
        } else {
            self.is_homogeneous
        }
    }
}

/// Brown-Forsythe F statistic and p-value, `None` when undefined
///
/// Groups with fewer than two values carry no spread and are skipped. The
/// statistic itself comes from `anofox_statistics`.
pub fn brown_forsythe(groups: &[&[f64]]) -> Option<(f64, f64)> {
    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| g.len() >= 2).collect();
    let k = groups.len();
    let n_total: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || n_total <= k {
        return None;
    }

    // Every group's absolute deviations constant: zero within-group mean square
    let spread = groups.iter().any(|group| {
        let center = median(group);
        let deviations: Vec<f64> = group.iter().map(|x| (x - center).abs()).collect();
        !is_constant(&deviations)
    });
    if !spread {
        return None;
    }

    match anofox_statistics::brown_forsythe(&groups) {
        Ok(result) if result.statistic.is_finite() && result.p_value.is_finite() => {
            Some((result.statistic, result.p_value.clamp(0.0, 1.0)))
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Brown-Forsythe test rejected the groups: {}", e);
            None
        }
    }
}

/// Test equality of variances across the groups of a grouped sample
///
/// Never fails: without a group column, with fewer than two groups of at
/// least two values, or with no within-group spread the inconclusive sentinel
/// is returned.
pub fn check_homogeneity(grouped: &GroupedSample) -> HomogeneityVerdict {
    if grouped.group_column().is_none() {
        return HomogeneityVerdict::inconclusive();
    }

    let groups: Vec<&[f64]> = grouped
        .groups()
        .iter()
        .map(|(_, sample)| sample.values())
        .collect();

    match brown_forsythe(&groups) {
        Some((statistic, p_value)) => {
            let is_homogeneous = p_value > NORMALITY_ALPHA;
            tracing::debug!(statistic, p_value, is_homogeneous, "Checked homogeneity");
            HomogeneityVerdict {
                p_value,
                is_homogeneous,
                statistic: Some(statistic),
            }
        }
        None => {
            tracing::warn!(
                groups = groups.len(),
                "Homogeneity test could not be computed; verdict is inconclusive"
            );
            HomogeneityVerdict::inconclusive()
        }
    }
}
