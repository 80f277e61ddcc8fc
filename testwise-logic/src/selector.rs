//! Method Selection
//!
//! A priority-ordered decision tree over the diagnostic flags. Earlier
//! branches short-circuit and ignore inputs that only matter further down:
//!
//! 1. hierarchical design -> mixed model (normality picks LMM vs GLMM)
//! 2. paired design -> paired t-test or signed-rank test
//! 3. a stated group count other than two -> no recommendation
//! 4. two independent groups -> pooled t, Welch t or Mann-Whitney U

use crate::context::SelectorContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use testwise_stats::{DistributionVerdict, HomogeneityVerdict};
use thiserror::Error;

/// Closed catalog of recommendable methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Pooled-variance two-sample t-test
    #[serde(rename = "Independent T-test")]
    IndependentTTest,
    /// Unequal-variance two-sample t-test
    #[serde(rename = "Welch T-test")]
    WelchTTest,
    /// t-test on within-pair differences
    #[serde(rename = "Paired T-test")]
    PairedTTest,
    /// Rank test on within-pair differences
    #[serde(rename = "Wilcoxon Signed-Rank")]
    WilcoxonSignedRank,
    /// Rank-sum test for two independent groups
    #[serde(rename = "Mann-Whitney U")]
    MannWhitneyU,
    /// Linear mixed model
    #[serde(rename = "LMM")]
    Lmm,
    /// Generalized linear mixed model, or a transform followed by an LMM
    #[serde(rename = "GLMM_or_LMM")]
    GlmmOrLmm,
    /// No method in the catalog fits
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Method {
    /// Every method, in catalog order
    pub const ALL: [Method; 8] = [
        Method::IndependentTTest,
        Method::WelchTTest,
        Method::PairedTTest,
        Method::WilcoxonSignedRank,
        Method::MannWhitneyU,
        Method::Lmm,
        Method::GlmmOrLmm,
        Method::Unknown,
    ];

    /// Canonical display name
    pub fn name(self) -> &'static str {
        match self {
            Method::IndependentTTest => "Independent T-test",
            Method::WelchTTest => "Welch T-test",
            Method::PairedTTest => "Paired T-test",
            Method::WilcoxonSignedRank => "Wilcoxon Signed-Rank",
            Method::MannWhitneyU => "Mann-Whitney U",
            Method::Lmm => "LMM",
            Method::GlmmOrLmm => "GLMM_or_LMM",
            Method::Unknown => "Unknown",
        }
    }

    /// Whether the method assumes normally distributed data
    pub fn is_parametric(self) -> bool {
        matches!(
            self,
            Method::IndependentTTest | Method::WelchTTest | Method::PairedTTest | Method::Lmm
        )
    }

    /// Whether the method fits a mixed-effects model
    pub fn is_mixed_model(self) -> bool {
        matches!(self, Method::Lmm | Method::GlmmOrLmm)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized method name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown method '{0}'")]
pub struct ParseMethodError(pub String);

impl FromStr for Method {
    type Err = ParseMethodError;

    /// Accepts the display name or a compact alias (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        let method = match key.as_str() {
            "independentttest" | "ttest" | "student" => Method::IndependentTTest,
            "welchttest" | "welchsttest" | "welch" => Method::WelchTTest,
            "pairedttest" | "paired" => Method::PairedTTest,
            "wilcoxonsignedrank" | "wilcoxon" | "signedrank" => Method::WilcoxonSignedRank,
            "mannwhitneyu" | "mannwhitney" | "ranksum" => Method::MannWhitneyU,
            "lmm" => Method::Lmm,
            "glmmorlmm" | "glmm" => Method::GlmmOrLmm,
            "unknown" => Method::Unknown,
            _ => return Err(ParseMethodError(s.to_string())),
        };
        Ok(method)
    }
}

/// Selected method with its justification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecommendation {
    /// Recommended method
    pub method: Method,
    /// Human-readable justification
    pub advice: String,
}

impl MethodRecommendation {
    fn new(method: Method, advice: impl Into<String>) -> Self {
        Self {
            method,
            advice: advice.into(),
        }
    }
}

/// Recommend a test from the diagnostic flags
///
/// Pure and total: the same inputs always give the same recommendation and
/// every input combination gets one (possibly [`Method::Unknown`]).
///
/// # Examples
///
/// ```
/// # use testwise_logic::{recommend, Method, SelectorContext};
/// let rec = recommend(true, None, &SelectorContext::independent(2));
/// assert_eq!(rec.method, Method::IndependentTTest);
///
/// let rec = recommend(false, Some(true), &SelectorContext::default().with_hierarchical(true));
/// assert_eq!(rec.method, Method::GlmmOrLmm);
/// ```
pub fn recommend(
    is_normal: bool,
    is_homogeneous: Option<bool>,
    context: &SelectorContext,
) -> MethodRecommendation {
    let recommendation = decide(is_normal, is_homogeneous, context);
    tracing::debug!(
        method = %recommendation.method,
        is_normal,
        ?is_homogeneous,
        ?context,
        "Selected method"
    );
    recommendation
}

fn decide(
    is_normal: bool,
    is_homogeneous: Option<bool>,
    context: &SelectorContext,
) -> MethodRecommendation {
    const HIERARCHICAL: &str = "Data has hierarchical structure (ID column detected).";

    // Nested data: homogeneity and pairing are irrelevant here
    if context.hierarchical {
        return if is_normal {
            MethodRecommendation::new(
                Method::Lmm,
                format!("{} Recommend Linear Mixed Model (LMM).", HIERARCHICAL),
            )
        } else {
            MethodRecommendation::new(
                Method::GlmmOrLmm,
                format!(
                    "{} Data is non-normal. Recommend Generalized Linear Mixed Model (GLMM) \
                     or Transformation + LMM.",
                    HIERARCHICAL
                ),
            )
        };
    }

    // Paired data: homogeneity is irrelevant
    if context.paired {
        return if is_normal {
            MethodRecommendation::new(Method::PairedTTest, "Data is Normal and Paired.")
        } else {
            MethodRecommendation::new(Method::WilcoxonSignedRank, "Data is Non-Normal and Paired.")
        };
    }

    // Independent groups: an unstated count means the two-group default
    match context.group_count {
        None | Some(2) => {}
        Some(count) => {
            return MethodRecommendation::new(
                Method::Unknown,
                format!(
                    "No recommendation. Found {} group{}; the catalog covers two independent \
                     groups, paired designs and hierarchical designs.",
                    count,
                    if count == 1 { "" } else { "s" }
                ),
            );
        }
    }

    // Unchecked homogeneity counts as met
    let is_homogeneous = is_homogeneous.unwrap_or(true);
    match (is_normal, is_homogeneous) {
        (true, true) => MethodRecommendation::new(
            Method::IndependentTTest,
            "Normality and Homogeneity assumptions met.",
        ),
        (true, false) => MethodRecommendation::new(
            Method::WelchTTest,
            "Normality met, but Variance is unequal.",
        ),
        (false, _) => {
            MethodRecommendation::new(Method::MannWhitneyU, "Normality assumption violated.")
        }
    }
}

/// Recommend a test straight from diagnostic verdicts
///
/// `homogeneity` is `None` when no homogeneity check was run. An inconclusive
/// homogeneity verdict resolves to `inconclusive_default`, or non-homogeneous
/// when that is `None` too.
pub fn recommend_from_verdicts(
    distribution: &DistributionVerdict,
    homogeneity: Option<&HomogeneityVerdict>,
    inconclusive_default: Option<bool>,
    context: &SelectorContext,
) -> MethodRecommendation {
    let is_homogeneous = homogeneity.map(|verdict| verdict.resolve(inconclusive_default));
    recommend(distribution.is_normal, is_homogeneous, context)
}
