//! Inference Runner
//!
//! Executes the recommended method against a grouped sample.

use crate::error::{InferenceError, Result};
use crate::formula::{Formula, build_design};
use crate::mixed::{MixedModelFit, fit_random_intercept};
use crate::rank::{RankTestResult, mann_whitney_u, wilcoxon_signed_rank};
use crate::ttest::{TTestResult, aligned_pairs, paired_t_test, pooled_t_test, welch_t_test};
use serde::{Deserialize, Serialize};
use testwise_logic::Method;
use testwise_stats::{GroupedSample, Sample};

/// Default significance level
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Result of running one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Name of the test that was executed
    pub test: String,
    /// Method that was requested
    pub method: Method,
    /// Test statistic (t, U, min(W+, W-) or the Wald z of the effect)
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Degrees of freedom, for t-tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df: Option<f64>,
    /// Normal deviate, for approximate rank tests and Wald tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_value: Option<f64>,
    /// Whether an exact null distribution was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<bool>,
    /// Mean difference or effect estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    /// Group labels in comparison order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// p < alpha
    pub significant: bool,
    /// Significance level
    pub alpha: f64,
    /// Caveat attached to the result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Full fit, for mixed models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mixed_model: Option<MixedModelFit>,
}

impl TestOutcome {
    fn new(test: &str, method: Method, statistic: f64, p_value: f64, alpha: f64) -> Self {
        Self {
            test: test.to_string(),
            method,
            statistic,
            p_value,
            df: None,
            z_value: None,
            exact: None,
            estimate: None,
            groups: Vec::new(),
            significant: p_value < alpha,
            alpha,
            note: None,
            mixed_model: None,
        }
    }

    fn from_t(test: &str, method: Method, result: TTestResult, alpha: f64) -> Self {
        Self {
            df: Some(result.df),
            estimate: Some(result.mean_difference),
            ..Self::new(test, method, result.statistic, result.p_value, alpha)
        }
    }

    fn from_rank(test: &str, method: Method, result: RankTestResult, alpha: f64) -> Self {
        Self {
            z_value: result.z_value,
            exact: Some(result.exact),
            ..Self::new(test, method, result.statistic, result.p_value, alpha)
        }
    }

    /// Attach a caveat, keeping any already present
    fn add_note(&mut self, note: &str) {
        self.note = Some(match self.note.take() {
            Some(existing) => format!("{}; {}", existing, note),
            None => note.to_string(),
        });
    }

    fn with_groups(mut self, groups: [&str; 2]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }
}

/// Executes methods at a fixed significance level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceRunner {
    alpha: f64,
}

impl Default for InferenceRunner {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl InferenceRunner {
    /// Runner at the default level
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner at level `alpha`, which must lie in (0, 1)
    pub fn with_alpha(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(InferenceError::InvalidArgument(format!(
                "alpha must be in (0, 1), got {}",
                alpha
            )));
        }
        Ok(Self { alpha })
    }

    /// Significance level
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Run `method` on `grouped`
    ///
    /// `formula` only applies to mixed models; without one, the model is
    /// built from the design's value, group and identifier columns.
    pub fn run(
        &self,
        method: Method,
        grouped: &GroupedSample,
        formula: Option<&str>,
    ) -> Result<TestOutcome> {
        let alpha = self.alpha;
        let outcome = match method {
            Method::IndependentTTest => {
                let ((ka, a), (kb, b)) = two_groups(grouped)?;
                TestOutcome::from_t(
                    "Independent T-test",
                    method,
                    pooled_t_test(a.values(), b.values())?,
                    alpha,
                )
                .with_groups([ka, kb])
            }
            Method::WelchTTest => {
                let ((ka, a), (kb, b)) = two_groups(grouped)?;
                TestOutcome::from_t(
                    "Welch T-test",
                    method,
                    welch_t_test(a.values(), b.values())?,
                    alpha,
                )
                .with_groups([ka, kb])
            }
            Method::PairedTTest => {
                let ((ka, a), (kb, b)) = two_groups(grouped)?;
                let pairs = aligned_pairs(a.raw(), b.raw())?;
                TestOutcome::from_t("Paired T-test", method, paired_t_test(&pairs)?, alpha)
                    .with_groups([ka, kb])
            }
            Method::WilcoxonSignedRank => {
                let ((ka, a), (kb, b)) = two_groups(grouped)?;
                let pairs = aligned_pairs(a.raw(), b.raw())?;
                TestOutcome::from_rank(
                    "Wilcoxon Signed-Rank",
                    method,
                    wilcoxon_signed_rank(&pairs)?,
                    alpha,
                )
                .with_groups([ka, kb])
            }
            Method::MannWhitneyU => {
                let ((ka, a), (kb, b)) = two_groups(grouped)?;
                TestOutcome::from_rank(
                    "Mann-Whitney U",
                    method,
                    mann_whitney_u(a.values(), b.values())?,
                    alpha,
                )
                .with_groups([ka, kb])
            }
            Method::Lmm => self.run_mixed(method, grouped, formula)?,
            Method::GlmmOrLmm => {
                let mut outcome = self.run_mixed(method, grouped, formula)?;
                outcome.add_note(
                    "Fitted a Gaussian LMM on the raw scale. Residuals are not normal: \
                     consider a GLMM with a suitable family or a transform of the response.",
                );
                outcome
            }
            Method::Unknown => {
                return Err(InferenceError::InvalidArgument(
                    "no method was recommended; nothing to run".to_string(),
                ));
            }
        };

        tracing::debug!(
            test = %outcome.test,
            statistic = outcome.statistic,
            p_value = outcome.p_value,
            significant = outcome.significant,
            "Inference complete"
        );
        Ok(outcome)
    }

    fn run_mixed(
        &self,
        method: Method,
        grouped: &GroupedSample,
        formula: Option<&str>,
    ) -> Result<TestOutcome> {
        let formula = match formula {
            Some(text) => Formula::parse(text)?.or_group(grouped.id_column()),
            None => Formula::for_design(grouped),
        };
        if formula.group.is_none() {
            return Err(InferenceError::InvalidArgument(
                "mixed model needs a subject identifier column or a (1|group) term".to_string(),
            ));
        }

        let design = build_design(&formula, grouped.table())?;
        let text = formula.to_string();
        let fit = fit_random_intercept(&design, &text)?;

        let Some(effect) = fit.primary_effect().or(fit.fixed_effects.first()) else {
            return Err(InferenceError::ModelFit(
                "model has no fixed effects".to_string(),
            ));
        };

        let mut outcome = TestOutcome::new(
            "Linear Mixed Model (REML)",
            method,
            effect.z_value,
            effect.p_value,
            self.alpha,
        );
        outcome.z_value = Some(effect.z_value);
        outcome.estimate = Some(effect.estimate);
        if !fit.converged {
            outcome.add_note("variance ratio search hit its bound");
        }
        outcome.mixed_model = Some(fit);
        Ok(outcome)
    }
}

type Labeled<'a> = (&'a str, &'a Sample);

/// The two groups of a two-group design, in order of first appearance
fn two_groups(grouped: &GroupedSample) -> Result<(Labeled<'_>, Labeled<'_>)> {
    match grouped.groups() {
        [(ka, a), (kb, b)] => Ok(((ka.as_str(), a), (kb.as_str(), b))),
        groups => Err(InferenceError::InvalidArgument(match grouped.group_column() {
            Some(column) => format!(
                "two-group test needs exactly 2 groups in '{}', found {}",
                column,
                groups.len()
            ),
            None => "two-group test needs a group column".to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testwise_stats::Table;
    use testwise_stats::synthetic::{HierarchicalDesign, hierarchical_table, two_group_table};

    fn two_group_design() -> GroupedSample {
        let table = two_group_table(42, 50, (300.0, 320.0), 30.0).unwrap();
        GroupedSample::new(&table, "RT", Some("Group"), None).unwrap()
    }

    fn paired_design() -> GroupedSample {
        let table = Table::new()
            .with_numeric("score", vec![1.0, 2.0, 3.0, 4.0, 5.0, 2.0, 4.0, 5.0, 4.0, 7.0])
            .unwrap()
            .with_text(
                "phase",
                ["pre", "pre", "pre", "pre", "pre", "post", "post", "post", "post", "post"],
            )
            .unwrap();
        GroupedSample::new(&table, "score", Some("phase"), None)
            .unwrap()
            .with_pairing(true)
    }

    #[test]
    fn test_alpha_validation() {
        assert_eq!(InferenceRunner::new().alpha(), DEFAULT_ALPHA);
        assert!(InferenceRunner::with_alpha(0.01).is_ok());
        assert!(InferenceRunner::with_alpha(0.0).is_err());
        assert!(InferenceRunner::with_alpha(f64::NAN).is_err());
    }

    #[test]
    fn test_independent_t_test_on_shifted_groups() {
        let outcome = InferenceRunner::new()
            .run(Method::IndependentTTest, &two_group_design(), None)
            .unwrap();
        assert_eq!(outcome.test, "Independent T-test");
        assert_eq!(outcome.groups, vec!["Control", "Treatment"]);
        assert_eq!(outcome.df, Some(98.0));
        assert!(outcome.estimate.unwrap() < 0.0);
        assert_eq!(outcome.significant, outcome.p_value < 0.05);
    }

    #[test]
    fn test_welch_and_mann_whitney_run() {
        let design = two_group_design();
        let runner = InferenceRunner::new();
        let welch = runner.run(Method::WelchTTest, &design, None).unwrap();
        assert!(welch.df.unwrap() < 98.0 + 1e-9);
        let rank = runner.run(Method::MannWhitneyU, &design, None).unwrap();
        assert_eq!(rank.exact, Some(false));
        assert!(rank.z_value.is_some());
    }

    #[test]
    fn test_outcome_json_omits_absent_fields() {
        let rank = InferenceRunner::new()
            .run(Method::MannWhitneyU, &two_group_design(), None)
            .unwrap();
        let value = serde_json::to_value(&rank).unwrap();
        assert_eq!(value["method"], "Mann-Whitney U");
        assert_eq!(value["exact"], false);
        assert!(value.get("df").is_none());
        assert!(value.get("mixed_model").is_none());
    }

    #[test]
    fn test_paired_tests_use_row_order() {
        let design = paired_design();
        let runner = InferenceRunner::new();
        let t = runner.run(Method::PairedTTest, &design, None).unwrap();
        assert!((t.statistic + 3.5).abs() < 1e-12);
        assert_eq!(t.groups, vec!["pre", "post"]);

        let w = runner.run(Method::WilcoxonSignedRank, &design, None).unwrap();
        // differences -1, -2, -2, 0, -2: zero dropped, ties present
        assert_eq!(w.exact, Some(false));
        assert_eq!(w.statistic, 0.0);
    }

    #[test]
    fn test_two_group_tests_reject_other_group_counts() {
        let table = Table::new()
            .with_numeric("y", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap()
            .with_text("g", ["a", "a", "b", "b", "c", "c"])
            .unwrap();
        let grouped = GroupedSample::new(&table, "y", Some("g"), None).unwrap();
        assert!(matches!(
            InferenceRunner::new().run(Method::IndependentTTest, &grouped, None),
            Err(InferenceError::InvalidArgument(_))
        ));

        let ungrouped = GroupedSample::new(&table, "y", None, None).unwrap();
        assert!(matches!(
            InferenceRunner::new().run(Method::MannWhitneyU, &ungrouped, None),
            Err(InferenceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_is_not_runnable() {
        assert!(matches!(
            InferenceRunner::new().run(Method::Unknown, &two_group_design(), None),
            Err(InferenceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_mixed_models_from_design_and_formula() {
        let table = hierarchical_table(5, &HierarchicalDesign::default()).unwrap();
        let grouped =
            GroupedSample::new(&table, "Value", Some("Condition"), Some("SubjectID")).unwrap();
        let runner = InferenceRunner::new();

        let lmm = runner.run(Method::Lmm, &grouped, None).unwrap();
        let fit = lmm.mixed_model.as_ref().unwrap();
        assert_eq!(fit.formula, "Value ~ C(Condition) + (1|SubjectID)");
        assert_eq!(fit.n_groups, 20);
        assert!(lmm.note.is_none() || !fit.converged);

        let glmm = runner
            .run(Method::GlmmOrLmm, &grouped, Some("Value ~ Condition"))
            .unwrap();
        assert!(glmm.note.unwrap().contains("GLMM"));
        assert_eq!(
            glmm.mixed_model.unwrap().formula,
            "Value ~ Condition + (1|SubjectID)"
        );
    }

    #[test]
    fn test_notes_accumulate() {
        let mut outcome =
            TestOutcome::new("Linear Mixed Model (REML)", Method::GlmmOrLmm, 2.0, 0.04, 0.05);
        outcome.add_note("variance ratio search hit its bound");
        outcome.add_note("consider a GLMM");
        assert_eq!(
            outcome.note.as_deref(),
            Some("variance ratio search hit its bound; consider a GLMM")
        );
    }

    #[test]
    fn test_mixed_model_needs_grouping() {
        assert!(matches!(
            InferenceRunner::new().run(Method::Lmm, &two_group_design(), None),
            Err(InferenceError::InvalidArgument(_))
        ));
    }
}
