#![warn(missing_docs)]
//! Testwise Infer - Test Execution
//!
//! Runs the method chosen by the selector:
//! - Pooled, Welch and paired t-tests
//! - Mann-Whitney U and Wilcoxon signed-rank tests (exact for small samples)
//! - Random-intercept linear mixed models fitted by REML

mod error;
mod formula;
mod mixed;
mod rank;
mod runner;
mod ttest;

pub use error::{InferenceError, Result};
pub use formula::{Design, Formula, Term, build_design};
pub use mixed::{FixedEffect, MixedModelFit, fit_random_intercept};
pub use rank::{
    MANN_WHITNEY_EXACT_MAX, RankTestResult, WILCOXON_EXACT_MAX, average_ranks, mann_whitney_u,
    wilcoxon_signed_rank,
};
pub use runner::{DEFAULT_ALPHA, InferenceRunner, TestOutcome};
pub use ttest::{TTestResult, aligned_pairs, paired_t_test, pooled_t_test, welch_t_test};
