#![warn(missing_docs)]
//! # Testwise
//!
//! Diagnose data before choosing a statistical test.
//!
//! Testwise inspects a sample and the structure of a design, then recommends a
//! test from a closed catalog and optionally runs it:
//! - **Diagnostic Features**: moments with shape labels, IQR / z-score outliers,
//!   KDE modality, Lilliefors normality (Jarque-Bera and Shapiro-Wilk reported)
//! - **Homogeneity**: Brown-Forsythe (median-centered Levene) across groups
//! - **Method Selection**: a pure decision tree over normality, homogeneity,
//!   pairing and subject hierarchy
//! - **Inference**: t-tests, rank tests with exact small-sample distributions,
//!   and random-intercept mixed models fitted by REML
//! - **Reports**: JSON or human-readable output from the `testwise` CLI
//!
//! ## Quick Start
//!
//! ```
//! use testwise::prelude::*;
//!
//! let table = testwise::synthetic::two_group_table(42, 50, (300.0, 320.0), 30.0)?;
//! let grouped = GroupedSample::new(&table, "RT", Some("Group"), None)?;
//! let report = analyze(&grouped, &PipelineConfig::default());
//! println!("{}: {}", report.recommendation.method, report.recommendation.advice);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Selector Only
//!
//! ```
//! use testwise::{Method, SelectorContext, recommend};
//!
//! let context = SelectorContext::default().with_hierarchical(true);
//! assert_eq!(recommend(false, None, &context).method, Method::GlmmOrLmm);
//! ```

// Re-export diagnostics
pub use testwise_stats::{
    DiagnosisError, DistributionVerdict, GroupedSample, HomogeneityVerdict, Modality,
    ModalityEstimate, MomentSummary, NormalityTests, OutlierAnalysis, OutlierMethod, Sample,
    SkewShape, Table, TailShape, TestStatistic, check_distribution, check_homogeneity,
    compute_moments, detect_modality, detect_outliers, synthetic,
};

// Re-export selection
pub use testwise_logic::{Method, MethodRecommendation, SelectorContext, recommend};

// Re-export inference
pub use testwise_infer::{Formula, InferenceError, InferenceRunner, MixedModelFit, TestOutcome};

// Re-export reporting
pub use testwise_report::{
    InferenceRecord, InferenceStatus, NormalityBasis, OutputFormat, Report, generate_json_report,
};

// Re-export pipeline
pub use testwise_cli::{PipelineConfig, TestwiseConfig, analyze, format_human_output, load_csv};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        GroupedSample, InferenceRunner, Method, PipelineConfig, Sample, SelectorContext, Table,
        analyze, check_distribution, check_homogeneity, compute_moments, detect_outliers,
        recommend,
    };
}

/// Run the Testwise CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     testwise::run()
/// }
/// ```
pub use testwise_cli::run;
