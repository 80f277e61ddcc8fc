//! Analysis Pipeline
//!
//! Diagnose every sample, check variance homogeneity, select a method and
//! optionally run it, collecting everything into a [`Report`].

use rayon::prelude::*;
use std::time::Instant;
use testwise_infer::{DEFAULT_ALPHA, InferenceRunner};
use testwise_logic::{Method, SelectorContext, recommend};
use testwise_report::{
    DesignInfo, DiagnosisScope, FailureInfo, InferenceRecord, NormalityBasis, OutlierSummary,
    Report, ReportConfig, ReportMeta, ReportSummary, SampleDiagnosis,
};
use testwise_stats::{
    GroupedSample, OutlierMethod, Sample, check_distribution, check_homogeneity, compute_moments,
    detect_outliers,
};

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Outlier rule applied to every sample
    pub outlier_method: OutlierMethod,
    /// Which verdicts decide the normality flag
    pub normality_basis: NormalityBasis,
    /// Homogeneity flag substituted for an inconclusive verdict
    pub assume_homogeneous_when_inconclusive: Option<bool>,
    /// Run the selected method
    pub run_inference: bool,
    /// Significance level for inference
    pub alpha: f64,
    /// Mixed-model formula
    pub formula: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            outlier_method: OutlierMethod::default(),
            normality_basis: NormalityBasis::default(),
            assume_homogeneous_when_inconclusive: None,
            run_inference: true,
            alpha: DEFAULT_ALPHA,
            formula: None,
        }
    }
}

impl PipelineConfig {
    /// Configuration as recorded in report metadata
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            outlier_method: self.outlier_method,
            normality_basis: self.normality_basis,
            assume_homogeneous_when_inconclusive: self.assume_homogeneous_when_inconclusive,
            alpha: self.alpha,
            run_inference: self.run_inference,
            formula: self.formula.clone(),
        }
    }
}

/// Diagnose one sample: moments, outliers and the distribution verdict
pub fn diagnose_sample(
    label: &str,
    scope: DiagnosisScope,
    sample: &Sample,
    outlier_method: OutlierMethod,
) -> SampleDiagnosis {
    let moments = compute_moments(sample);
    let outliers = OutlierSummary::from(&detect_outliers(sample, outlier_method));
    let (distribution, failure) = match check_distribution(sample) {
        Ok(verdict) => (Some(verdict), None),
        Err(e) => {
            tracing::warn!(sample = label, "Distribution check failed: {}", e);
            (None, Some(FailureInfo::new("diagnosis", &e)))
        }
    };

    SampleDiagnosis {
        label: label.to_string(),
        scope,
        count: sample.len(),
        missing: sample.missing_count(),
        moments,
        outliers,
        distribution,
        failure,
    }
}

/// Normality flag for selection from the configured basis
///
/// True only when the basis holds at least one diagnosis and every one of
/// them succeeded and looks normal. The groups basis falls back to the pooled
/// diagnosis when there are no groups.
pub fn normality_flag(
    pooled: &SampleDiagnosis,
    groups: &[SampleDiagnosis],
    basis: NormalityBasis,
) -> bool {
    match basis {
        NormalityBasis::Groups if !groups.is_empty() => groups.iter().all(|d| d.is_normal()),
        _ => pooled.is_normal(),
    }
}

/// Run the full pipeline on a grouped sample
pub fn analyze(grouped: &GroupedSample, config: &PipelineConfig) -> Report {
    let start_time = Instant::now();

    let pooled = diagnose_sample(
        grouped.value_column(),
        DiagnosisScope::Pooled,
        grouped.pooled(),
        config.outlier_method,
    );
    let groups: Vec<SampleDiagnosis> = grouped
        .groups()
        .par_iter()
        .map(|(label, sample)| {
            diagnose_sample(label, DiagnosisScope::Group, sample, config.outlier_method)
        })
        .collect();

    let homogeneity = grouped.group_column().map(|_| check_homogeneity(grouped));
    let is_normal = normality_flag(&pooled, &groups, config.normality_basis);
    let is_homogeneous = homogeneity
        .as_ref()
        .map(|verdict| verdict.resolve(config.assume_homogeneous_when_inconclusive));

    let context = SelectorContext::from_grouped(grouped);
    let recommendation = recommend(is_normal, is_homogeneous, &context);
    tracing::info!(
        method = %recommendation.method,
        is_normal,
        ?is_homogeneous,
        "Recommendation ready"
    );

    let inference = run_inference(grouped, recommendation.method, config);

    let total_outliers = pooled.outliers.count;
    let mut diagnoses = Vec::with_capacity(groups.len() + 1);
    diagnoses.push(pooled);
    diagnoses.extend(groups);

    let summary = ReportSummary {
        samples_diagnosed: diagnoses.len(),
        diagnosis_failures: diagnoses.iter().filter(|d| d.failure.is_some()).count(),
        total_outliers,
        is_normal,
        is_homogeneous,
        method: recommendation.method,
        significant: inference.outcome.as_ref().map(|o| o.significant),
        total_duration_ms: start_time.elapsed().as_secs_f64() * 1000.0,
    };

    Report {
        meta: ReportMeta::new(config.report_config()),
        design: DesignInfo {
            value_column: grouped.value_column().to_string(),
            group_column: grouped.group_column().map(str::to_string),
            id_column: grouped.id_column().map(str::to_string),
            paired: grouped.is_paired(),
            hierarchical: grouped.is_hierarchical(),
            group_count: grouped.group_count(),
            subject_count: grouped.subject_count(),
            observations: grouped.pooled().len(),
            missing: grouped.pooled().missing_count(),
        },
        diagnoses,
        homogeneity,
        recommendation,
        inference,
        summary,
    }
}

fn run_inference(grouped: &GroupedSample, method: Method, config: &PipelineConfig) -> InferenceRecord {
    if !config.run_inference {
        return InferenceRecord::skipped(method, "inference disabled");
    }
    if method == Method::Unknown {
        return InferenceRecord::skipped(method, "no method recommended");
    }

    let result = InferenceRunner::with_alpha(config.alpha)
        .and_then(|runner| runner.run(method, grouped, config.formula.as_deref()));
    match result {
        Ok(outcome) => InferenceRecord::completed(outcome),
        Err(e) => {
            tracing::warn!(method = %method, "Inference failed: {}", e);
            InferenceRecord::failed(method, FailureInfo::new("inference", &e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testwise_report::InferenceStatus;
    use testwise_stats::Table;
    use testwise_stats::synthetic::{HierarchicalDesign, hierarchical_table, two_group_table};

    #[test]
    fn test_two_group_pipeline() {
        let table = two_group_table(7, 50, (300.0, 320.0), 30.0).unwrap();
        let grouped = GroupedSample::new(&table, "RT", Some("Group"), None).unwrap();
        let report = analyze(&grouped, &PipelineConfig::default());

        assert_eq!(report.diagnoses.len(), 3);
        assert_eq!(report.pooled().unwrap().count, 100);
        assert_eq!(report.groups().count(), 2);
        assert!(report.homogeneity.is_some());
        assert_eq!(report.design.group_count, Some(2));
        assert_eq!(report.inference.status, InferenceStatus::Completed);
        assert_eq!(report.inference.method, report.recommendation.method);
        assert!(matches!(
            report.recommendation.method,
            Method::IndependentTTest | Method::WelchTTest | Method::MannWhitneyU
        ));
    }

    #[test]
    fn test_hierarchical_pipeline_runs_mixed_model() {
        let table = hierarchical_table(3, &HierarchicalDesign::default()).unwrap();
        let grouped =
            GroupedSample::new(&table, "Value", Some("Condition"), Some("SubjectID")).unwrap();
        let report = analyze(&grouped, &PipelineConfig::default());

        assert!(report.recommendation.method.is_mixed_model());
        assert_eq!(report.design.subject_count, Some(20));
        let outcome = report.inference.outcome.as_ref().unwrap();
        assert!(outcome.mixed_model.is_some());
    }

    #[test]
    fn test_failed_diagnosis_makes_flag_false() {
        // Too few values for the distribution check in one group
        let table = Table::new()
            .with_numeric("y", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
            .unwrap()
            .with_text("g", ["a", "a", "a", "a", "a", "a", "b", "b"])
            .unwrap();
        let grouped = GroupedSample::new(&table, "y", Some("g"), None).unwrap();
        let report = analyze(&grouped, &PipelineConfig::default());

        assert_eq!(report.summary.diagnosis_failures, 1);
        assert!(!report.summary.is_normal);
        assert_eq!(report.recommendation.method, Method::MannWhitneyU);
    }

    #[test]
    fn test_unknown_method_skips_inference() {
        let table = Table::new()
            .with_numeric("y", (0..30).map(|i| i as f64).collect())
            .unwrap()
            .with_text("g", (0..30).map(|i| ["a", "b", "c"][i % 3]))
            .unwrap();
        let grouped = GroupedSample::new(&table, "y", Some("g"), None).unwrap();
        let report = analyze(&grouped, &PipelineConfig::default());

        assert_eq!(report.recommendation.method, Method::Unknown);
        assert_eq!(report.inference.status, InferenceStatus::Skipped);
        assert!(report.summary.significant.is_none());
    }

    #[test]
    fn test_inference_can_be_disabled() {
        let table = two_group_table(1, 20, (0.0, 1.0), 1.0).unwrap();
        let grouped = GroupedSample::new(&table, "RT", Some("Group"), None).unwrap();
        let config = PipelineConfig {
            run_inference: false,
            ..PipelineConfig::default()
        };
        let report = analyze(&grouped, &config);
        assert_eq!(report.inference.status, InferenceStatus::Skipped);
        assert!(!report.meta.config.run_inference);
    }
}
