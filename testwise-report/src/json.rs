//! JSON Output

use crate::report::Report;

/// Generate a prettified JSON report.
///
/// Non-finite numbers (undefined moments, an inconclusive homogeneity
/// p-value) serialize as `null`.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{
        DesignInfo, FailureInfo, InferenceRecord, InferenceStatus, NormalityBasis, ReportConfig,
        ReportMeta, ReportSummary, SCHEMA_VERSION,
    };
    use testwise_logic::{Method, SelectorContext, recommend};
    use testwise_stats::{HomogeneityVerdict, OutlierMethod};

    fn minimal_report() -> Report {
        let recommendation = recommend(true, Some(true), &SelectorContext::independent(2));
        let method = recommendation.method;
        Report {
            meta: ReportMeta::new(ReportConfig {
                outlier_method: OutlierMethod::default(),
                normality_basis: NormalityBasis::Groups,
                assume_homogeneous_when_inconclusive: None,
                alpha: 0.05,
                run_inference: false,
                formula: None,
            })
            .with_source("data.csv"),
            design: DesignInfo {
                value_column: "RT".to_string(),
                group_column: Some("Group".to_string()),
                id_column: None,
                paired: false,
                hierarchical: false,
                group_count: Some(2),
                subject_count: None,
                observations: 100,
                missing: 0,
            },
            diagnoses: Vec::new(),
            homogeneity: Some(HomogeneityVerdict::inconclusive()),
            recommendation,
            inference: InferenceRecord::skipped(method, "inference disabled"),
            summary: ReportSummary {
                samples_diagnosed: 0,
                diagnosis_failures: 0,
                total_outliers: 0,
                is_normal: true,
                is_homogeneous: Some(true),
                method,
                significant: None,
                total_duration_ms: 1.5,
            },
        }
    }

    #[test]
    fn test_json_uses_catalog_names() {
        let json = generate_json_report(&minimal_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["recommendation"]["method"], "Independent T-test");
        assert_eq!(value["inference"]["status"], "skipped");
        assert_eq!(value["meta"]["config"]["normality_basis"], "groups");
        assert_eq!(value["meta"]["source"], "data.csv");
        assert_eq!(value["meta"]["schema_version"], SCHEMA_VERSION);
    }

    #[test]
    fn test_inconclusive_homogeneity_serializes_as_null() {
        let json = generate_json_report(&minimal_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["homogeneity"]["p_value"].is_null());
        assert_eq!(value["homogeneity"]["is_homogeneous"], false);
    }

    #[test]
    fn test_failed_inference_record() {
        let record = InferenceRecord::failed(
            Method::Lmm,
            FailureInfo::new("inference", &"Model fit failed: singular"),
        );
        assert_eq!(record.status, InferenceStatus::Failed);
        assert!(record.outcome.is_none());
        assert_eq!(record.failure.unwrap().message, "Model fit failed: singular");
    }

    #[test]
    fn test_normality_basis_parsing() {
        assert_eq!("Pooled".parse::<NormalityBasis>(), Ok(NormalityBasis::Pooled));
        assert_eq!("groups".parse::<NormalityBasis>(), Ok(NormalityBasis::Groups));
        assert!("median".parse::<NormalityBasis>().is_err());
    }
}
