#![warn(missing_docs)]
//! Testwise Report - Analysis Reports
//!
//! Collects diagnoses, the method recommendation and the inference outcome
//! into one serializable [`Report`]:
//! - JSON (machine-readable)
//! - Human-readable text (rendered by the CLI)

mod json;
mod report;

pub use json::generate_json_report;
pub use report::{
    DesignInfo, DiagnosisScope, FailureInfo, InferenceRecord, InferenceStatus, NormalityBasis,
    OutlierSummary, Report, ReportConfig, ReportMeta, ReportSummary, SCHEMA_VERSION,
    SampleDiagnosis,
};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// Human-readable terminal output
    #[default]
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
