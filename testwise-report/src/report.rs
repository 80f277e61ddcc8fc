//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use testwise_infer::TestOutcome;
use testwise_logic::{Method, MethodRecommendation};
use testwise_stats::{
    DistributionVerdict, HomogeneityVerdict, MomentSummary, OutlierAnalysis, OutlierMethod,
};

/// Current report schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Complete analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub design: DesignInfo,
    pub diagnoses: Vec<SampleDiagnosis>,
    pub homogeneity: Option<HomogeneityVerdict>,
    pub recommendation: MethodRecommendation,
    pub inference: InferenceRecord,
    pub summary: ReportSummary,
}

impl Report {
    /// Diagnosis of the pooled sample
    pub fn pooled(&self) -> Option<&SampleDiagnosis> {
        self.diagnoses
            .iter()
            .find(|d| d.scope == DiagnosisScope::Pooled)
    }

    /// Per-group diagnoses, in group order
    pub fn groups(&self) -> impl Iterator<Item = &SampleDiagnosis> {
        self.diagnoses
            .iter()
            .filter(|d| d.scope == DiagnosisScope::Group)
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Input file, when the data came from one
    pub source: Option<String>,
    pub config: ReportConfig,
}

impl ReportMeta {
    /// Metadata stamped with the current time
    pub fn new(config: ReportConfig) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            source: None,
            config,
        }
    }

    /// Attach the input file name
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Which verdicts decide the normality flag used for selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalityBasis {
    /// Every group must look normal (pooled when there are no groups)
    #[default]
    Groups,
    /// The pooled sample decides
    Pooled,
}

impl FromStr for NormalityBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groups" | "group" => Ok(NormalityBasis::Groups),
            "pooled" | "all" => Ok(NormalityBasis::Pooled),
            other => Err(format!("Unknown normality basis: {}", other)),
        }
    }
}

impl fmt::Display for NormalityBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalityBasis::Groups => write!(f, "groups"),
            NormalityBasis::Pooled => write!(f, "pooled"),
        }
    }
}

/// Analysis configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub outlier_method: OutlierMethod,
    pub normality_basis: NormalityBasis,
    pub assume_homogeneous_when_inconclusive: Option<bool>,
    pub alpha: f64,
    pub run_inference: bool,
    pub formula: Option<String>,
}

/// Columns and shape of the analyzed design
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignInfo {
    pub value_column: String,
    pub group_column: Option<String>,
    pub id_column: Option<String>,
    pub paired: bool,
    pub hierarchical: bool,
    pub group_count: Option<usize>,
    pub subject_count: Option<usize>,
    pub observations: usize,
    pub missing: usize,
}

/// Whether a diagnosis covers all values or one group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisScope {
    Pooled,
    Group,
}

/// Diagnostic features of one sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleDiagnosis {
    pub label: String,
    pub scope: DiagnosisScope,
    pub count: usize,
    pub missing: usize,
    pub moments: MomentSummary,
    pub outliers: OutlierSummary,
    pub distribution: Option<DistributionVerdict>,
    pub failure: Option<FailureInfo>,
}

impl SampleDiagnosis {
    /// Whether the distribution check succeeded and found the sample normal
    pub fn is_normal(&self) -> bool {
        self.distribution.as_ref().is_some_and(|d| d.is_normal)
    }
}

/// Outlier detection result without the cleaned values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub method: OutlierMethod,
    pub count: usize,
    pub percentage: f64,
    pub low_count: usize,
    pub high_count: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub values: Vec<f64>,
}

impl From<&OutlierAnalysis> for OutlierSummary {
    fn from(analysis: &OutlierAnalysis) -> Self {
        Self {
            method: analysis.method,
            count: analysis.outlier_count(),
            percentage: analysis.outlier_percentage(),
            low_count: analysis.low_outlier_count,
            high_count: analysis.high_outlier_count,
            lower_bound: analysis.lower_bound,
            upper_bound: analysis.upper_bound,
            values: analysis.outliers.clone(),
        }
    }
}

/// Inference step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceStatus {
    Completed,
    Failed,
    Skipped,
}

/// Outcome of the inference step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub status: InferenceStatus,
    pub method: Method,
    pub outcome: Option<TestOutcome>,
    pub failure: Option<FailureInfo>,
}

impl InferenceRecord {
    /// Successful run
    pub fn completed(outcome: TestOutcome) -> Self {
        Self {
            status: InferenceStatus::Completed,
            method: outcome.method,
            outcome: Some(outcome),
            failure: None,
        }
    }

    /// Run that raised an error
    pub fn failed(method: Method, failure: FailureInfo) -> Self {
        Self {
            status: InferenceStatus::Failed,
            method,
            outcome: None,
            failure: Some(failure),
        }
    }

    /// Inference not requested or nothing to run
    pub fn skipped(method: Method, reason: impl Into<String>) -> Self {
        Self {
            status: InferenceStatus::Skipped,
            method,
            outcome: None,
            failure: Some(FailureInfo {
                kind: "skipped".to_string(),
                message: reason.into(),
            }),
        }
    }
}

/// Failure information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: String,
    pub message: String,
}

impl FailureInfo {
    /// Failure of `kind` described by an error's display text
    pub fn new(kind: impl Into<String>, error: &impl fmt::Display) -> Self {
        Self {
            kind: kind.into(),
            message: error.to_string(),
        }
    }
}

/// Report summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub samples_diagnosed: usize,
    pub diagnosis_failures: usize,
    /// Outliers in the pooled sample
    pub total_outliers: usize,
    /// Normality flag passed to the selector
    pub is_normal: bool,
    /// Homogeneity flag passed to the selector, when groups were compared
    pub is_homogeneous: Option<bool>,
    pub method: Method,
    pub significant: Option<bool>,
    pub total_duration_ms: f64,
}
