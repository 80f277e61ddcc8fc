//! Configuration loading from testwise.toml
//!
//! Testwise configuration can be specified in a `testwise.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use serde::{Deserialize, Serialize};
use std::path::Path;
use testwise_report::{NormalityBasis, OutputFormat};
use testwise_stats::OutlierMethod;

/// Configuration file name
pub const CONFIG_FILE: &str = "testwise.toml";

/// Testwise configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestwiseConfig {
    /// Diagnosis configuration
    #[serde(default)]
    pub diagnosis: DiagnosisConfig,
    /// Default design columns
    #[serde(default)]
    pub design: DesignConfig,
    /// Inference configuration
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Diagnosis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisConfig {
    /// Outlier rule: "iqr" or "zscore"
    #[serde(default = "default_outlier_method")]
    pub outlier_method: String,
    /// IQR multiplier or z threshold (method default when unset)
    #[serde(default)]
    pub outlier_threshold: Option<f64>,
    /// Which verdicts decide normality: "groups" or "pooled"
    #[serde(default)]
    pub normality_basis: NormalityBasis,
    /// Homogeneity flag to use when Brown-Forsythe cannot be computed
    #[serde(default)]
    pub assume_homogeneous_when_inconclusive: bool,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            outlier_method: default_outlier_method(),
            outlier_threshold: None,
            normality_basis: NormalityBasis::default(),
            assume_homogeneous_when_inconclusive: false,
        }
    }
}

impl DiagnosisConfig {
    /// Resolve the outlier rule, letting `name` and `threshold` override the file
    pub fn outlier_method(
        &self,
        name: Option<&str>,
        threshold: Option<f64>,
    ) -> anyhow::Result<OutlierMethod> {
        Ok(OutlierMethod::from_name(
            name.unwrap_or(&self.outlier_method),
            threshold.or(self.outlier_threshold),
        )?)
    }
}

fn default_outlier_method() -> String {
    "iqr".to_string()
}

/// Default design columns (CLI flags override)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignConfig {
    /// Numeric response column
    #[serde(default)]
    pub value_column: Option<String>,
    /// Group or condition column
    #[serde(default)]
    pub group_column: Option<String>,
    /// Subject identifier column (marks the design hierarchical)
    #[serde(default)]
    pub id_column: Option<String>,
    /// Row order within groups defines pairs
    #[serde(default)]
    pub paired: bool,
    /// Mixed-model formula, e.g. "Value ~ C(Condition) + (1|SubjectID)"
    #[serde(default)]
    pub formula: Option<String>,
}

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Run the recommended test after diagnosis
    #[serde(default = "default_run")]
    pub run: bool,
    /// Significance level
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            run: default_run(),
            alpha: default_alpha(),
        }
    }
}

fn default_run() -> bool {
    true
}
fn default_alpha() -> f64 {
    0.05
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default)]
    pub format: OutputFormat,
    /// Directory for reports written with a relative `--output`
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            directory: None,
        }
    }
}

impl TestwiseConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        Self::discover_from(&dir)
    }

    /// Walk up from `start` looking for [`CONFIG_FILE`]
    pub fn discover_from(start: &Path) -> Option<Self> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(
                            path = %config_path.display(),
                            "Ignoring unreadable configuration: {}",
                            e
                        );
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Testwise Configuration

[diagnosis]
# Outlier rule: "iqr" (Tukey fences) or "zscore"
outlier_method = "iqr"
# IQR multiplier (default 1.5) or z threshold (default 3.0) (uncomment to override)
# outlier_threshold = 1.5
# Normality basis for method selection: "groups" (every group normal) or "pooled"
normality_basis = "groups"
# Treat variances as equal when Brown-Forsythe cannot be computed
assume_homogeneous_when_inconclusive = false

[design]
# Default columns (CLI flags override; uncomment to enable)
# value_column = "RT"
# group_column = "Group"
# id_column = "SubjectID"
# Row order within the two groups defines pairs
paired = false
# Mixed-model formula (uncomment to enable)
# formula = "Value ~ C(Condition) + (1|SubjectID)"

[inference]
# Run the recommended test after diagnosis
run = true
# Significance level
alpha = 0.05

[output]
# Default output format: human or json
format = "human"
# Directory for reports written with a relative --output (uncomment to enable)
# directory = "target/testwise"
"#
        .to_string()
    }
}
