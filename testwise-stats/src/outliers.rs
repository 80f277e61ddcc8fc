//! Outlier Detection
//!
//! Two interchangeable policies behind one entry point:
//! - IQR fences: outside `[Q1 - k*IQR, Q3 + k*IQR]` (default k = 1.5)
//! - Z-score: `|x - mean| / sigma > threshold` with the population sigma
//!   (default threshold = 3)
//!
//! Outliers are reported, never removed from the sample itself; callers that
//! want the trimmed view take [`OutlierAnalysis::cleaned_samples`].

use crate::error::{DiagnosisError, Result};
use crate::percentiles::quartiles;
use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default IQR fence multiplier
pub const DEFAULT_IQR_K: f64 = 1.5;

/// Default z-score cutoff
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Method for outlier detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum OutlierMethod {
    /// IQR method: outliers are outside [Q1 - k*IQR, Q3 + k*IQR]
    Iqr {
        /// Fence multiplier
        k: f64,
    },
    /// Z-score method: outliers are beyond `threshold` standard deviations
    ZScore {
        /// Number of standard deviations
        threshold: f64,
    },
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::Iqr { k: DEFAULT_IQR_K }
    }
}

impl OutlierMethod {
    /// Resolve a policy by name (`"iqr"` or `"zscore"`, case-insensitive).
    ///
    /// `threshold` overrides the policy's default multiplier. Unknown names and
    /// non-positive thresholds fail with [`DiagnosisError::InvalidArgument`].
    pub fn from_name(name: &str, threshold: Option<f64>) -> Result<Self> {
        if let Some(t) = threshold {
            if t.is_nan() || t <= 0.0 {
                return Err(DiagnosisError::InvalidArgument(format!(
                    "outlier threshold must be positive, got {}",
                    t
                )));
            }
        }

        match name.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr {
                k: threshold.unwrap_or(DEFAULT_IQR_K),
            }),
            "zscore" | "z-score" | "z" => Ok(OutlierMethod::ZScore {
                threshold: threshold.unwrap_or(DEFAULT_Z_THRESHOLD),
            }),
            other => Err(DiagnosisError::InvalidArgument(format!(
                "unknown outlier method '{}' (expected 'iqr' or 'zscore')",
                other
            ))),
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr { k } => write!(f, "iqr (k={})", k),
            OutlierMethod::ZScore { threshold } => write!(f, "zscore (|z|>{})", threshold),
        }
    }
}

/// Result of outlier analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierAnalysis {
    /// Outlying values, in sample order
    pub outliers: Vec<f64>,
    /// Positions of the outliers within the clean sample
    pub outlier_indices: Vec<usize>,
    /// Samples with outliers removed
    pub cleaned_samples: Vec<f64>,
    /// Number of low outliers (below lower bound)
    pub low_outlier_count: usize,
    /// Number of high outliers (above upper bound)
    pub high_outlier_count: usize,
    /// Lower bound used for detection
    pub lower_bound: f64,
    /// Upper bound used for detection
    pub upper_bound: f64,
    /// Detection method used
    pub method: OutlierMethod,
}

impl OutlierAnalysis {
    /// Number of outliers
    pub fn outlier_count(&self) -> usize {
        self.outliers.len()
    }

    /// Percentage of samples that are outliers
    pub fn outlier_percentage(&self) -> f64 {
        let total = self.outliers.len() + self.cleaned_samples.len();
        if total == 0 {
            return 0.0;
        }
        (self.outliers.len() as f64 / total as f64) * 100.0
    }

    fn empty(method: OutlierMethod, lower_bound: f64, upper_bound: f64, all: &[f64]) -> Self {
        Self {
            outliers: Vec::new(),
            outlier_indices: Vec::new(),
            cleaned_samples: all.to_vec(),
            low_outlier_count: 0,
            high_outlier_count: 0,
            lower_bound,
            upper_bound,
            method,
        }
    }
}

/// Detect outliers in a sample's clean values using the given policy
///
/// # Examples
///
/// ```
/// # use testwise_stats::{detect_outliers, OutlierMethod, Sample};
/// let sample = Sample::new("latency", vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
/// let analysis = detect_outliers(&sample, OutlierMethod::default());
/// assert_eq!(analysis.outliers, vec![100.0]);
/// ```
pub fn detect_outliers(sample: &Sample, method: OutlierMethod) -> OutlierAnalysis {
    let values = sample.values();
    if values.is_empty() {
        return OutlierAnalysis::empty(method, f64::NAN, f64::NAN, values);
    }

    match method {
        OutlierMethod::Iqr { k } => detect_iqr_outliers(values, k),
        OutlierMethod::ZScore { threshold } => detect_zscore_outliers(values, threshold),
    }
}

/// IQR-based outlier detection
fn detect_iqr_outliers(values: &[f64], k: f64) -> OutlierAnalysis {
    let (q1, q3) = quartiles(values);
    let iqr = q3 - q1;

    let lower_bound = q1 - k * iqr;
    let upper_bound = q3 + k * iqr;

    partition(values, OutlierMethod::Iqr { k }, lower_bound, upper_bound)
}

/// Z-score based outlier detection
fn detect_zscore_outliers(values: &[f64], threshold: f64) -> OutlierAnalysis {
    let method = OutlierMethod::ZScore { threshold };
    let n = values.len() as f64;
    let mean: f64 = values.iter().sum::<f64>() / n;
    let variance: f64 = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        // No variance, no outliers
        return OutlierAnalysis::empty(method, mean, mean, values);
    }

    let lower_bound = mean - threshold * std_dev;
    let upper_bound = mean + threshold * std_dev;

    partition(values, method, lower_bound, upper_bound)
}

/// Split values by the open interval `(lower, upper)` complement
fn partition(values: &[f64], method: OutlierMethod, lower: f64, upper: f64) -> OutlierAnalysis {
    let mut analysis = OutlierAnalysis::empty(method, lower, upper, &[]);
    analysis.cleaned_samples.reserve(values.len());

    for (i, &value) in values.iter().enumerate() {
        if value < lower {
            analysis.low_outlier_count += 1;
        } else if value > upper {
            analysis.high_outlier_count += 1;
        } else {
            analysis.cleaned_samples.push(value);
            continue;
        }
        analysis.outliers.push(value);
        analysis.outlier_indices.push(i);
    }

    analysis
}
