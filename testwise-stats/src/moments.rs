//! Descriptive Moments
//!
//! Mean and standard deviation use the ordinary sample estimators (n - 1
//! denominator). Skewness and kurtosis use the Fisher-Pearson estimators
//! without bias correction:
//!
//! ```text
//! g1 = m3 / m2^1.5        b2 = m4 / m2^2        (m_k = mean of (x - x̄)^k)
//! ```
//!
//! Kurtosis is reported in the "normal = 3" convention alongside its excess.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical description of skewness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkewShape {
    /// skew > 1
    #[serde(rename = "Highly Positively Skewed")]
    HighlyPositive,
    /// 0.5 < skew <= 1
    #[serde(rename = "Moderately Positively Skewed")]
    ModeratelyPositive,
    /// skew < -1
    #[serde(rename = "Highly Negatively Skewed")]
    HighlyNegative,
    /// -1 <= skew < -0.5
    #[serde(rename = "Moderately Negatively Skewed")]
    ModeratelyNegative,
    /// everything else, including undefined skewness
    #[serde(rename = "Symmetric")]
    Symmetric,
}

impl SkewShape {
    /// Classify a skewness value; first matching rule wins
    pub fn classify(skewness: f64) -> Self {
        if skewness > 1.0 {
            SkewShape::HighlyPositive
        } else if skewness > 0.5 {
            SkewShape::ModeratelyPositive
        } else if skewness < -1.0 {
            SkewShape::HighlyNegative
        } else if skewness < -0.5 {
            SkewShape::ModeratelyNegative
        } else {
            SkewShape::Symmetric
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            SkewShape::HighlyPositive => "Highly Positively Skewed",
            SkewShape::ModeratelyPositive => "Moderately Positively Skewed",
            SkewShape::HighlyNegative => "Highly Negatively Skewed",
            SkewShape::ModeratelyNegative => "Moderately Negatively Skewed",
            SkewShape::Symmetric => "Symmetric",
        }
    }
}

impl fmt::Display for SkewShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categorical description of tail weight, from excess kurtosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TailShape {
    /// excess kurtosis > 1
    #[serde(rename = "Leptokurtic (Heavy tails/Peaked)")]
    Leptokurtic,
    /// excess kurtosis < -1
    #[serde(rename = "Platykurtic (Light tails/Flat)")]
    Platykurtic,
    /// everything else, including undefined kurtosis
    #[serde(rename = "Mesokurtic (Normal-like)")]
    Mesokurtic,
}

impl TailShape {
    /// Classify an excess kurtosis value
    pub fn classify(excess_kurtosis: f64) -> Self {
        if excess_kurtosis > 1.0 {
            TailShape::Leptokurtic
        } else if excess_kurtosis < -1.0 {
            TailShape::Platykurtic
        } else {
            TailShape::Mesokurtic
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            TailShape::Leptokurtic => "Leptokurtic (Heavy tails/Peaked)",
            TailShape::Platykurtic => "Platykurtic (Light tails/Flat)",
            TailShape::Mesokurtic => "Mesokurtic (Normal-like)",
        }
    }
}

impl fmt::Display for TailShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// First four moments of a sample plus their categorical reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentSummary {
    /// Number of clean values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Fisher-Pearson skewness g1
    pub skewness: f64,
    /// Pearson kurtosis b2 (normal = 3)
    pub kurtosis: f64,
    /// `kurtosis - 3`
    pub excess_kurtosis: f64,
    /// Skewness descriptor
    pub skew_shape: SkewShape,
    /// Kurtosis descriptor
    pub tail_shape: TailShape,
}

/// Whether every value equals the first (max == min)
///
/// Summing a constant that has no exact binary form leaves a rounding residue
/// in the mean, so constant samples are detected before any arithmetic.
pub(crate) fn is_constant(values: &[f64]) -> bool {
    values.split_first().is_some_and(|(first, rest)| rest.iter().all(|x| x == first))
}

/// Central moments `(mean, m2, m3, m4)` with 1/n denominators
pub(crate) fn central_moments(values: &[f64]) -> (f64, f64, f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN, f64::NAN, f64::NAN);
    }
    if is_constant(values) {
        return (values[0], 0.0, 0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in values {
        let d = x - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (mean, m2 / n, m3 / n, m4 / n)
}

/// Skewness and Pearson kurtosis from central moments.
///
/// Zero variance leaves both undefined (NaN) instead of dividing by zero.
pub(crate) fn shape_coefficients(m2: f64, m3: f64, m4: f64) -> (f64, f64) {
    if m2.is_nan() || m2 <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    (m3 / m2.powf(1.5), m4 / (m2 * m2))
}

/// Sample standard deviation with n - 1 denominator (NaN below two values)
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    if is_constant(values) {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    (ss / (n - 1.0)).sqrt()
}

/// Compute the moment summary of a sample's clean values
///
/// Never panics: empty or constant samples produce NaN where a moment is
/// undefined, and the descriptors fall back to `Symmetric` / `Mesokurtic`.
pub fn compute_moments(sample: &Sample) -> MomentSummary {
    let values = sample.values();
    let (mean, m2, m3, m4) = central_moments(values);
    let (skewness, kurtosis) = shape_coefficients(m2, m3, m4);
    let excess_kurtosis = kurtosis - 3.0;

    MomentSummary {
        count: values.len(),
        mean,
        std_dev: sample_std_dev(values),
        skewness,
        kurtosis,
        excess_kurtosis,
        skew_shape: SkewShape::classify(skewness),
        tail_shape: TailShape::classify(excess_kurtosis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(values: &[f64]) -> Sample {
        Sample::new("t", values.iter().copied()).unwrap()
    }

    #[test]
    fn test_basic_moments() {
        let summary = compute_moments(&sample(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]));
        assert!((summary.mean - 5.0).abs() < 1e-12);
        // population variance 4, sample variance 32/7
        assert!((summary.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.count, 8);
    }

    #[test]
    fn test_symmetric_sample_has_zero_skew() {
        let summary = compute_moments(&sample(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert!(summary.skewness.abs() < 1e-12);
        assert_eq!(summary.skew_shape, SkewShape::Symmetric);
        // uniform-like spacing: b2 = 1.7
        assert!((summary.kurtosis - 1.7).abs() < 1e-12);
        assert!((summary.excess_kurtosis + 1.3).abs() < 1e-12);
        assert_eq!(summary.tail_shape, TailShape::Platykurtic);
    }

    #[test]
    fn test_right_tail_is_positive_skew() {
        let summary = compute_moments(&sample(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 10.0]));
        assert!(summary.skewness > 1.0);
        assert_eq!(summary.skew_shape, SkewShape::HighlyPositive);
        assert_eq!(summary.tail_shape, TailShape::Leptokurtic);
    }

    #[test]
    fn test_constant_sample_does_not_panic() {
        let summary = compute_moments(&sample(&[3.0; 10]));
        assert_eq!(summary.std_dev, 0.0);
        assert!(summary.skewness.is_nan());
        assert!(summary.kurtosis.is_nan());
        assert_eq!(summary.skew_shape, SkewShape::Symmetric);
        assert_eq!(summary.tail_shape, TailShape::Mesokurtic);
    }

    #[test]
    fn test_inexact_constant_has_zero_variance() {
        let summary = compute_moments(&sample(&[0.1; 30]));
        assert_eq!(summary.mean, 0.1);
        assert_eq!(summary.std_dev, 0.0);
        assert!(summary.skewness.is_nan());
        assert!(summary.kurtosis.is_nan());
        assert_eq!(summary.skew_shape, SkewShape::Symmetric);
        assert_eq!(summary.tail_shape, TailShape::Mesokurtic);
    }

    #[test]
    fn test_is_constant() {
        assert!(is_constant(&[0.1; 3]));
        assert!(is_constant(&[2.5]));
        assert!(!is_constant(&[]));
        assert!(!is_constant(&[0.1, 0.1, 0.1 + 1e-12]));
    }

    #[test]
    fn test_empty_sample() {
        let summary = compute_moments(&sample(&[]));
        assert_eq!(summary.count, 0);
        assert!(summary.mean.is_nan());
    }

    #[test]
    fn test_descriptor_priority() {
        assert_eq!(SkewShape::classify(1.5), SkewShape::HighlyPositive);
        assert_eq!(SkewShape::classify(0.7), SkewShape::ModeratelyPositive);
        assert_eq!(SkewShape::classify(0.5), SkewShape::Symmetric);
        assert_eq!(SkewShape::classify(-0.7), SkewShape::ModeratelyNegative);
        assert_eq!(SkewShape::classify(-1.5), SkewShape::HighlyNegative);
        assert_eq!(TailShape::classify(1.0), TailShape::Mesokurtic);
        assert_eq!(TailShape::classify(-1.01), TailShape::Platykurtic);
        assert_eq!(TailShape::Mesokurtic.to_string(), "Mesokurtic (Normal-like)");
    }
}
