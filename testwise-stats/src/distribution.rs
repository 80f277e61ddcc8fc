//! Distribution Verdict
//!
//! Combines the normality tests, the modality scan and the skewness of a
//! sample into one verdict with advice text. Only the Lilliefors p-value
//! decides normality; the other tests are carried for reporting.

use crate::density::{Modality, detect_modality};
use crate::error::{DiagnosisError, Result};
use crate::moments::{central_moments, is_constant, shape_coefficients};
use crate::normality::{NORMALITY_ALPHA, NormalityTests, normality_tests};
use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Minimum clean values for a distribution verdict
pub const MIN_DISTRIBUTION_SAMPLES: usize = 5;

/// Advice when the sample passes the normality check
pub const NORMAL_ADVICE: &str = "Data appears Normal. Proceed with Parametric Tests.";

/// Normality and shape verdict for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionVerdict {
    /// Individual test results
    pub tests: NormalityTests,
    /// `lilliefors.p_value > 0.05`
    pub is_normal: bool,
    /// KDE modality
    pub modality: Modality,
    /// KDE peak count
    pub peak_count: usize,
    /// Human-readable guidance
    pub advice: String,
}

/// Check whether a sample looks normal and describe how it departs if not
///
/// Fails with [`DiagnosisError::NotEnoughSamples`] below five clean values and
/// [`DiagnosisError::DegenerateInput`] for zero variance.
pub fn check_distribution(sample: &Sample) -> Result<DistributionVerdict> {
    let values = sample.values();
    if values.len() < MIN_DISTRIBUTION_SAMPLES {
        return Err(DiagnosisError::NotEnoughSamples {
            got: values.len(),
            min: MIN_DISTRIBUTION_SAMPLES,
        });
    }

    if is_constant(values) {
        return Err(DiagnosisError::DegenerateInput(format!(
            "sample '{}' has zero variance",
            sample.name()
        )));
    }
    let (_, m2, m3, m4) = central_moments(values);
    let (skewness, _) = shape_coefficients(m2, m3, m4);

    let tests = normality_tests(values)?;
    let is_normal = tests.lilliefors.p_value > NORMALITY_ALPHA;
    let estimate = detect_modality(sample);

    let advice = if is_normal {
        NORMAL_ADVICE.to_string()
    } else {
        let all_positive = sample.min().is_some_and(|min| min > 0.0);
        non_normal_advice(estimate.modality, estimate.peak_count, skewness, all_positive)
    };

    tracing::debug!(
        sample = sample.name(),
        is_normal,
        lilliefors_p = tests.lilliefors.p_value,
        modality = %estimate.modality,
        "Checked distribution"
    );

    Ok(DistributionVerdict {
        tests,
        is_normal,
        modality: estimate.modality,
        peak_count: estimate.peak_count,
        advice,
    })
}

/// Assemble advice for a non-normal sample, clauses in fixed order
fn non_normal_advice(
    modality: Modality,
    peak_count: usize,
    skewness: f64,
    all_positive: bool,
) -> String {
    let mut advice = String::from("Data is NOT Normal. ");

    if modality != Modality::Unimodal {
        advice.push_str(&format!(
            "Data appears {} ({} peaks). Consider mixture models or splitting data. ",
            modality, peak_count
        ));
    }

    let skew_clause = if skewness > 1.0 && all_positive {
        "Positive Skew: Consider Log or Box-Cox Transform."
    } else if skewness > 1.0 {
        "Positive Skew: Consider Square Root (if >=0) or Non-parametric tests."
    } else if skewness < -1.0 {
        "Negative Skew: Consider Reflect & Log or Non-parametric tests."
    } else {
        "Consider Non-parametric tests."
    };
    advice.push_str(skew_clause);
    advice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::normal_quantiles;

    fn sample(values: Vec<f64>) -> Sample {
        Sample::new("t", values).unwrap()
    }

    #[test]
    fn test_normal_sample() {
        let verdict = check_distribution(&sample(normal_quantiles(200, 50.0, 5.0))).unwrap();
        assert!(verdict.is_normal);
        assert_eq!(verdict.advice, NORMAL_ADVICE);
        assert_eq!(verdict.modality, Modality::Unimodal);
        assert_eq!(verdict.peak_count, 1);
    }

    #[test]
    fn test_positive_skew_all_positive() {
        let values = normal_quantiles(300, 0.0, 1.0)
            .into_iter()
            .map(f64::exp)
            .collect();
        let verdict = check_distribution(&sample(values)).unwrap();
        assert!(!verdict.is_normal);
        assert!(verdict.advice.starts_with("Data is NOT Normal. "));
        assert!(
            verdict
                .advice
                .ends_with("Positive Skew: Consider Log or Box-Cox Transform.")
        );
    }

    #[test]
    fn test_positive_skew_with_non_positive_values() {
        let values = normal_quantiles(300, 0.0, 1.0)
            .into_iter()
            .map(|x| x.exp() - 2.0)
            .collect();
        let verdict = check_distribution(&sample(values)).unwrap();
        assert!(!verdict.is_normal);
        assert!(verdict.advice.ends_with(
            "Positive Skew: Consider Square Root (if >=0) or Non-parametric tests."
        ));
    }

    #[test]
    fn test_negative_skew() {
        let values = normal_quantiles(300, 0.0, 1.0)
            .into_iter()
            .map(|x| -x.exp())
            .collect();
        let verdict = check_distribution(&sample(values)).unwrap();
        assert!(!verdict.is_normal);
        assert!(
            verdict
                .advice
                .ends_with("Negative Skew: Consider Reflect & Log or Non-parametric tests.")
        );
    }

    #[test]
    fn test_bimodal_clause_precedes_skew_clause() {
        let mut values = normal_quantiles(200, 0.0, 1.0);
        values.extend(normal_quantiles(200, 8.0, 1.0));
        let verdict = check_distribution(&sample(values)).unwrap();
        assert!(!verdict.is_normal);
        assert_eq!(verdict.modality, Modality::Bimodal);
        assert_eq!(
            verdict.advice,
            "Data is NOT Normal. Data appears Bimodal (2 peaks). Consider mixture models \
             or splitting data. Consider Non-parametric tests."
        );
    }

    #[test]
    fn test_advice_assembly() {
        assert_eq!(
            non_normal_advice(Modality::Multimodal, 3, 1.5, true),
            "Data is NOT Normal. Data appears Multimodal (3 peaks). Consider mixture \
             models or splitting data. Positive Skew: Consider Log or Box-Cox Transform."
        );
        assert_eq!(
            non_normal_advice(Modality::Unimodal, 1, 0.2, true),
            "Data is NOT Normal. Consider Non-parametric tests."
        );
    }

    #[test]
    fn test_too_few_and_constant() {
        assert_eq!(
            check_distribution(&sample(vec![1.0, 2.0, 3.0, 4.0])),
            Err(DiagnosisError::NotEnoughSamples { got: 4, min: 5 })
        );
        assert!(matches!(
            check_distribution(&sample(vec![7.0; 30])),
            Err(DiagnosisError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_inexact_constant_is_zero_variance() {
        let result = check_distribution(&Sample::new("c", vec![0.1; 30]).unwrap());
        assert_eq!(
            result,
            Err(DiagnosisError::DegenerateInput(
                "sample 'c' has zero variance".to_string()
            ))
        );
    }

    #[test]
    fn test_missing_values_are_ignored() {
        let mut values = normal_quantiles(100, 0.0, 1.0);
        values.extend([f64::NAN; 10]);
        let verdict = check_distribution(&sample(values)).unwrap();
        assert!(verdict.is_normal);
    }
}
