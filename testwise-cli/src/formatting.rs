//! Output Formatting
//!
//! Human-readable output formatting for analysis reports.
//!
//! Generates terminal-friendly output with:
//! - Per-sample diagnostics (moments, outliers, normality tests, modality)
//! - Homogeneity of variance
//! - The recommended method with its advice
//! - The inference outcome or failure

use testwise_report::{InferenceStatus, Report, SampleDiagnosis};
use testwise_stats::HomogeneityVerdict;

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Testwise Analysis\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');

    let design = &report.design;
    if let Some(source) = &report.meta.source {
        output.push_str(&format!("Data: {}\n", source));
    }
    output.push_str(&format!(
        "Value: {}  observations: {}  missing: {}\n",
        design.value_column, design.observations, design.missing
    ));
    if let Some(group) = &design.group_column {
        output.push_str(&format!(
            "Groups: {} ({}){}\n",
            group,
            design.group_count.unwrap_or(0),
            if design.paired { ", paired" } else { "" }
        ));
    }
    if let Some(id) = &design.id_column {
        output.push_str(&format!(
            "Subjects: {} ({})\n",
            id,
            design.subject_count.unwrap_or(0)
        ));
    }
    output.push('\n');

    output.push_str("Diagnostics\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for diagnosis in &report.diagnoses {
        format_diagnosis(&mut output, diagnosis);
    }

    if let Some(verdict) = &report.homogeneity {
        output.push_str("Homogeneity (Brown-Forsythe)\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        output.push_str(&format!("  {}\n\n", describe_homogeneity(verdict)));
    }

    output.push_str("Recommendation\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!("  {}\n", report.recommendation.method));
    output.push_str(&format!("  {}\n\n", report.recommendation.advice));

    output.push_str("Inference\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    let inference = &report.inference;
    match (inference.status, &inference.outcome) {
        (InferenceStatus::Completed, Some(outcome)) => {
            let icon = if outcome.significant { "✓" } else { "·" };
            output.push_str(&format!("  {} {}", icon, outcome.test));
            if outcome.groups.len() == 2 {
                output.push_str(&format!(
                    " ({} vs {})",
                    outcome.groups[0], outcome.groups[1]
                ));
            }
            output.push('\n');
            output.push_str(&format!("      statistic: {:.4}", outcome.statistic));
            if let Some(df) = outcome.df {
                output.push_str(&format!("  df: {:.2}", df));
            }
            if let Some(z) = outcome.z_value {
                output.push_str(&format!("  z: {:.4}", z));
            }
            output.push_str(&format!("  p: {}\n", format_p(outcome.p_value)));
            if let Some(estimate) = outcome.estimate {
                output.push_str(&format!("      estimate: {:.4}\n", estimate));
            }
            if let Some(fit) = &outcome.mixed_model {
                output.push_str(&format!("      model: {}\n", fit.formula));
                for effect in &fit.fixed_effects {
                    output.push_str(&format!(
                        "        {:<28} {:>10.4} ± {:<8.4} p: {}\n",
                        effect.name,
                        effect.estimate,
                        effect.std_error,
                        format_p(effect.p_value)
                    ));
                }
                output.push_str(&format!(
                    "      group variance: {:.4}  residual variance: {:.4}\n",
                    fit.group_variance, fit.residual_variance
                ));
            }
            output.push_str(&format!(
                "      {} at alpha = {}\n",
                if outcome.significant {
                    "significant"
                } else {
                    "not significant"
                },
                outcome.alpha
            ));
            if let Some(note) = &outcome.note {
                output.push_str(&format!("      note: {}\n", note));
            }
        }
        _ => {
            let icon = match inference.status {
                InferenceStatus::Failed => "✗",
                _ => "⊘",
            };
            let reason = inference
                .failure
                .as_ref()
                .map(|f| f.message.as_str())
                .unwrap_or("no outcome");
            output.push_str(&format!("  {} {}: {}\n", icon, inference.method, reason));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Summary: {} samples diagnosed, {} failed, {} outliers, {:.1} ms\n",
        report.summary.samples_diagnosed,
        report.summary.diagnosis_failures,
        report.summary.total_outliers,
        report.summary.total_duration_ms
    ));

    output
}

fn format_diagnosis(output: &mut String, diagnosis: &SampleDiagnosis) {
    let status_icon = match (&diagnosis.failure, diagnosis.is_normal()) {
        (Some(_), _) => "✗",
        (None, true) => "✓",
        (None, false) => "~",
    };
    output.push_str(&format!(
        "  {} {} (n = {}",
        status_icon, diagnosis.label, diagnosis.count
    ));
    if diagnosis.missing > 0 {
        output.push_str(&format!(", {} missing", diagnosis.missing));
    }
    output.push_str(")\n");

    let moments = &diagnosis.moments;
    output.push_str(&format!(
        "      mean: {:.4}  sd: {:.4}  skewness: {:.3} ({})  kurtosis: {:.3} ({})\n",
        moments.mean,
        moments.std_dev,
        moments.skewness,
        moments.skew_shape,
        moments.kurtosis,
        moments.tail_shape
    ));

    let outliers = &diagnosis.outliers;
    output.push_str(&format!(
        "      outliers ({}): {} ({:.1}%)  bounds: [{:.4}, {:.4}]\n",
        outliers.method, outliers.count, outliers.percentage, outliers.lower_bound, outliers.upper_bound
    ));

    if let Some(verdict) = &diagnosis.distribution {
        let tests = &verdict.tests;
        output.push_str(&format!(
            "      Lilliefors p: {}  Jarque-Bera p: {}  Shapiro-Wilk p: {}\n",
            format_p(tests.lilliefors.p_value),
            format_p(tests.jarque_bera.p_value),
            tests
                .shapiro_wilk
                .map(|sw| format_p(sw.p_value))
                .unwrap_or_else(|| "skipped".to_string())
        ));
        output.push_str(&format!(
            "      modality: {} ({} peaks)\n",
            verdict.modality, verdict.peak_count
        ));
        output.push_str(&format!("      {}\n", verdict.advice));
    }

    if let Some(failure) = &diagnosis.failure {
        output.push_str(&format!("      error: {}\n", failure.message));
    }

    output.push('\n');
}

/// One-line homogeneity description
pub fn describe_homogeneity(verdict: &HomogeneityVerdict) -> String {
    if verdict.is_inconclusive() {
        return "inconclusive (statistic undefined)".to_string();
    }
    let statistic = verdict
        .statistic
        .map(|f| format!("F = {:.4}, ", f))
        .unwrap_or_default();
    format!(
        "{}p = {} -> {}",
        statistic,
        format_p(verdict.p_value),
        if verdict.is_homogeneous {
            "equal variances"
        } else {
            "unequal variances"
        }
    )
}

/// p-value with a floor for display
pub fn format_p(p: f64) -> String {
    if p.is_nan() {
        "n/a".to_string()
    } else if p < 1e-4 {
        "< 0.0001".to_string()
    } else {
        format!("{:.4}", p)
    }
}
