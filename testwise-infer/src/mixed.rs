//! Random-Intercept Linear Mixed Model
//!
//! `y = X b + Z u + e` with one random intercept per group,
//! `u ~ N(0, s2 * lambda)` and `e ~ N(0, s2)`. The REML criterion is profiled
//! over the variance ratio `lambda`, so the only numeric search is one
//! dimensional (coarse grid over `ln lambda`, then golden-section refinement).
//!
//! Block structure keeps every per-lambda evaluation linear in the number of
//! rows: within group j, `V_j^-1 = I - w_j 11'` with `w_j = lambda / (1 + lambda n_j)`.

use crate::error::{InferenceError, Result};
use crate::formula::Design;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use testwise_stats::standard_normal_sf;

/// Search range for `ln lambda`
const LOG_RATIO_BOUNDS: (f64, f64) = (-12.0, 12.0);

/// Coarse grid step over `ln lambda`
const GRID_STEP: f64 = 0.5;

/// Golden-section tolerance on `ln lambda`
const TOLERANCE: f64 = 1e-6;

/// Maximum golden-section iterations
const MAX_ITERATIONS: usize = 200;

/// One estimated fixed effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedEffect {
    /// Design column name
    pub name: String,
    /// Coefficient estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: f64,
    /// Wald z statistic
    pub z_value: f64,
    /// Two-sided p-value of the Wald test
    pub p_value: f64,
}

/// Fitted random-intercept model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedModelFit {
    /// Formula that was fitted
    pub formula: String,
    /// Observations used
    pub n_obs: usize,
    /// Number of groups
    pub n_groups: usize,
    /// Fixed effects, intercept first
    pub fixed_effects: Vec<FixedEffect>,
    /// Residual variance
    pub residual_variance: f64,
    /// Random-intercept variance
    pub group_variance: f64,
    /// Maximized REML log-likelihood
    pub reml_log_likelihood: f64,
    /// Whether the variance-ratio search converged inside its bounds
    pub converged: bool,
    /// Golden-section iterations used
    pub iterations: usize,
}

impl MixedModelFit {
    /// First fixed effect after the intercept, if any
    pub fn primary_effect(&self) -> Option<&FixedEffect> {
        self.fixed_effects.get(1)
    }
}

/// Per-group sufficient statistics
struct GroupBlock {
    n: f64,
    /// X_j' 1
    x_sum: DVector<f64>,
    /// 1' y_j
    y_sum: f64,
}

/// Quantities needed for every criterion evaluation
struct Problem {
    n: usize,
    p: usize,
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
    yty: f64,
    blocks: Vec<GroupBlock>,
}

/// Profiled solution at a fixed variance ratio
struct Profile {
    /// REML deviance without constants
    criterion: f64,
    beta: DVector<f64>,
    sigma2: f64,
    /// (X' V^-1 X)^-1
    xtvx_inv: DMatrix<f64>,
}

impl Problem {
    fn new(design: &Design) -> Self {
        let x = &design.fixed;
        let y = &design.response;
        let (n, p) = x.shape();
        let n_groups = design.group_labels.len();

        let mut blocks: Vec<GroupBlock> = (0..n_groups)
            .map(|_| GroupBlock {
                n: 0.0,
                x_sum: DVector::zeros(p),
                y_sum: 0.0,
            })
            .collect();
        for (row, &g) in design.groups.iter().enumerate() {
            let block = &mut blocks[g];
            block.n += 1.0;
            block.y_sum += y[row];
            for col in 0..p {
                block.x_sum[col] += x[(row, col)];
            }
        }

        Self {
            n,
            p,
            xtx: x.transpose() * x,
            xty: x.transpose() * y,
            yty: y.dot(y),
            blocks,
        }
    }

    /// Profile out beta and s2 at `lambda`
    fn profile(&self, lambda: f64) -> Option<Profile> {
        let mut xtvx = self.xtx.clone();
        let mut xtvy = self.xty.clone();
        let mut ytvy = self.yty;
        let mut log_det_v = 0.0;

        for block in &self.blocks {
            let w = lambda / (1.0 + lambda * block.n);
            xtvx -= &block.x_sum * block.x_sum.transpose() * w;
            xtvy -= &block.x_sum * (w * block.y_sum);
            ytvy -= w * block.y_sum * block.y_sum;
            log_det_v += (1.0 + lambda * block.n).ln();
        }

        let chol = xtvx.cholesky()?;
        let log_det_xtvx: f64 = 2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();
        let beta = chol.solve(&xtvy);

        // r' V^-1 r = y'V^-1 y - b' X'V^-1 y at the GLS solution
        let quad = ytvy - beta.dot(&xtvy);
        let dof = (self.n - self.p) as f64;
        let sigma2 = quad / dof;
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return None;
        }

        Some(Profile {
            criterion: dof * sigma2.ln() + log_det_v + log_det_xtvx,
            beta,
            sigma2,
            xtvx_inv: chol.inverse(),
        })
    }

    fn criterion_at(&self, log_ratio: f64) -> f64 {
        self.profile(log_ratio.exp())
            .map_or(f64::INFINITY, |profile| profile.criterion)
    }
}

/// Golden-section minimization of `f` over `[lo, hi]`
fn golden_section(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> (f64, usize, bool) {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut c = hi - ratio * (hi - lo);
    let mut d = lo + ratio * (hi - lo);
    let (mut fc, mut fd) = (f(c), f(d));

    for iteration in 1..=MAX_ITERATIONS {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - ratio * (hi - lo);
            fc = f(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + ratio * (hi - lo);
            fd = f(d);
        }
        if hi - lo < TOLERANCE {
            return ((lo + hi) / 2.0, iteration, true);
        }
    }
    ((lo + hi) / 2.0, MAX_ITERATIONS, false)
}

/// Fit a random-intercept model by REML
pub fn fit_random_intercept(design: &Design, formula: &str) -> Result<MixedModelFit> {
    let (n, p) = design.fixed.shape();
    let n_groups = design.group_labels.len();
    if n <= p + 1 {
        return Err(InferenceError::NotEnoughSamples { got: n, min: p + 2 });
    }
    if n_groups < 2 {
        return Err(InferenceError::InvalidArgument(format!(
            "random intercept needs at least 2 groups, found {}",
            n_groups
        )));
    }

    let problem = Problem::new(design);

    // Coarse grid over ln(lambda)
    let (lo, hi) = LOG_RATIO_BOUNDS;
    let steps = ((hi - lo) / GRID_STEP).round() as usize;
    let (best_index, best_value) = (0..=steps)
        .map(|i| problem.criterion_at(lo + i as f64 * GRID_STEP))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, value)| {
            if value < best.1 { (i, value) } else { best }
        });
    if !best_value.is_finite() {
        return Err(InferenceError::ModelFit(
            "fixed-effects design is singular or residual variance is zero".to_string(),
        ));
    }

    let center = lo + best_index as f64 * GRID_STEP;
    let (log_ratio, iterations, converged) = golden_section(
        |t| problem.criterion_at(t),
        (center - GRID_STEP).max(lo),
        (center + GRID_STEP).min(hi),
    );
    let at_upper_bound = hi - log_ratio < GRID_STEP;

    // The boundary lambda = 0 (no group variance) is a candidate of its own
    let interior = problem.profile(log_ratio.exp());
    let boundary = problem.profile(0.0);
    let (lambda, profile) = match (interior, boundary) {
        (Some(i), Some(b)) if b.criterion < i.criterion => (0.0, b),
        (Some(i), _) => (log_ratio.exp(), i),
        (None, Some(b)) => (0.0, b),
        (None, None) => {
            return Err(InferenceError::ModelFit(
                "REML criterion could not be evaluated at the optimum".to_string(),
            ));
        }
    };

    let dof = (n - p) as f64;
    let reml_log_likelihood = -0.5 * (profile.criterion + dof * (1.0 + (2.0 * PI).ln()));

    let fixed_effects = design
        .names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = profile.beta[j];
            let std_error = (profile.sigma2 * profile.xtvx_inv[(j, j)]).sqrt();
            let z_value = estimate / std_error;
            FixedEffect {
                name: name.clone(),
                estimate,
                std_error,
                z_value,
                p_value: (2.0 * standard_normal_sf(z_value.abs())).min(1.0),
            }
        })
        .collect();

    let fit = MixedModelFit {
        formula: formula.to_string(),
        n_obs: n,
        n_groups,
        fixed_effects,
        residual_variance: profile.sigma2,
        group_variance: lambda * profile.sigma2,
        reml_log_likelihood,
        converged: converged && !at_upper_bound,
        iterations,
    };

    tracing::debug!(
        formula,
        n_obs = n,
        n_groups,
        group_variance = fit.group_variance,
        residual_variance = fit.residual_variance,
        converged = fit.converged,
        "Fitted random-intercept model"
    );

    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{Formula, build_design};
    use testwise_stats::synthetic::{HierarchicalDesign, Noise, hierarchical_table};

    fn fit(seed: u64, design: &HierarchicalDesign) -> MixedModelFit {
        let table = hierarchical_table(seed, design).unwrap();
        let formula = Formula::parse("Value ~ C(Condition) + (1|SubjectID)").unwrap();
        let design = build_design(&formula, &table).unwrap();
        fit_random_intercept(&design, &formula.to_string()).unwrap()
    }

    #[test]
    fn test_golden_section_finds_parabola_minimum() {
        let (x, _, converged) = golden_section(|t| (t - 1.25).powi(2), -3.0, 4.0);
        assert!(converged);
        assert!((x - 1.25).abs() < 1e-5);
    }

    #[test]
    fn test_recovers_condition_effect_and_group_variance() {
        let design = HierarchicalDesign {
            subjects: 30,
            trials: 10,
            baseline: 10.0,
            subject_sd: 5.0,
            condition_effect: 2.0,
            noise: Noise::Normal { sd: 1.0 },
        };
        let result = fit(7, &design);

        assert!(result.converged);
        assert_eq!(result.n_obs, 300);
        assert_eq!(result.n_groups, 30);
        let effect = result.primary_effect().unwrap();
        assert_eq!(effect.name, "C(Condition)[T.B]");
        assert!((effect.estimate - 2.0).abs() < 0.5, "estimate {}", effect.estimate);
        assert!(effect.p_value < 1e-6);
        assert!((result.residual_variance - 1.0).abs() < 0.4);
        // subject variance 25: allow for sampling noise across 30 subjects
        assert!(result.group_variance > 8.0 && result.group_variance < 60.0);
    }

    #[test]
    fn test_balanced_design_matches_ols_coefficients() {
        // With alternating conditions inside every subject the GLS estimate of
        // the condition effect equals the difference of condition means.
        let table = hierarchical_table(3, &HierarchicalDesign::default()).unwrap();
        let formula = Formula::parse("Value ~ Condition + (1|SubjectID)").unwrap();
        let design = build_design(&formula, &table).unwrap();
        let result = fit_random_intercept(&design, &formula.to_string()).unwrap();

        let y = &design.response;
        let x = design.fixed.column(1);
        let (mut sum_b, mut n_b, mut sum_a, mut n_a) = (0.0, 0.0, 0.0, 0.0);
        for i in 0..y.len() {
            if x[i] == 1.0 {
                sum_b += y[i];
                n_b += 1.0;
            } else {
                sum_a += y[i];
                n_a += 1.0;
            }
        }
        let difference = sum_b / n_b - sum_a / n_a;
        assert!((result.fixed_effects[1].estimate - difference).abs() < 1e-8);
    }

    #[test]
    fn test_no_group_variance_hits_boundary() {
        let design = HierarchicalDesign {
            subjects: 10,
            trials: 10,
            baseline: 0.0,
            subject_sd: 0.0,
            condition_effect: 0.0,
            noise: Noise::Normal { sd: 1.0 },
        };
        let result = fit(11, &design);
        assert!(result.group_variance < 0.3);
        assert!(result.residual_variance > 0.5);
    }

    #[test]
    fn test_rejects_single_group() {
        let design = HierarchicalDesign {
            subjects: 1,
            ..HierarchicalDesign::default()
        };
        let table = hierarchical_table(1, &design).unwrap();
        let formula = Formula::parse("Value ~ Condition + (1|SubjectID)").unwrap();
        let built = build_design(&formula, &table).unwrap();
        assert!(matches!(
            fit_random_intercept(&built, "f"),
            Err(InferenceError::InvalidArgument(_))
        ));
    }
}
