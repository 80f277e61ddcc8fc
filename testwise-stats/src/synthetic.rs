//! Synthetic Data
//!
//! Reproducible generators for demos and tests. Every random generator takes
//! an explicit seed; nothing touches process-wide random state.

use crate::error::Result;
use crate::normality::standard_normal_quantile;
use crate::sample::Table;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

/// Deterministic "perfectly normal" sample: `mean + sd * Phi^-1((i - 0.5) / n)`
pub fn normal_quantiles(n: usize, mean: f64, sd: f64) -> Vec<f64> {
    let nf = n as f64;
    (1..=n)
        .map(|i| mean + sd * standard_normal_quantile((i as f64 - 0.5) / nf))
        .collect()
}

fn standard_normals(rng: &mut StdRng, n: usize) -> impl Iterator<Item = f64> + '_ {
    (0..n).map(move |_| StandardNormal.sample(&mut *rng))
}

/// `n` seeded draws from N(mean, sd^2)
pub fn normal_draws(seed: u64, n: usize, mean: f64, sd: f64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    standard_normals(&mut rng, n).map(|z| mean + sd * z).collect()
}

/// `n` seeded draws from a log-normal with log-mean `mu` and log-sd `sigma`
pub fn lognormal_draws(seed: u64, n: usize, mu: f64, sigma: f64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    standard_normals(&mut rng, n)
        .map(|z| (mu + sigma * z).exp())
        .collect()
}

/// Two independent Gaussian groups in columns `RT` / `Group`
/// (`Control` rows first, then `Treatment`)
pub fn two_group_table(
    seed: u64,
    n_per_group: usize,
    means: (f64, f64),
    sd: f64,
) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(2 * n_per_group);
    let mut labels = Vec::with_capacity(2 * n_per_group);

    for (label, mean) in [("Control", means.0), ("Treatment", means.1)] {
        for z in standard_normals(&mut rng, n_per_group) {
            values.push(mean + sd * z);
            labels.push(label);
        }
    }

    Table::new()
        .with_numeric("RT", values)?
        .with_text("Group", labels)
}

/// Residual distribution of a hierarchical design
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Noise {
    /// N(0, sd^2)
    Normal {
        /// Standard deviation
        sd: f64,
    },
    /// exp(N(0, sigma^2)), strictly positive and right-skewed
    LogNormal {
        /// Log-scale standard deviation
        sigma: f64,
    },
}

/// Repeated-measures design: subjects with random intercepts, two conditions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchicalDesign {
    /// Number of subjects
    pub subjects: usize,
    /// Observations per subject (conditions alternate A, B, A, ...)
    pub trials: usize,
    /// Grand intercept
    pub baseline: f64,
    /// Standard deviation of the subject intercepts
    pub subject_sd: f64,
    /// Shift applied to condition B
    pub condition_effect: f64,
    /// Residual distribution
    pub noise: Noise,
}

impl Default for HierarchicalDesign {
    fn default() -> Self {
        Self {
            subjects: 20,
            trials: 10,
            baseline: 10.0,
            subject_sd: 5.0,
            condition_effect: 2.0,
            noise: Noise::LogNormal { sigma: 0.5 },
        }
    }
}

/// Hierarchical data in columns `Value` / `Condition` / `SubjectID`
pub fn hierarchical_table(seed: u64, design: &HierarchicalDesign) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = design.subjects * design.trials;
    let mut values = Vec::with_capacity(rows);
    let mut conditions = Vec::with_capacity(rows);
    let mut subjects = Vec::with_capacity(rows);

    for subject in 0..design.subjects {
        let z: f64 = StandardNormal.sample(&mut rng);
        let intercept = design.subject_sd * z;

        for trial in 0..design.trials {
            let (condition, effect) = if trial % 2 == 0 {
                ("A", 0.0)
            } else {
                ("B", design.condition_effect)
            };
            let e: f64 = StandardNormal.sample(&mut rng);
            let noise = match design.noise {
                Noise::Normal { sd } => sd * e,
                Noise::LogNormal { sigma } => (sigma * e).exp(),
            };

            values.push(design.baseline + intercept + effect + noise);
            conditions.push(condition);
            subjects.push(format!("S{:02}", subject + 1));
        }
    }

    Table::new()
        .with_numeric("Value", values)?
        .with_text("Condition", conditions)?
        .with_text("SubjectID", subjects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_grid_is_symmetric() {
        let values = normal_quantiles(11, 5.0, 2.0);
        assert_eq!(values.len(), 11);
        assert!((values[5] - 5.0).abs() < 1e-9);
        assert!((values[0] - 5.0 + (values[10] - 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_draws_are_reproducible() {
        assert_eq!(normal_draws(7, 20, 0.0, 1.0), normal_draws(7, 20, 0.0, 1.0));
        assert_ne!(normal_draws(7, 20, 0.0, 1.0), normal_draws(8, 20, 0.0, 1.0));
        assert!(lognormal_draws(3, 100, 0.0, 1.0).iter().all(|&x| x > 0.0));
    }

    #[test]
    fn test_table_shapes() {
        let table = two_group_table(42, 50, (300.0, 320.0), 30.0).unwrap();
        assert_eq!(table.row_count(), 100);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["RT", "Group"]);

        let design = HierarchicalDesign::default();
        let table = hierarchical_table(99, &design).unwrap();
        assert_eq!(table.row_count(), 200);
        assert!(table.require_numeric("Value").is_ok());
        assert!(table.column("SubjectID").unwrap().as_numeric().is_none());
    }
}
