//! Kernel Density Modality
//!
//! Gaussian kernel density estimate with Scott's bandwidth, evaluated on an
//! evenly spaced grid spanning the sample range. Peaks of the evaluated curve
//! give the modality estimate.

use crate::moments::{is_constant, sample_std_dev};
use crate::sample::Sample;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Number of evaluation points spanning `[min, max]`
pub const KDE_GRID_POINTS: usize = 1000;

/// Coarse shape of a density estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    /// One peak (also the fallback for degenerate input)
    Unimodal,
    /// Two peaks
    Bimodal,
    /// Three or more peaks
    Multimodal,
}

impl Modality {
    /// Classify a peak count
    pub fn from_peak_count(peaks: usize) -> Self {
        match peaks {
            0 | 1 => Modality::Unimodal,
            2 => Modality::Bimodal,
            _ => Modality::Multimodal,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Unimodal => write!(f, "Unimodal"),
            Modality::Bimodal => write!(f, "Bimodal"),
            Modality::Multimodal => write!(f, "Multimodal"),
        }
    }
}

/// Result of the modality scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityEstimate {
    /// Number of local maxima of the density curve
    pub peak_count: usize,
    /// Classification of `peak_count`
    pub modality: Modality,
    /// Kernel bandwidth; `None` when no density could be estimated
    pub bandwidth: Option<f64>,
}

impl ModalityEstimate {
    fn degenerate() -> Self {
        Self {
            peak_count: 0,
            modality: Modality::Unimodal,
            bandwidth: None,
        }
    }
}

/// Scott's rule bandwidth: `s * n^(-1/5)`
///
/// `None` for fewer than two values or a constant sample.
pub fn scott_bandwidth(values: &[f64]) -> Option<f64> {
    if is_constant(values) {
        return None;
    }
    let s = sample_std_dev(values);
    if !s.is_finite() || s <= 0.0 {
        return None;
    }
    Some(s * (values.len() as f64).powf(-0.2))
}

/// Evaluate the Gaussian KDE of `values` at every point of `grid`
pub fn kde_evaluate(values: &[f64], bandwidth: f64, grid: &[f64]) -> Vec<f64> {
    let norm = 1.0 / (values.len() as f64 * bandwidth * (2.0 * PI).sqrt());
    grid.par_iter()
        .map(|&x| {
            let sum: f64 = values
                .iter()
                .map(|&xi| {
                    let u = (x - xi) / bandwidth;
                    (-0.5 * u * u).exp()
                })
                .sum();
            sum * norm
        })
        .collect()
}

/// `count` evenly spaced points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Indices of local maxima.
///
/// Endpoints never count. A flat plateau that rises on the left and falls on
/// the right is reported once, at its (lower) midpoint.
pub fn find_peaks(curve: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if curve.len() < 3 {
        return peaks;
    }

    let last = curve.len() - 1;
    let mut i = 1;
    while i < last {
        if curve[i - 1] < curve[i] {
            let mut ahead = i + 1;
            while ahead < last && curve[ahead] == curve[i] {
                ahead += 1;
            }
            if curve[ahead] < curve[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Estimate the number of modes of a sample's clean values
///
/// Fewer than two values or zero variance cannot support a kernel estimate;
/// the result is then 0 peaks, `Unimodal`, and no bandwidth.
///
/// # Examples
///
/// ```
/// # use testwise_stats::{detect_modality, Modality, Sample};
/// let constant = Sample::new("c", vec![4.0; 12]).unwrap();
/// let estimate = detect_modality(&constant);
/// assert_eq!(estimate.peak_count, 0);
/// assert_eq!(estimate.modality, Modality::Unimodal);
/// ```
pub fn detect_modality(sample: &Sample) -> ModalityEstimate {
    let values = sample.values();
    if values.len() < 2 {
        return ModalityEstimate::degenerate();
    }
    let Some(bandwidth) = scott_bandwidth(values) else {
        return ModalityEstimate::degenerate();
    };
    let (Some(min), Some(max)) = (sample.min(), sample.max()) else {
        return ModalityEstimate::degenerate();
    };

    let grid = linspace(min, max, KDE_GRID_POINTS);
    let density = kde_evaluate(values, bandwidth, &grid);
    let peak_count = find_peaks(&density).len();

    tracing::debug!(
        sample = sample.name(),
        peak_count,
        bandwidth,
        "Estimated modality"
    );

    ModalityEstimate {
        peak_count,
        modality: Modality::from_peak_count(peak_count),
        bandwidth: Some(bandwidth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::normal_quantiles;

    #[test]
    fn test_find_peaks_strict_and_plateau() {
        assert_eq!(find_peaks(&[0.0, 1.0, 0.0, 2.0, 0.0]), vec![1, 3]);
        // plateau of width 3 counted once at its midpoint
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 1.0, 0.0]), vec![2]);
        // monotone curves and endpoints have no peaks
        assert!(find_peaks(&[0.0, 1.0, 2.0, 3.0]).is_empty());
        assert!(find_peaks(&[3.0, 2.0, 1.0]).is_empty());
        // plateau running into the end is not a peak
        assert!(find_peaks(&[0.0, 1.0, 1.0, 1.0]).is_empty());
    }

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(-1.0, 1.0, 5);
        assert_eq!(grid, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(linspace(0.0, 1.0, KDE_GRID_POINTS).len(), KDE_GRID_POINTS);
    }

    #[test]
    fn test_kde_integrates_to_about_one() {
        let values = normal_quantiles(200, 0.0, 1.0);
        let h = scott_bandwidth(&values).unwrap();
        let grid = linspace(-8.0, 8.0, 4001);
        let density = kde_evaluate(&values, h, &grid);
        let step = grid[1] - grid[0];
        let area: f64 = density.iter().sum::<f64>() * step;
        assert!((area - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_gaussian_is_unimodal() {
        let sample = Sample::new("n", normal_quantiles(500, 10.0, 2.0)).unwrap();
        let estimate = detect_modality(&sample);
        assert_eq!(estimate.peak_count, 1);
        assert_eq!(estimate.modality, Modality::Unimodal);
        assert!(estimate.bandwidth.unwrap() > 0.0);
    }

    #[test]
    fn test_well_separated_mixture_is_bimodal() {
        let mut values = normal_quantiles(200, 0.0, 1.0);
        values.extend(normal_quantiles(200, 8.0, 1.0));
        let estimate = detect_modality(&Sample::new("mix", values).unwrap());
        assert_eq!(estimate.peak_count, 2);
        assert_eq!(estimate.modality, Modality::Bimodal);
    }

    #[test]
    fn test_three_clusters_are_multimodal() {
        let mut values = normal_quantiles(150, 0.0, 1.0);
        values.extend(normal_quantiles(150, 10.0, 1.0));
        values.extend(normal_quantiles(150, 20.0, 1.0));
        let estimate = detect_modality(&Sample::new("mix", values).unwrap());
        assert_eq!(estimate.peak_count, 3);
        assert_eq!(estimate.modality, Modality::Multimodal);
    }

    #[test]
    fn test_degenerate_inputs() {
        for values in [vec![], vec![1.0], vec![5.0; 20], vec![0.1; 30]] {
            let estimate = detect_modality(&Sample::new("d", values).unwrap());
            assert_eq!(estimate.peak_count, 0);
            assert_eq!(estimate.modality, Modality::Unimodal);
            assert!(estimate.bandwidth.is_none());
        }
    }
}
