#![warn(missing_docs)]
//! Testwise Diagnostic Engine
//!
//! Turns raw numeric data into the flags a test recommendation is made from:
//! - Moments with categorical skew and tail descriptors
//! - Outlier detection via IQR fences or z-scores
//! - Kernel density modality (peak counting)
//! - Normality verdict (Lilliefors decides; Jarque-Bera and Shapiro-Wilk reported)
//! - Brown-Forsythe homogeneity of variance across groups
//!
//! Every routine reads the clean view of a [`Sample`] and returns immutable
//! plain data.

mod density;
mod distribution;
mod error;
mod homogeneity;
mod moments;
mod normality;
mod outliers;
mod percentiles;
mod sample;
pub mod synthetic;

pub use density::{
    KDE_GRID_POINTS, Modality, ModalityEstimate, detect_modality, find_peaks, kde_evaluate,
    linspace, scott_bandwidth,
};
pub use distribution::{
    DistributionVerdict, MIN_DISTRIBUTION_SAMPLES, NORMAL_ADVICE, check_distribution,
};
pub use error::{DiagnosisError, Result};
pub use homogeneity::{HomogeneityVerdict, brown_forsythe, check_homogeneity};
pub use moments::{MomentSummary, SkewShape, TailShape, compute_moments};
pub use normality::{
    NORMALITY_ALPHA, NormalityTests, SHAPIRO_WILK_MAX_N, TestStatistic, jarque_bera, lilliefors,
    normality_tests, shapiro_wilk, standard_normal_cdf, standard_normal_quantile,
    standard_normal_sf,
};
pub use outliers::{
    DEFAULT_IQR_K, DEFAULT_Z_THRESHOLD, OutlierAnalysis, OutlierMethod, detect_outliers,
};
pub use percentiles::{median, quantile, quantile_sorted, quartiles};
pub use sample::{Column, GroupedSample, Sample, Table, is_missing_token};
