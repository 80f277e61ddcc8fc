//! Diagnosis Errors

use thiserror::Error;

/// Errors raised by sample construction and diagnostic routines
///
/// These indicate caller misuse or data that cannot be diagnosed; they are
/// surfaced immediately and never recovered from locally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosisError {
    /// Data that cannot form a sample (non-numeric, not one-dimensional,
    /// unknown or mistyped column reference)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A parameter outside its domain (e.g. unknown outlier policy)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Fewer clean observations than the routine needs
    #[error("Not enough samples: got {got}, need at least {min}")]
    NotEnoughSamples {
        /// Clean observations available
        got: usize,
        /// Observations required
        min: usize,
    },

    /// Zero-variance or otherwise degenerate data
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),
}

/// Result alias for diagnosis operations
pub type Result<T> = std::result::Result<T, DiagnosisError>;
