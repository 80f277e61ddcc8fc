//! Inference Errors

use testwise_stats::DiagnosisError;
use thiserror::Error;

/// Errors raised while executing a statistical test
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// The method does not apply to the supplied design
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Too few usable observations
    #[error("Not enough samples: got {got}, need at least {min}")]
    NotEnoughSamples {
        /// Usable observations
        got: usize,
        /// Observations required
        min: usize,
    },

    /// Data without the variation the test needs
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// Mixed model could not be fitted
    #[error("Model fit failed: {0}")]
    ModelFit(String),

    /// Test routine rejected its input
    #[error("Statistics error: {0}")]
    Statistics(String),

    /// Underlying sample or table error
    #[error(transparent)]
    Diagnosis(#[from] DiagnosisError),
}

impl From<anofox_statistics::StatError> for InferenceError {
    fn from(e: anofox_statistics::StatError) -> Self {
        Self::Statistics(e.to_string())
    }
}

/// Result alias for inference operations
pub type Result<T> = std::result::Result<T, InferenceError>;
