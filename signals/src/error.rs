//! Error types for the signals crate

use thiserror::Error;

/// Main error type for indicator and scoring operations
#[derive(Error, Debug)]
pub enum SignalError {
    /// Fewer candles than the pipeline minimum. Treated by callers as
    /// "no result this cycle", not as a fault to surface.
    #[error("Insufficient history: {have} candles, need {need}")]
    InsufficientData { have: usize, need: usize },

    /// Scorer weight table does not sum to 1.0. Fatal at construction.
    #[error("Invalid weight table (sum = {sum}): weights must sum to 1.0")]
    InvalidWeights { sum: f64 },

    /// YAML parsing error for weight configuration
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type for signal operations
pub type SignalResult<T> = Result<T, SignalError>;
