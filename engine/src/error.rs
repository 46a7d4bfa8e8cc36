//! Error types for the analysis engine

use thiserror::Error;

/// Result type for market data feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Market data feed error types
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Exchange returned a non-success status
    #[error("exchange returned status {status} for {endpoint}")]
    BadStatus {
        /// Endpoint path that failed
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body did not match the expected shape
    #[error("malformed exchange payload: {0}")]
    MalformedPayload(String),
}

impl FeedError {
    /// Check if the error is worth retrying on the next refresh cycle
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Http(_) | FeedError::BadStatus { .. })
    }
}

/// Result type for engine lifecycle operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine lifecycle error types
#[derive(Debug, Error)]
pub enum EngineError {
    /// Start was called while the engine is already running
    #[error("engine is already running")]
    AlreadyRunning,

    /// Stop was called while the engine is not running
    #[error("engine is not running")]
    NotRunning,
}

/// Errors from a single-symbol analysis pass
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Symbol is not tracked by this engine
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Not enough history to compute indicators
    #[error("insufficient history for {symbol}: {have} candles, need {need}")]
    InsufficientData {
        /// Symbol being analyzed
        symbol: String,
        /// Candles currently held
        have: usize,
        /// Minimum required
        need: usize,
    },

    /// The feed could not supply a current price
    #[error("feed error for {symbol}: {source}")]
    Feed {
        /// Symbol being analyzed
        symbol: String,
        /// Underlying feed failure
        #[source]
        source: FeedError,
    },
}
