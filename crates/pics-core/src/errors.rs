//! Error types for the applicability engine.
//!
//! Only run-level failures surface as [`EngineError`]. Per-expression problems
//! (malformed expressions, unknown PICS ids, parser outages) are recovered inside
//! the evaluators and recorded in the evaluation trace instead.

use std::time::Duration;

/// Engine errors. Any of these aborts the run; no partial result is produced.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Condition store unreachable, missing or unreadable.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Request does not name a data source or is otherwise malformed.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Inline specification document could not be decoded.
    #[error("invalid spec data: {message}")]
    InvalidSpecData { message: String },
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } => 2,
            Self::InvalidRequest { .. } | Self::InvalidSpecData { .. } => 2,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Configuration {
            message: format!("condition store: {}", err),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidSpecData {
            message: err.to_string(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Condition-parsing service errors. Always recovered by the fallback layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParserError {
    /// Transport failure or non-success status.
    #[error("network error: {message}")]
    Network { message: String },

    /// Service asked us to back off.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Service answered with something we cannot use.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Parser not configured (offline mode) or misconfigured.
    #[error("parser unavailable: {message}")]
    Unavailable { message: String },
}

impl ParserError {
    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for ParserError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for parser operations.
pub type ParserResult<T> = Result<T, ParserError>;
