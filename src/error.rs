//! Error types for the docgate client.

use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

/// Main error type for docgate operations.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The current window is saturated and the limiter rejects instead of waiting
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    /// A blocking caller waited longer than the configured maximum
    #[error("Timed out after {waited:?} waiting for admission")]
    AdmissionTimeout { waited: Duration },

    /// A blocking caller abandoned its wait
    #[error("Admission wait cancelled")]
    Cancelled,

    /// Downstream call failed after admission was granted
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Document serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GuardError::RateLimitExceeded { .. } | GuardError::AdmissionTimeout { .. }
        )
    }
}

/// Result type alias for docgate operations.
pub type Result<T> = std::result::Result<T, GuardError>;
