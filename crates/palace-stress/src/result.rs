//! Result and error types for palace-stress.

use thiserror::Error;

/// Result type for stress-test operations
pub type StressResult<T> = Result<T, StressError>;

/// Errors that can occur while configuring or driving a stress run
#[derive(Debug, Error)]
pub enum StressError {
    /// Invalid engine configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {message}")]
    HttpClient {
        /// Error message
        message: String,
    },

    /// Request produced no HTTP response (connect error, timeout, body read)
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// I/O error while writing a report
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StressError {
    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }
}
