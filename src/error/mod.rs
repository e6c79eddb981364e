//! Error types for pubsub-pipe.

use thiserror::Error;

/// Result type for pubsub-pipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pubsub-pipe.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials could not be resolved or a token could not be minted.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Pub/Sub API answered with a non-success status.
    #[error("Pub/Sub API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message returned by the service.
        message: String,
    },

    /// Publish did not yield a message ID.
    #[error("Publish error: {0}")]
    Publish(String),

    /// Invalid resource name.
    #[error("Invalid resource name: {0}")]
    InvalidResourceName(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures, timeouts, throttling and 5xx answers are
    /// transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}
