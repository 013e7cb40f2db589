//! Common error types for SSLCast

use thiserror::Error;

/// Common result type for SSLCast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across SSLCast services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error for bus payloads
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event bus framing or transport error
    #[error("Bus error: {0}")]
    Bus(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
