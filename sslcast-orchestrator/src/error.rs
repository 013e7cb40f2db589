//! Error types for sslcast-orchestrator

use thiserror::Error;

/// Main error type for the orchestrator service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Multicast socket setup or receive errors
    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// Referee datagram decode errors
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Event bus errors
    #[error("Bus error: {0}")]
    Bus(String),

    /// Common library errors
    #[error(transparent)]
    Common(#[from] sslcast_common::Error),
}

/// Convenience Result type using the orchestrator Error
pub type Result<T> = std::result::Result<T, Error>;
