//! Error types for sslcast-audio

use thiserror::Error;

/// Main error type for the audio playback service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio output device or playback backend errors
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library errors
    #[error(transparent)]
    Common(#[from] sslcast_common::Error),
}

/// Convenience Result type using the audio service Error
pub type Result<T> = std::result::Result<T, Error>;
