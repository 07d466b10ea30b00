//! Error types for waveview.

use thiserror::Error;

/// Main error type for waveview operations.
#[derive(Error, Debug)]
pub enum WaveviewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Invalid audio data: {0}")]
    InvalidAudio(String),

    #[error("No audio loaded: {0}")]
    NoAudio(&'static str),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Load aborted")]
    Aborted,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for waveview operations.
pub type Result<T> = std::result::Result<T, WaveviewError>;
