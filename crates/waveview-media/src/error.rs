//! Media element errors.

use thiserror::Error;
use waveview_core::WaveviewError;

/// Errors raised by a media element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// A pending `play` was interrupted by a pause or a new source.
    #[error("Playback aborted: {0}")]
    Abort(String),

    /// Autoplay policy or permissions refused playback.
    #[error("Playback not allowed: {0}")]
    NotAllowed(String),

    #[error("Source not supported: {0}")]
    NotSupported(String),

    #[error("Media error: {0}")]
    Other(String),
}

impl MediaError {
    /// Aborts are an expected race, not a failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, MediaError::Abort(_))
    }
}

impl From<MediaError> for WaveviewError {
    fn from(err: MediaError) -> Self {
        WaveviewError::Media(err.to_string())
    }
}
