//! Desktop audio errors

use thiserror::Error;
use tune_playback::BackendError;

/// Result type for desktop audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Desktop audio errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Reading a local file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL could not be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Bytes are not decodable audio
    #[error("Decode error: {0}")]
    Decode(String),

    /// Output device failure
    #[error("Output error: {0}")]
    Output(String),

    /// OS media controls failure
    #[error("Media controls error: {0}")]
    Controls(String),
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AudioError::Decode(err.to_string())
    }
}

impl From<AudioError> for BackendError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Http(_) | AudioError::Status { .. } | AudioError::Io(_) | AudioError::InvalidUrl(_) => {
                BackendError::Fetch(err.to_string())
            }
            AudioError::Decode(msg) => BackendError::Decode(msg),
            AudioError::Output(msg) | AudioError::Controls(msg) => BackendError::Output(msg),
        }
    }
}
