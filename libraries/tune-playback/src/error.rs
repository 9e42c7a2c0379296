//! Error types for playback

use thiserror::Error;
use tune_core::TrackId;

/// Failure reported by a concrete audio backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Resource could not be fetched
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Resource could not be decoded
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Output device unavailable or rejected the stream
    #[error("Output failed: {0}")]
    Output(String),

    /// Seek not supported or failed
    #[error("Seek failed: {0}")]
    Seek(String),
}

/// A track could not be loaded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// No download variant has a usable URL
    #[error("Track {track_id} has no playable download URL")]
    NoPlayableUrl { track_id: TrackId },

    /// The backend failed to open the stream
    #[error("Failed to load track {track_id}: {source}")]
    Backend {
        track_id: TrackId,
        #[source]
        source: BackendError,
    },
}

impl LoadError {
    /// Track that failed
    pub fn track_id(&self) -> &TrackId {
        match self {
            Self::NoPlayableUrl { track_id } | Self::Backend { track_id, .. } => track_id,
        }
    }
}

/// Media-session platform failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// Platform does not implement this capability
    #[error("Not supported by this platform: {0}")]
    Unsupported(String),

    /// Platform call failed
    #[error("Media session call failed: {0}")]
    Failed(String),
}

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Loading a track failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Operation needs a loaded track and none is loaded
    #[error("No track loaded")]
    NothingLoaded,

    /// Backend error outside of loading
    #[error("Audio backend error: {0}")]
    Backend(#[from] BackendError),

    /// Media-session error
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Persistence error
    #[error("Storage error: {0}")]
    Storage(#[from] tune_core::TuneError),

    /// The player runtime has shut down
    #[error("Player runtime is no longer running")]
    ChannelClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
