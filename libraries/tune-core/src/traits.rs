//! Collaborator traits
//!
//! The playback core never talks HTTP itself. Catalog lookups and listening
//! history go through these traits, implemented by the embedding application.

use crate::error::Result;
use crate::types::{Track, TrackId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of recommendations used to extend the queue
#[async_trait]
pub trait SongCatalog: Send + Sync {
    /// Tracks related to `track_id`. An empty list means "nothing to add".
    async fn fetch_related_tracks(&self, track_id: &TrackId) -> Result<Vec<Track>>;
}

/// A single listen reported to the history service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    /// The track that started playing
    pub track: Track,
    /// Seconds already played when the record was made
    pub played_seconds: f64,
    /// When playback started
    pub played_at: DateTime<Utc>,
}

impl PlayRecord {
    /// Record a play starting now
    pub fn new(track: Track, played_seconds: f64) -> Self {
        Self {
            track,
            played_seconds,
            played_at: Utc::now(),
        }
    }
}

/// Listening-history sink. Calls are fire-and-forget from the player's view.
#[async_trait]
pub trait PlayHistory: Send + Sync {
    /// Report a play
    async fn record_play(&self, record: PlayRecord) -> Result<()>;
}
