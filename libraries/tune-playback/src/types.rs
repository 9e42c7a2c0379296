//! Core types for playback management

use crate::sleep_timer::SleepTimerDisplay;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tune_core::{RepeatMode, TrackId};

/// Player lifecycle state
///
/// ```text
/// Idle → Loading → Playing ⇄ Paused → Ended → (Loading | Idle)
///        Loading → Error → (Loading | Idle)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Nothing loaded
    #[default]
    Idle,
    /// Waiting for the current track to load
    Loading,
    /// Audio is playing
    Playing,
    /// Loaded but paused
    Paused,
    /// Current track reached its end
    Ended,
    /// Last load failed
    Error,
}

impl PlayerState {
    /// Whether the player is producing (or about to produce) audio
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Playing)
    }
}

/// Transport state as published to OS media controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// Audio playing
    Playing,
    /// Audio paused
    Paused,
    /// Nothing to control
    None,
}

impl From<PlayerState> for TransportState {
    fn from(state: PlayerState) -> Self {
        match state {
            PlayerState::Playing | PlayerState::Loading => Self::Playing,
            PlayerState::Paused => Self::Paused,
            PlayerState::Idle | PlayerState::Ended | PlayerState::Error => Self::None,
        }
    }
}

/// Point-in-time view of the player, for renderers that poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: PlayerState,
    pub current_track_id: Option<TrackId>,
    pub current_index: Option<usize>,
    pub queue_len: usize,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub muted: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub sleep_timer: SleepTimerDisplay,
}
