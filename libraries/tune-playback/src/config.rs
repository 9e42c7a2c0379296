//! Player configuration
//!
//! [`PlayerConfig`] is user-facing and persisted; [`OrchestratorSettings`]
//! tunes internal behaviour and lives only for the session.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tune_core::AudioQuality;

/// Storage namespace for the queue snapshot
pub const QUEUE_NAMESPACE: &str = "tune-player-queue";

/// Storage namespace for [`PlayerConfig`]
pub const CONFIG_NAMESPACE: &str = "tune-player-config";

/// Longest allowed crossfade
pub const MAX_CROSSFADE_MS: u32 = 10_000;

/// User-facing playback preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Preferred streaming quality
    pub audio_quality: AudioQuality,

    /// Fetch the next track while the current one plays
    pub preload_next: bool,

    /// Start the next track without a gap (required for crossfade)
    pub gapless_playback: bool,

    /// Crossfade length in milliseconds (0 = none, max 10000)
    #[serde(deserialize_with = "deserialize_crossfade")]
    pub crossfade_ms: u32,
}

impl PlayerConfig {
    /// Set the crossfade length, clamped to `0..=10000` ms
    pub fn set_crossfade_ms(&mut self, ms: u32) {
        self.crossfade_ms = ms.min(MAX_CROSSFADE_MS);
    }

    /// Crossfade is on only for gapless playback with a non-zero length
    pub fn crossfade_enabled(&self) -> bool {
        self.gapless_playback && self.crossfade_ms > 0
    }

    pub fn crossfade_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.crossfade_ms))
    }

    /// Re-apply value ranges (after loading from storage or user input)
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.set_crossfade_ms(self.crossfade_ms);
        self
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio_quality: AudioQuality::Highest,
            preload_next: true,
            gapless_playback: true,
            crossfade_ms: 1000,
        }
    }
}

fn deserialize_crossfade<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, i64::from(MAX_CROSSFADE_MS)) as u32)
}

/// Session-only orchestrator tuning
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Consecutive load failures before giving up (also capped by queue length)
    pub max_consecutive_failures: usize,

    /// Minimum spacing between forwarded position updates
    pub position_throttle: Duration,

    /// Position jumps larger than this are forwarded immediately
    pub position_jump: Duration,

    /// Ask the catalog for related tracks when the last queue entry starts
    pub auto_extend_queue: bool,

    /// Offset for relative seeks when the platform does not supply one
    pub seek_step: Duration,

    /// Application name used in window titles
    pub app_name: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            position_throttle: Duration::from_millis(500),
            position_jump: Duration::from_millis(1500),
            auto_extend_queue: true,
            seek_step: Duration::from_secs(10),
            app_name: "Tune".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.audio_quality, AudioQuality::Highest);
        assert!(config.preload_next);
        assert!(config.gapless_playback);
        assert_eq!(config.crossfade_ms, 1000);
        assert!(config.crossfade_enabled());
    }

    #[test]
    fn crossfade_clamped() {
        let mut config = PlayerConfig::default();
        config.set_crossfade_ms(60_000);
        assert_eq!(config.crossfade_ms, MAX_CROSSFADE_MS);

        let loaded: PlayerConfig = serde_json::from_str(r#"{"crossfade_ms": -5}"#).unwrap();
        assert_eq!(loaded.crossfade_ms, 0);
        let loaded: PlayerConfig = serde_json::from_str(r#"{"crossfade_ms": 99999}"#).unwrap();
        assert_eq!(loaded.crossfade_ms, MAX_CROSSFADE_MS);
    }

    #[test]
    fn crossfade_requires_gapless() {
        let config = PlayerConfig {
            gapless_playback: false,
            ..PlayerConfig::default()
        };
        assert!(!config.crossfade_enabled());

        let config = PlayerConfig {
            crossfade_ms: 0,
            ..PlayerConfig::default()
        };
        assert!(!config.crossfade_enabled());
    }

    #[test]
    fn partial_document_uses_defaults() {
        let loaded: PlayerConfig = serde_json::from_str(r#"{"audio_quality": "low"}"#).unwrap();
        assert_eq!(loaded.audio_quality, AudioQuality::Low);
        assert!(loaded.preload_next);
        assert_eq!(loaded.crossfade_ms, 1000);
    }

    #[test]
    fn reset() {
        let mut config = PlayerConfig {
            audio_quality: AudioQuality::Low,
            preload_next: false,
            gapless_playback: false,
            crossfade_ms: 0,
        };
        config.reset_to_defaults();
        assert_eq!(config, PlayerConfig::default());
    }
}
