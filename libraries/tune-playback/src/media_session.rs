//! Media-session bridge
//!
//! Projects player state onto an OS-level media session (lock screen,
//! hardware media keys, notification controls) and turns the session's
//! action callbacks into [`TransportCommand`]s.
//!
//! Support is optional: a bridge without a platform turns every call into a
//! silent no-op. Individual platform failures are logged and never
//! propagated; the player must keep working when the OS surface does not.

use crate::error::PlatformError;
use crate::types::TransportState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tune_core::{secure_url, Track};

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";
const MAX_ARTISTS: usize = 3;

/// Actions a media session can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaAction {
    Play,
    Pause,
    Stop,
    NextTrack,
    PreviousTrack,
    SeekTo,
    SeekForward,
    SeekBackward,
}

impl MediaAction {
    /// Every action the bridge registers
    pub const ALL: [MediaAction; 8] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::Stop,
        MediaAction::NextTrack,
        MediaAction::PreviousTrack,
        MediaAction::SeekTo,
        MediaAction::SeekForward,
        MediaAction::SeekBackward,
    ];
}

/// Extra data delivered with an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionDetails {
    /// Absolute target for `SeekTo`
    pub seek_time: Option<Duration>,
    /// Offset for `SeekForward`/`SeekBackward`
    pub seek_offset: Option<Duration>,
}

/// Callback registered for one action
pub type ActionHandler = Arc<dyn Fn(ActionDetails) + Send + Sync>;

/// Player command produced by a media-session action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    SeekTo(Duration),
    SeekForward(Duration),
    SeekBackward(Duration),
}

/// Artwork entry in published metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    pub mime_type: String,
}

impl Artwork {
    pub fn new(src: impl Into<String>, sizes: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            sizes: sizes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Now-playing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Vec<Artwork>,
}

/// Position state (for scrubbers on lock screens)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub duration: Duration,
    pub position: Duration,
    pub playback_rate: f64,
}

impl PositionState {
    /// Position clamped into `[0, duration]` at normal rate
    pub fn new(position: Duration, duration: Duration) -> Self {
        Self {
            duration,
            position: position.min(duration),
            playback_rate: 1.0,
        }
    }
}

/// OS media-session surface
pub trait MediaSessionPlatform {
    /// Publish (or clear, with `None`) the now-playing metadata
    fn set_metadata(&mut self, metadata: Option<&MediaMetadata>) -> Result<(), PlatformError>;

    fn set_playback_state(&mut self, state: TransportState) -> Result<(), PlatformError>;

    /// Whether `set_position_state` is implemented
    fn supports_position_state(&self) -> bool {
        true
    }

    fn set_position_state(&mut self, state: &PositionState) -> Result<(), PlatformError>;

    /// Register (`Some`) or unregister (`None`) the handler for `action`
    fn set_action_handler(
        &mut self,
        action: MediaAction,
        handler: Option<ActionHandler>,
    ) -> Result<(), PlatformError>;

    /// Update the window/document title. Not every platform has one.
    fn set_window_title(&mut self, _title: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}

/// Bridge behaviour settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSessionConfig {
    /// Name used in window titles
    pub app_name: String,
    /// Artwork always appended to published metadata
    pub fallback_artwork: Artwork,
    /// Offset for relative seeks when the platform does not send one
    pub seek_step: Duration,
}

impl Default for MediaSessionConfig {
    fn default() -> Self {
        Self {
            app_name: "Tune".to_string(),
            fallback_artwork: Artwork::new("/logo.png", "512x512", "image/png"),
            seek_step: Duration::from_secs(10),
        }
    }
}

/// Map a catalog image quality tag to an artwork size string
fn artwork_size(quality: &str) -> &'static str {
    match quality {
        "50x50" => "50x50",
        "150x150" => "150x150",
        "500x500" => "500x500",
        _ => "512x512",
    }
}

/// Build now-playing metadata for `track` with the usual fallbacks
pub fn build_metadata(track: &Track, fallback_artwork: &Artwork) -> MediaMetadata {
    let title = match track.name.trim() {
        "" => UNKNOWN_TITLE.to_string(),
        name => name.to_string(),
    };
    let artist = track
        .artist_line(MAX_ARTISTS)
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let album = track
        .album
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_ALBUM)
        .to_string();

    let mut artwork: Vec<Artwork> = track
        .images
        .iter()
        .filter(|image| !image.url.trim().is_empty())
        .map(|image| Artwork::new(secure_url(&image.url), artwork_size(&image.quality), "image/jpeg"))
        .collect();
    artwork.push(fallback_artwork.clone());

    MediaMetadata {
        title,
        artist,
        album,
        artwork,
    }
}

/// Bridge between the orchestrator and an optional OS media session
pub struct MediaSessionBridge {
    platform: Option<Box<dyn MediaSessionPlatform>>,
    config: MediaSessionConfig,
    attached: bool,
}

impl MediaSessionBridge {
    pub fn new(platform: Option<Box<dyn MediaSessionPlatform>>, config: MediaSessionConfig) -> Self {
        if platform.is_none() {
            debug!("Media session unsupported; OS controls disabled");
        }
        Self {
            platform,
            config,
            attached: false,
        }
    }

    /// Bridge for environments without a media session
    pub fn unsupported() -> Self {
        Self::new(None, MediaSessionConfig::default())
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_some()
    }

    pub fn config(&self) -> &MediaSessionConfig {
        &self.config
    }

    /// Publish metadata and window title for `track`.
    ///
    /// If the platform rejects the full metadata, a minimal version without
    /// artwork is tried once.
    pub fn publish_track(&mut self, track: &Track) {
        let Some(platform) = self.platform.as_mut() else {
            return;
        };

        let metadata = build_metadata(track, &self.config.fallback_artwork);
        if let Err(e) = platform.set_metadata(Some(&metadata)) {
            warn!(track_id = %track.id, error = %e, "Full metadata rejected, retrying minimal");
            let minimal = MediaMetadata {
                artwork: Vec::new(),
                ..metadata.clone()
            };
            if let Err(e) = platform.set_metadata(Some(&minimal)) {
                warn!(track_id = %track.id, error = %e, "Minimal metadata rejected");
            }
        }

        let title = format!("{} - {} | {}", metadata.title, metadata.artist, self.config.app_name);
        log_failure("set_window_title", platform.set_window_title(&title));
    }

    /// Clear metadata and reset the window title
    pub fn clear_track(&mut self) {
        let default_title = self.default_title();
        let Some(platform) = self.platform.as_mut() else {
            return;
        };
        log_failure("set_metadata", platform.set_metadata(None));
        log_failure("set_window_title", platform.set_window_title(&default_title));
    }

    pub fn publish_transport(&mut self, state: TransportState) {
        if let Some(platform) = self.platform.as_mut() {
            log_failure("set_playback_state", platform.set_playback_state(state));
        }
    }

    /// Publish the playhead. Skipped while the duration is unknown.
    pub fn publish_position(&mut self, position: Duration, duration: Option<Duration>) {
        let Some(platform) = self.platform.as_mut() else {
            return;
        };
        let Some(duration) = duration else {
            return;
        };
        if !platform.supports_position_state() {
            return;
        }
        log_failure(
            "set_position_state",
            platform.set_position_state(&PositionState::new(position, duration)),
        );
    }

    /// Register handlers for every [`MediaAction`], each forwarding a
    /// [`TransportCommand`] to `dispatch`.
    ///
    /// Actions are registered independently; one failing does not prevent
    /// the others.
    pub fn attach<F>(&mut self, dispatch: F)
    where
        F: Fn(TransportCommand) + Send + Sync + 'static,
    {
        let seek_step = self.config.seek_step;
        let Some(platform) = self.platform.as_mut() else {
            return;
        };

        let dispatch = Arc::new(dispatch);
        for action in MediaAction::ALL {
            let dispatch = Arc::clone(&dispatch);
            let handler: ActionHandler = Arc::new(move |details: ActionDetails| {
                if let Some(command) = command_for(action, details, seek_step) {
                    dispatch(command);
                }
            });
            if let Err(e) = platform.set_action_handler(action, Some(handler)) {
                log_action_failure(action, &e);
            }
        }
        self.attached = true;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Tear down everything this bridge published or registered
    pub fn cleanup(&mut self) {
        let default_title = self.default_title();
        let Some(platform) = self.platform.as_mut() else {
            return;
        };

        let _ = platform.set_metadata(None);
        for action in MediaAction::ALL {
            let _ = platform.set_action_handler(action, None);
        }
        let _ = platform.set_playback_state(TransportState::None);
        if platform.supports_position_state() {
            let _ = platform.set_position_state(&PositionState::new(Duration::ZERO, Duration::ZERO));
        }
        let _ = platform.set_window_title(&default_title);
        self.attached = false;
        debug!("Media session cleaned up");
    }

    fn default_title(&self) -> String {
        format!("{} - Music Player", self.config.app_name)
    }
}

impl std::fmt::Debug for MediaSessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSessionBridge")
            .field("supported", &self.is_supported())
            .field("attached", &self.attached)
            .field("config", &self.config)
            .finish()
    }
}

fn command_for(action: MediaAction, details: ActionDetails, seek_step: Duration) -> Option<TransportCommand> {
    let offset = details.seek_offset.unwrap_or(seek_step);
    Some(match action {
        MediaAction::Play => TransportCommand::Play,
        MediaAction::Pause => TransportCommand::Pause,
        MediaAction::Stop => TransportCommand::Stop,
        MediaAction::NextTrack => TransportCommand::Next,
        MediaAction::PreviousTrack => TransportCommand::Previous,
        MediaAction::SeekTo => TransportCommand::SeekTo(details.seek_time?),
        MediaAction::SeekForward => TransportCommand::SeekForward(offset),
        MediaAction::SeekBackward => TransportCommand::SeekBackward(offset),
    })
}

fn log_failure(call: &str, result: Result<(), PlatformError>) {
    match result {
        Ok(()) => {}
        Err(PlatformError::Unsupported(what)) => debug!(call, what = %what, "Media session call unsupported"),
        Err(e) => warn!(call, error = %e, "Media session call failed"),
    }
}

fn log_action_failure(action: MediaAction, error: &PlatformError) {
    match error {
        PlatformError::Unsupported(_) => debug!(?action, "Media action unsupported"),
        other => warn!(?action, error = %other, "Failed to register media action"),
    }
}
