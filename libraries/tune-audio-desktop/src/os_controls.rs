//! OS media controls through souvlaki
//!
//! MPRIS on Linux, SMTC on Windows, Now Playing on macOS. souvlaki takes a
//! single event callback, so handlers registered by the bridge are kept in a
//! shared map that the callback dispatches into.

use crate::error::AudioError;
use souvlaki::{
    MediaControlEvent, MediaControls, MediaMetadata as OsMetadata, MediaPlayback, MediaPosition, PlatformConfig,
    SeekDirection,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use tune_playback::{
    ActionDetails, ActionHandler, MediaAction, MediaMetadata, MediaSessionPlatform, PlatformError, PositionState,
    TransportState,
};

type HandlerMap = Arc<Mutex<HashMap<MediaAction, ActionHandler>>>;

/// [`MediaSessionPlatform`] backed by the operating system's media controls
pub struct SouvlakiPlatform {
    controls: MediaControls,
    handlers: HandlerMap,
    playing: Arc<AtomicBool>,
    state: TransportState,
    position: Option<Duration>,
}

impl SouvlakiPlatform {
    /// Register with the OS under `dbus_name` (Linux) and `display_name`
    pub fn new(dbus_name: &str, display_name: &str) -> crate::Result<Self> {
        let config = PlatformConfig {
            dbus_name,
            display_name,
            hwnd: None,
        };
        let mut controls =
            MediaControls::new(config).map_err(|e| AudioError::Controls(format!("{e:?}")))?;

        let handlers: HandlerMap = Arc::default();
        let playing = Arc::new(AtomicBool::new(false));
        {
            let handlers = Arc::clone(&handlers);
            let playing = Arc::clone(&playing);
            controls
                .attach(move |event| dispatch(&handlers, &playing, event))
                .map_err(|e| AudioError::Controls(format!("{e:?}")))?;
        }

        Ok(Self {
            controls,
            handlers,
            playing,
            state: TransportState::None,
            position: None,
        })
    }

    fn publish_playback(&mut self) -> Result<(), PlatformError> {
        let progress = self.position.map(MediaPosition);
        let playback = match self.state {
            TransportState::Playing => MediaPlayback::Playing { progress },
            TransportState::Paused => MediaPlayback::Paused { progress },
            TransportState::None => MediaPlayback::Stopped,
        };
        self.controls.set_playback(playback).map_err(failed)
    }
}

impl std::fmt::Debug for SouvlakiPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SouvlakiPlatform")
            .field("state", &self.state)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

fn failed<E: std::fmt::Debug>(err: E) -> PlatformError {
    PlatformError::Failed(format!("{err:?}"))
}

/// Translate one OS event into a registered handler call
fn dispatch(handlers: &HandlerMap, playing: &AtomicBool, event: MediaControlEvent) {
    let (action, details) = match event {
        MediaControlEvent::Play => (MediaAction::Play, ActionDetails::default()),
        MediaControlEvent::Pause => (MediaAction::Pause, ActionDetails::default()),
        MediaControlEvent::Toggle if playing.load(Ordering::Relaxed) => (MediaAction::Pause, ActionDetails::default()),
        MediaControlEvent::Toggle => (MediaAction::Play, ActionDetails::default()),
        MediaControlEvent::Next => (MediaAction::NextTrack, ActionDetails::default()),
        MediaControlEvent::Previous => (MediaAction::PreviousTrack, ActionDetails::default()),
        MediaControlEvent::Stop => (MediaAction::Stop, ActionDetails::default()),
        MediaControlEvent::SetPosition(MediaPosition(position)) => (
            MediaAction::SeekTo,
            ActionDetails {
                seek_time: Some(position),
                seek_offset: None,
            },
        ),
        MediaControlEvent::Seek(direction) => (seek_action(direction), ActionDetails::default()),
        MediaControlEvent::SeekBy(direction, offset) => (
            seek_action(direction),
            ActionDetails {
                seek_time: None,
                seek_offset: Some(offset),
            },
        ),
        other => {
            debug!(?other, "Ignoring media control event");
            return;
        }
    };

    let handler = handlers
        .lock()
        .ok()
        .and_then(|map| map.get(&action).cloned());
    match handler {
        Some(handler) => handler(details),
        None => debug!(?action, "No handler registered"),
    }
}

fn seek_action(direction: SeekDirection) -> MediaAction {
    match direction {
        SeekDirection::Forward => MediaAction::SeekForward,
        SeekDirection::Backward => MediaAction::SeekBackward,
    }
}

impl MediaSessionPlatform for SouvlakiPlatform {
    fn set_metadata(&mut self, metadata: Option<&MediaMetadata>) -> Result<(), PlatformError> {
        let Some(metadata) = metadata else {
            return self.controls.set_metadata(OsMetadata::default()).map_err(failed);
        };
        let cover_url = metadata.artwork.first().map(|a| a.src.as_str());
        self.controls
            .set_metadata(OsMetadata {
                title: Some(metadata.title.as_str()),
                artist: Some(metadata.artist.as_str()),
                album: Some(metadata.album.as_str()),
                cover_url,
                duration: None,
            })
            .map_err(failed)
    }

    fn set_playback_state(&mut self, state: TransportState) -> Result<(), PlatformError> {
        self.state = state;
        self.playing
            .store(state == TransportState::Playing, Ordering::Relaxed);
        if state == TransportState::None {
            self.position = None;
        }
        self.publish_playback()
    }

    fn set_position_state(&mut self, state: &PositionState) -> Result<(), PlatformError> {
        self.position = Some(state.position);
        self.publish_playback()
    }

    fn set_action_handler(
        &mut self,
        action: MediaAction,
        handler: Option<ActionHandler>,
    ) -> Result<(), PlatformError> {
        let mut map = self
            .handlers
            .lock()
            .map_err(|_| PlatformError::Failed("handler map poisoned".into()))?;
        match handler {
            Some(handler) => map.insert(action, handler),
            None => map.remove(&action),
        };
        Ok(())
    }
}
