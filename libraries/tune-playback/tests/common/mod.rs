//! Shared test helpers: a scriptable in-memory audio backend and track builders

#![allow(dead_code)]

use futures::future;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tune_core::{DownloadVariant, Track};
use tune_playback::{
    ActionHandler, AudioBackend, AudioUnit, BackendError, MediaAction, MediaMetadata, MediaSessionPlatform,
    OpenFuture, Orchestrator, PlatformError, PositionState, Task, TransportState,
};

/// Observable state of one mock unit
#[derive(Debug, Clone)]
pub struct UnitState {
    pub url: String,
    pub playing: bool,
    pub stopped: bool,
    pub finished: bool,
    pub buffering: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
}

/// Unit handle shared between the engine and the test
#[derive(Debug, Clone)]
pub struct MockUnit(pub Rc<RefCell<UnitState>>);

impl AudioUnit for MockUnit {
    fn play(&mut self) -> Result<(), BackendError> {
        let mut s = self.0.borrow_mut();
        if s.stopped {
            return Err(BackendError::Output("unit released".into()));
        }
        s.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.0.borrow_mut().playing = false;
    }

    fn stop(&mut self) {
        let mut s = self.0.borrow_mut();
        s.playing = false;
        s.stopped = true;
    }

    fn seek(&mut self, position: Duration) -> Result<(), BackendError> {
        let mut s = self.0.borrow_mut();
        s.position = position;
        s.finished = false;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.borrow_mut().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.0.borrow().volume
    }

    fn position(&self) -> Duration {
        self.0.borrow().position
    }

    fn duration(&self) -> Option<Duration> {
        self.0.borrow().duration
    }

    fn is_playing(&self) -> bool {
        self.0.borrow().playing
    }

    fn is_finished(&self) -> bool {
        self.0.borrow().finished
    }

    fn is_buffering(&self) -> bool {
        self.0.borrow().buffering
    }
}

/// Backend that opens every URL instantly.
///
/// URLs containing `broken` fail to open. Every opened unit is recorded so
/// tests can inspect and drive it (advance position, mark finished).
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub opened: Rc<RefCell<Vec<MockUnit>>>,
    pub durations: Rc<RefCell<HashMap<String, Duration>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `open` calls that succeeded
    pub fn open_count(&self) -> usize {
        self.opened.borrow().len()
    }

    /// Most recently opened unit whose URL contains `needle`
    pub fn unit_for(&self, needle: &str) -> Option<MockUnit> {
        self.opened
            .borrow()
            .iter()
            .rev()
            .find(|u| u.0.borrow().url.contains(needle))
            .cloned()
    }

    pub fn set_duration(&self, needle: &str, duration: Duration) {
        self.durations.borrow_mut().insert(needle.to_string(), duration);
    }
}

impl AudioBackend for MockBackend {
    type Unit = MockUnit;

    fn open(&self, url: &str) -> OpenFuture<MockUnit> {
        if url.contains("broken") {
            return Box::pin(future::ready(Err(BackendError::Fetch(format!("404 for {url}")))));
        }

        let duration = self
            .durations
            .borrow()
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
            .map(|(_, d)| *d)
            .unwrap_or(Duration::from_secs(180));

        let unit = MockUnit(Rc::new(RefCell::new(UnitState {
            url: url.to_string(),
            playing: false,
            stopped: false,
            finished: false,
            buffering: false,
            position: Duration::ZERO,
            duration: Some(duration),
            volume: 1.0,
        })));
        self.opened.borrow_mut().push(unit.clone());
        Box::pin(future::ready(Ok(unit)))
    }
}

/// Playable track with a single download variant at `http://cdn.test/<id>.mp4`
pub fn track(id: &str) -> Track {
    Track::new(id, format!("Song {id}"))
        .with_artist("Test Artist")
        .with_download(DownloadVariant::new("320kbps", format!("http://cdn.test/{id}.mp4")))
}

/// Track whose only URL fails to open
pub fn broken_track(id: &str) -> Track {
    Track::new(id, format!("Broken {id}"))
        .with_download(DownloadVariant::new("320kbps", format!("https://cdn.test/broken-{id}.mp4")))
}

/// Track with no usable URL at all
pub fn unplayable_track(id: &str) -> Track {
    Track::new(id, format!("Unplayable {id}")).with_download(DownloadVariant::new("320kbps", ""))
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

/// Run every queued load and preload to completion, repeatedly, until the
/// orchestrator stops asking. Other tasks are returned for inspection.
pub fn settle(orchestrator: &mut Orchestrator<MockBackend>) -> Vec<Task<MockUnit>> {
    let mut other = Vec::new();
    loop {
        let tasks = orchestrator.take_tasks();
        if tasks.is_empty() {
            return other;
        }
        for task in tasks {
            match task {
                Task::Load(pending) => {
                    let result = futures::executor::block_on(pending.future);
                    orchestrator.on_load_finished(pending.ticket, result);
                }
                Task::Preload(pending) => {
                    let result = futures::executor::block_on(pending.future);
                    orchestrator.on_preload_finished(pending.ticket, result);
                }
                task => other.push(task),
            }
        }
    }
}

/// One call made on the media-session platform
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Metadata(Option<MediaMetadata>),
    State(TransportState),
    Position(PositionState),
    Handler(MediaAction, bool),
    Title(String),
}

/// Media-session platform that records every call
#[derive(Clone, Default)]
pub struct RecordingPlatform {
    pub calls: Rc<RefCell<Vec<MediaCall>>>,
    pub handlers: Rc<RefCell<HashMap<MediaAction, ActionHandler>>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.borrow().clone()
    }

    pub fn last_state(&self) -> Option<TransportState> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            MediaCall::State(state) => Some(*state),
            _ => None,
        })
    }

    pub fn last_title(&self) -> Option<String> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            MediaCall::Title(title) => Some(title.clone()),
            _ => None,
        })
    }

    pub fn handler(&self, action: MediaAction) -> Option<ActionHandler> {
        self.handlers.borrow().get(&action).cloned()
    }
}

impl MediaSessionPlatform for RecordingPlatform {
    fn set_metadata(&mut self, metadata: Option<&MediaMetadata>) -> Result<(), PlatformError> {
        self.calls.borrow_mut().push(MediaCall::Metadata(metadata.cloned()));
        Ok(())
    }

    fn set_playback_state(&mut self, state: TransportState) -> Result<(), PlatformError> {
        self.calls.borrow_mut().push(MediaCall::State(state));
        Ok(())
    }

    fn set_position_state(&mut self, state: &PositionState) -> Result<(), PlatformError> {
        self.calls.borrow_mut().push(MediaCall::Position(*state));
        Ok(())
    }

    fn set_action_handler(&mut self, action: MediaAction, handler: Option<ActionHandler>) -> Result<(), PlatformError> {
        self.calls.borrow_mut().push(MediaCall::Handler(action, handler.is_some()));
        match handler {
            Some(handler) => self.handlers.borrow_mut().insert(action, handler),
            None => self.handlers.borrow_mut().remove(&action),
        };
        Ok(())
    }

    fn set_window_title(&mut self, title: &str) -> Result<(), PlatformError> {
        self.calls.borrow_mut().push(MediaCall::Title(title.to_string()));
        Ok(())
    }
}

/// Drain everything currently buffered on a player event receiver
pub fn drain<E: Clone>(rx: &mut tokio::sync::broadcast::Receiver<E>) -> Vec<E> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
