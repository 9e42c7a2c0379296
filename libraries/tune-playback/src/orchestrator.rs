//! Playback orchestrator
//!
//! Owns the queue, the engine adapter, the sleep timer and the media-session
//! bridge, and keeps them consistent. It is a synchronous state machine:
//! anything asynchronous (loading audio, asking the catalog for related
//! tracks, recording history) is queued as a [`Task`] that the runtime
//! executes and feeds back through `on_*` methods.
//!
//! The canonical transition is "the queue's current track changed": after
//! every queue mutation the orchestrator compares the queue's current track
//! with the track the engine holds and loads when they differ.

use crate::config::{OrchestratorSettings, PlayerConfig};
use crate::engine::{AudioBackend, AudioEngine, LoadOutcome, LoadTicket, PendingLoad};
use crate::error::{BackendError, LoadError, PlaybackError, Result};
use crate::events::{EngineEvent, EventBus, PlayerEvent};
use crate::media_session::{MediaSessionBridge, TransportCommand};
use crate::queue::{Queue, QueueSnapshot};
use crate::sleep_timer::SleepTimer;
use crate::throttle::PositionThrottle;
use crate::types::{PlayerState, PlayerStatus, TransportState};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tune_core::{PlayRecord, RepeatMode, Track, TrackId};

/// Asynchronous work requested by the orchestrator
pub enum Task<U> {
    /// Await and report back through [`Orchestrator::on_load_finished`]
    Load(PendingLoad<U>),
    /// Await and report back through [`Orchestrator::on_preload_finished`]
    Preload(PendingLoad<U>),
    /// Ask the catalog, report back through [`Orchestrator::on_related_fetched`]
    FetchRelated { track_id: TrackId },
    /// Fire and forget
    RecordPlay(PlayRecord),
}

impl<U> std::fmt::Debug for Task<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(p) => f.debug_tuple("Load").field(p).finish(),
            Self::Preload(p) => f.debug_tuple("Preload").field(p).finish(),
            Self::FetchRelated { track_id } => f.debug_struct("FetchRelated").field("track_id", track_id).finish(),
            Self::RecordPlay(r) => f.debug_tuple("RecordPlay").field(&r.track.id).finish(),
        }
    }
}

/// Coordinates queue, engine, sleep timer and media session
pub struct Orchestrator<B: AudioBackend> {
    queue: Queue,
    engine: AudioEngine<B>,
    sleep_timer: SleepTimer,
    media: MediaSessionBridge,
    config: PlayerConfig,
    settings: OrchestratorSettings,

    state: PlayerState,
    /// Track the engine holds or is loading
    loaded: Option<Track>,
    autoplay: bool,
    play_recorded: bool,
    consecutive_failures: usize,
    /// Went idle because the last track ended with nothing after it
    queue_exhausted: bool,
    related_requested: Option<TrackId>,
    throttle: PositionThrottle,
    muted: bool,
    volume_before_mute: f32,
    /// Time of the last tick
    clock: Instant,

    queue_dirty: bool,
    config_dirty: bool,
    tasks: Vec<Task<B::Unit>>,
    events: EventBus<PlayerEvent>,
}

impl<B: AudioBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        let settings = OrchestratorSettings::default();
        Self {
            queue: Queue::new(),
            engine: AudioEngine::new(backend),
            sleep_timer: SleepTimer::new(),
            media: MediaSessionBridge::unsupported(),
            config: PlayerConfig::default(),
            throttle: PositionThrottle::new(settings.position_throttle, settings.position_jump),
            settings,
            state: PlayerState::Idle,
            loaded: None,
            autoplay: true,
            play_recorded: false,
            consecutive_failures: 0,
            queue_exhausted: false,
            related_requested: None,
            muted: false,
            volume_before_mute: 1.0,
            clock: Instant::now(),
            queue_dirty: false,
            config_dirty: false,
            tasks: Vec::new(),
            events: EventBus::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config.sanitized();
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.throttle = PositionThrottle::new(settings.position_throttle, settings.position_jump);
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_media_session(mut self, media: MediaSessionBridge) -> Self {
        self.media = media;
        self
    }

    /// Replace the queue (e.g. a seeded one for deterministic shuffle)
    #[must_use]
    pub fn with_queue(mut self, queue: Queue) -> Self {
        self.queue = queue;
        self
    }

    // ===== Accessors =====

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn engine(&self) -> &AudioEngine<B> {
        &self.engine
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn sleep_timer(&self) -> &SleepTimer {
        &self.sleep_timer
    }

    pub fn media_session_mut(&mut self) -> &mut MediaSessionBridge {
        &mut self.media
    }

    /// Track the engine holds or is loading
    pub fn loaded_track(&self) -> Option<&Track> {
        self.loaded.as_ref()
    }

    pub fn events(&self) -> &EventBus<PlayerEvent> {
        &self.events
    }

    /// Take queued asynchronous work
    pub fn take_tasks(&mut self) -> Vec<Task<B::Unit>> {
        std::mem::take(&mut self.tasks)
    }

    /// Whether the queue changed since the last call
    pub fn take_queue_dirty(&mut self) -> bool {
        std::mem::take(&mut self.queue_dirty)
    }

    /// Whether the config changed since the last call
    pub fn take_config_dirty(&mut self) -> bool {
        std::mem::take(&mut self.config_dirty)
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.state,
            current_track_id: self.queue.current_track().map(|t| t.id.clone()),
            current_index: self.queue.current_index(),
            queue_len: self.queue.len(),
            position: self.engine.current_time(),
            duration: self.engine.duration(),
            volume: self.engine.volume(),
            muted: self.muted,
            shuffle: self.queue.shuffle(),
            repeat: self.queue.repeat(),
            sleep_timer: self.sleep_timer.display(),
        }
    }

    // ===== Queue operations =====

    /// Replace the queue and start playing its first track
    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        self.consecutive_failures = 0;
        let prev = self.current_id();
        self.queue.set_queue(tracks);
        self.sync_current_track(prev, true);
    }

    /// Append tracks not already queued. Returns how many were added.
    pub fn add_to_queue(&mut self, tracks: Vec<Track>) -> usize {
        let prev = self.current_id();
        let added = self.queue.add_to_queue(tracks);
        if added > 0 {
            self.sync_current_track(prev, false);
        }
        added
    }

    pub fn remove_from_queue(&mut self, index: usize) {
        let prev = self.current_id();
        if self.queue.remove_from_queue(index).is_some() {
            self.sync_current_track(prev, false);
        }
    }

    pub fn move_queue_item(&mut self, from: usize, to: usize) {
        let prev = self.current_id();
        if self.queue.move_queue_item(from, to) {
            self.sync_current_track(prev, false);
        }
    }

    pub fn clear_queue(&mut self) {
        let prev = self.current_id();
        self.queue.clear_queue();
        self.sync_current_track(prev, false);
    }

    pub fn shuffle_queue(&mut self) {
        let prev = self.current_id();
        self.queue.shuffle_queue();
        self.sync_current_track(prev, false);
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.queue.set_shuffle(enabled);
        self.after_mode_change();
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.queue.set_repeat(mode);
        self.after_mode_change();
    }

    /// Play the track at `index`.
    ///
    /// Selecting the track that is already loaded does not reload it; a
    /// paused track resumes instead.
    pub fn play_index(&mut self, index: usize) {
        if index >= self.queue.len() {
            return;
        }
        self.consecutive_failures = 0;
        let prev = self.current_id();
        if self.queue.set_current_index(index) {
            self.sync_current_track(prev, true);
        } else if let Err(e) = self.play() {
            debug!(error = %e, "Nothing to resume");
        }
    }

    /// Restore a persisted queue without starting playback
    pub fn restore_queue(&mut self, snapshot: QueueSnapshot) {
        self.queue.restore(snapshot);
        self.emit_queue_changed();
        self.emit(PlayerEvent::ModesChanged {
            shuffle: self.queue.shuffle(),
            repeat: self.queue.repeat(),
        });
    }

    // ===== Transport =====

    /// Start or resume playback
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Playing => Ok(()),
            PlayerState::Loading => {
                self.autoplay = true;
                Ok(())
            }
            PlayerState::Paused | PlayerState::Ended if self.engine.current_track_id().is_some() => {
                let result = self.engine.play();
                self.pump_engine_events(self.clock);
                result
            }
            _ => {
                if self.queue.current_track().is_none() {
                    return Err(PlaybackError::NothingLoaded);
                }
                self.load_current(true);
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) {
        match self.state {
            PlayerState::Playing => {
                self.engine.pause();
                self.pump_engine_events(self.clock);
            }
            PlayerState::Loading => self.autoplay = false,
            _ => {}
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if self.state.is_active() && self.autoplay {
            self.pause();
        } else if let Err(e) = self.play() {
            debug!(error = %e, "Nothing to play");
        }
    }

    /// Stop and release audio; the queue and its position are kept
    pub fn stop(&mut self) {
        self.queue_exhausted = false;
        self.engine.stop();
        self.engine.clear_preload();
        self.pump_engine_events(self.clock);
        self.loaded = None;
        self.set_state(PlayerState::Idle);
        self.media.publish_transport(TransportState::None);
        self.media.publish_position(Duration::ZERO, Some(Duration::ZERO));
    }

    /// Skip forward. At the end of a non-repeating queue nothing happens.
    pub fn next(&mut self) {
        self.consecutive_failures = 0;
        let prev = self.current_id();
        match self.queue.advance_next().map(|t| t.id.clone()) {
            Some(id) if prev.as_ref() == Some(&id) => self.restart_current(),
            Some(_) => self.sync_current_track(prev, true),
            None => debug!("Already at the end of the queue"),
        }
    }

    /// Skip backward. At the start of a non-repeating queue nothing happens.
    pub fn previous(&mut self) {
        self.consecutive_failures = 0;
        let prev = self.current_id();
        match self.queue.advance_previous().map(|t| t.id.clone()) {
            Some(id) if prev.as_ref() == Some(&id) => self.restart_current(),
            Some(_) => self.sync_current_track(prev, true),
            None => debug!("Already at the start of the queue"),
        }
    }

    pub fn seek(&mut self, position: Duration) -> Result<()> {
        let result = self.engine.seek(position);
        self.pump_engine_events(self.clock);
        result
    }

    /// Seek relative to the playhead by a signed number of seconds
    pub fn seek_by(&mut self, delta_secs: f64) -> Result<()> {
        if !delta_secs.is_finite() {
            return Ok(());
        }
        let offset = Duration::from_secs_f64(delta_secs.abs());
        if delta_secs < 0.0 {
            self.seek_backward(offset)
        } else {
            self.seek_forward(offset)
        }
    }

    pub fn seek_forward(&mut self, offset: Duration) -> Result<()> {
        let target = self.engine.current_time() + offset;
        self.seek(target)
    }

    pub fn seek_backward(&mut self, offset: Duration) -> Result<()> {
        let target = self.engine.current_time().saturating_sub(offset);
        self.seek(target)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
        self.muted = false;
        self.emit_volume();
    }

    pub fn mute(&mut self) {
        if self.muted {
            return;
        }
        self.volume_before_mute = self.engine.volume();
        self.engine.set_volume(0.0);
        self.muted = true;
        self.emit_volume();
    }

    pub fn unmute(&mut self) {
        if !self.muted {
            return;
        }
        self.engine.set_volume(self.volume_before_mute);
        self.muted = false;
        self.emit_volume();
    }

    /// Dispatch a command coming from the OS media session
    pub fn handle_transport(&mut self, command: TransportCommand) {
        debug!(?command, "Media session command");
        let result = match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => {
                self.pause();
                Ok(())
            }
            TransportCommand::Stop => {
                self.stop();
                Ok(())
            }
            TransportCommand::Next => {
                self.next();
                Ok(())
            }
            TransportCommand::Previous => {
                self.previous();
                Ok(())
            }
            TransportCommand::SeekTo(position) => self.seek(position),
            TransportCommand::SeekForward(offset) => self.seek_forward(offset),
            TransportCommand::SeekBackward(offset) => self.seek_backward(offset),
        };
        if let Err(e) = result {
            debug!(?command, error = %e, "Media session command ignored");
        }
    }

    // ===== Sleep timer =====

    /// Arm the sleep timer (minutes take precedence; zero for both clears it)
    pub fn set_sleep_timer(&mut self, minutes: u32, songs: u32) {
        self.sleep_timer.set(minutes, songs);
        info!(minutes, songs, "Sleep timer set");
        self.emit_sleep_timer();
    }

    pub fn clear_sleep_timer(&mut self) {
        self.sleep_timer.clear();
        self.emit_sleep_timer();
    }

    /// One second of wall time elapsed
    pub fn on_sleep_tick(&mut self) {
        if !self.sleep_timer.is_active() {
            return;
        }
        self.sleep_timer.tick_second();
        self.emit_sleep_timer();
        if self.sleep_timer.should_stop_playback() {
            self.fire_sleep_timer();
        }
    }

    // ===== Config =====

    pub fn set_config(&mut self, config: PlayerConfig) {
        let config = config.sanitized();
        if config == self.config {
            return;
        }
        self.config = config;
        self.config_dirty = true;
        if self.config.preload_next {
            self.request_preload();
        } else {
            self.engine.clear_preload();
        }
    }

    // ===== Runtime inputs =====

    /// Apply a finished load
    pub fn on_load_finished(&mut self, ticket: LoadTicket, result: std::result::Result<B::Unit, BackendError>) {
        match self.engine.complete_load(ticket, result) {
            Ok(LoadOutcome::Superseded) => {}
            Ok(LoadOutcome::Loaded { .. }) => self.on_loaded(),
            Err(e) => self.on_load_failed(e),
        }
        self.pump_engine_events(self.clock);
    }

    /// Apply a finished preload
    pub fn on_preload_finished(&mut self, ticket: LoadTicket, result: std::result::Result<B::Unit, BackendError>) {
        self.engine.complete_preload(ticket, result);
        self.pump_engine_events(self.clock);
    }

    /// Apply the catalog's answer for related tracks.
    ///
    /// If the queue already ran out while the answer was in flight, playback
    /// continues into the new tracks.
    pub fn on_related_fetched(&mut self, track_id: &TrackId, result: tune_core::Result<Vec<Track>>) {
        match result {
            Ok(tracks) if tracks.is_empty() => debug!(%track_id, "No related tracks"),
            Ok(tracks) => {
                let added = self.add_to_queue(tracks);
                if added > 0 {
                    info!(%track_id, added, "Queue extended with related tracks");
                    self.emit(PlayerEvent::QueueExtended { added });
                    if self.queue_exhausted && self.current_id().as_ref() == Some(track_id) {
                        debug!(%track_id, "Continuing into related tracks");
                        self.next();
                    }
                }
            }
            Err(e) => warn!(%track_id, error = %e, "Fetching related tracks failed"),
        }
    }

    /// Drive the engine: time updates, end detection, crossfade
    pub fn tick(&mut self, now: Instant) {
        self.clock = now;
        self.engine.poll(now);
        self.pump_engine_events(now);
        self.maybe_crossfade(now);
    }

    /// Release everything: audio, sleep timer, media session
    pub fn shutdown(&mut self) {
        self.engine.destroy();
        self.loaded = None;
        self.sleep_timer.clear();
        self.media.cleanup();
        self.set_state(PlayerState::Idle);
        info!("Player shut down");
    }

    // ===== Internals =====

    fn current_id(&self) -> Option<TrackId> {
        self.queue.current_track().map(|t| t.id.clone())
    }

    fn loaded_id(&self) -> Option<&TrackId> {
        self.loaded.as_ref().map(|t| &t.id)
    }

    fn is_loaded(&self, track_id: &TrackId) -> bool {
        self.loaded_id() == Some(track_id)
    }

    /// React to the queue's current track possibly changing.
    ///
    /// `explicit` marks user selections (new queue, skip, jump) which load
    /// even from idle; incidental edits only reload an active player.
    fn sync_current_track(&mut self, prev: Option<TrackId>, explicit: bool) {
        self.queue_dirty = true;
        self.emit_queue_changed();

        match self.current_id() {
            None => {
                if self.loaded.is_some() || self.state != PlayerState::Idle {
                    self.engine.destroy();
                    self.pump_engine_events(self.clock);
                    self.loaded = None;
                    self.set_state(PlayerState::Idle);
                    self.media.publish_transport(TransportState::None);
                    self.media.clear_track();
                }
            }
            Some(id) if self.is_loaded(&id) => {
                self.request_preload();
                self.request_related();
            }
            Some(id) if explicit || self.loaded.is_some() => {
                let autoplay = explicit || self.state.is_active() || self.autoplay_after_edit();
                debug!(track_id = %id, previous = ?prev, "Current track changed");
                self.load_current(autoplay);
            }
            Some(_) => {}
        }
    }

    fn autoplay_after_edit(&self) -> bool {
        matches!(self.state, PlayerState::Ended | PlayerState::Error)
    }

    fn after_mode_change(&mut self) {
        self.queue_dirty = true;
        self.emit(PlayerEvent::ModesChanged {
            shuffle: self.queue.shuffle(),
            repeat: self.queue.repeat(),
        });
        if self.loaded.is_some() {
            self.request_preload();
            self.request_related();
        }
    }

    fn load_current(&mut self, autoplay: bool) {
        let Some(track) = self.queue.current_track().cloned() else {
            return;
        };

        let previous = self.loaded.take().map(|t| t.id);
        self.loaded = Some(track.clone());
        self.queue_exhausted = false;
        self.autoplay = autoplay;
        self.play_recorded = false;
        self.throttle.reset();
        self.set_state(PlayerState::Loading);
        info!(track_id = %track.id, name = %track.name, "Loading track");
        self.emit(PlayerEvent::TrackChanged {
            track_id: track.id.clone(),
            previous_track_id: previous,
        });

        match self.engine.begin_load(&track, self.config.audio_quality) {
            Ok(pending) => self.tasks.push(Task::Load(pending)),
            Err(e) => {
                self.pump_engine_events(self.clock);
                self.on_load_failed(e);
            }
        }
    }

    fn on_loaded(&mut self) {
        self.consecutive_failures = 0;
        let Some(track) = self.loaded.clone() else {
            return;
        };
        self.media.publish_track(&track);

        if self.autoplay {
            if let Err(e) = self.engine.play() {
                warn!(track_id = %track.id, error = %e, "Playback failed to start");
                self.set_state(PlayerState::Error);
            }
        } else {
            self.set_state(PlayerState::Paused);
            self.media.publish_transport(TransportState::Paused);
        }
        self.pump_engine_events(self.clock);

        self.request_preload();
        self.request_related();
    }

    fn on_load_failed(&mut self, error: LoadError) {
        warn!(track_id = %error.track_id(), error = %error, "Track failed to load");
        self.set_state(PlayerState::Error);
        self.emit(PlayerEvent::Error {
            track_id: error.track_id().clone(),
            message: error.to_string(),
        });

        self.consecutive_failures += 1;
        let cap = self
            .settings
            .max_consecutive_failures
            .min(self.queue.len())
            .max(1);
        if self.consecutive_failures >= cap {
            self.stall();
            return;
        }

        let prev = self.current_id();
        if self.queue.advance_after_failure().is_some() {
            self.queue_dirty = true;
            self.emit_queue_changed();
            debug!(previous = ?prev, failures = self.consecutive_failures, "Skipping to next track");
            self.load_current(true);
        } else {
            self.go_idle();
        }
    }

    fn stall(&mut self) {
        let failures = self.consecutive_failures;
        error!(failures, "Too many tracks failed to load; stopping playback");
        self.go_idle();
        self.media.clear_track();
        self.emit(PlayerEvent::PlaybackStalled { failures });
    }

    fn go_idle(&mut self) {
        self.consecutive_failures = 0;
        self.queue_exhausted = false;
        self.engine.stop();
        self.pump_engine_events(self.clock);
        self.loaded = None;
        self.set_state(PlayerState::Idle);
        self.media.publish_transport(TransportState::None);
    }

    fn restart_current(&mut self) {
        if self.engine.current_track_id().is_none() {
            self.load_current(true);
            return;
        }
        self.play_recorded = false;
        self.throttle.reset();
        let result = self
            .engine
            .seek(Duration::ZERO)
            .and_then(|()| self.engine.play());
        if let Err(e) = result {
            warn!(error = %e, "Restarting track failed");
        }
        self.pump_engine_events(self.clock);
    }

    fn on_track_ended(&mut self) {
        let Some(track_id) = self.loaded_id().cloned() else {
            return;
        };
        info!(%track_id, "Track ended");
        self.set_state(PlayerState::Ended);

        self.sleep_timer.on_track_ended();
        if self.sleep_timer.should_stop_playback() {
            self.fire_sleep_timer();
            return;
        }
        if self.sleep_timer.is_active() {
            self.emit_sleep_timer();
        }

        let prev = Some(track_id.clone());
        match self.queue.advance_next().map(|t| t.id.clone()) {
            Some(id) if id == track_id => self.restart_current(),
            Some(_) => self.sync_current_track(prev, true),
            None => {
                info!("Reached the end of the queue");
                self.go_idle();
                self.queue_exhausted = true;
            }
        }
    }

    fn fire_sleep_timer(&mut self) {
        info!("Sleep timer fired; stopping playback");
        if self.state == PlayerState::Playing {
            self.engine.pause();
            self.pump_engine_events(self.clock);
        }
        if self.state == PlayerState::Loading {
            self.autoplay = false;
        }
        self.media.publish_transport(TransportState::None);
        self.sleep_timer.clear();
        self.emit(PlayerEvent::SleepTimerFired);
        self.emit_sleep_timer();
    }

    fn request_preload(&mut self) {
        if !self.config.preload_next || self.state == PlayerState::Loading {
            return;
        }
        let Some(next) = self.queue.peek_next().and_then(|i| self.queue.get(i)).cloned() else {
            return;
        };
        if self.is_loaded(&next.id) {
            return;
        }
        if let Some(pending) = self.engine.begin_preload(&next, self.config.audio_quality) {
            self.tasks.push(Task::Preload(pending));
        }
    }

    fn request_related(&mut self) {
        if !self.settings.auto_extend_queue || !self.queue.is_at_last() {
            return;
        }
        let Some(track_id) = self.loaded_id().cloned() else {
            return;
        };
        if self.related_requested.as_ref() == Some(&track_id) {
            return;
        }
        debug!(%track_id, "Requesting related tracks");
        self.related_requested = Some(track_id.clone());
        self.tasks.push(Task::FetchRelated { track_id });
    }

    fn maybe_crossfade(&mut self, now: Instant) {
        if self.state != PlayerState::Playing
            || self.engine.is_crossfading()
            || !self.config.crossfade_enabled()
            || self.sleep_timer.stops_after_current_track()
        {
            return;
        }
        let Some(next) = self.queue.peek_next().and_then(|i| self.queue.get(i)).cloned() else {
            return;
        };
        if self.is_loaded(&next.id) || !self.engine.has_preloaded(&next.id) {
            return;
        }
        let Some(duration) = self.engine.duration() else {
            return;
        };
        let fade = self.config.crossfade_duration();
        if duration.saturating_sub(self.engine.current_time()) > fade {
            return;
        }

        if !self.engine.start_crossfade(fade, now) {
            return;
        }
        self.sleep_timer.on_track_ended();
        if self.sleep_timer.is_active() {
            self.emit_sleep_timer();
        }

        let previous = self.loaded.take().map(|t| t.id);
        self.queue.advance_next();
        self.queue_dirty = true;
        self.loaded = Some(next.clone());
        self.play_recorded = false;
        self.autoplay = true;
        self.throttle.reset();

        info!(from = ?previous, to = %next.id, "Crossfading into next track");
        self.emit(PlayerEvent::TrackChanged {
            track_id: next.id.clone(),
            previous_track_id: previous,
        });
        self.emit_queue_changed();
        self.media.publish_track(&next);
        self.pump_engine_events(now);

        self.request_preload();
        self.request_related();
    }

    fn pump_engine_events(&mut self, now: Instant) {
        for event in self.engine.drain_events() {
            self.on_engine_event(event, now);
        }
    }

    /// Apply one engine event observed at `now`.
    ///
    /// Events about any track other than the loaded one are dropped.
    pub fn on_engine_event(&mut self, event: EngineEvent, now: Instant) {
        if !self.is_loaded(event.track_id()) {
            if !matches!(event, EngineEvent::CrossfadeCompleted { .. } | EngineEvent::Stopped { .. }) {
                debug!(?event, "Discarding event for a track that is no longer current");
            }
            return;
        }

        match event {
            EngineEvent::PlayStarted { track_id } => {
                self.set_state(PlayerState::Playing);
                self.media.publish_transport(TransportState::Playing);
                if !self.play_recorded {
                    self.play_recorded = true;
                    if let Some(track) = self.loaded.clone() {
                        let played = self.engine.current_time().as_secs_f64();
                        debug!(%track_id, "Recording play");
                        self.tasks.push(Task::RecordPlay(PlayRecord::new(track, played)));
                    }
                }
            }
            EngineEvent::Paused { .. } => {
                self.set_state(PlayerState::Paused);
                self.media.publish_transport(TransportState::Paused);
            }
            EngineEvent::TimeUpdate { position, duration, .. } => {
                if self.throttle.should_emit(now, position) {
                    self.media.publish_position(position, duration);
                    self.emit(PlayerEvent::PositionChanged { position, duration });
                }
            }
            EngineEvent::DurationKnown { duration, .. } => {
                self.media.publish_position(self.engine.current_time(), Some(duration));
            }
            EngineEvent::BufferingChanged { buffering, .. } => {
                self.emit(PlayerEvent::BufferingChanged { buffering });
            }
            EngineEvent::Ended { .. } => self.on_track_ended(),
            other => debug!(event = ?other, "Engine event"),
        }
    }

    fn set_state(&mut self, new_state: PlayerState) {
        if self.state == new_state {
            return;
        }
        let old_state = self.state;
        self.state = new_state;
        debug!(?old_state, ?new_state, "Player state changed");
        self.emit(PlayerEvent::StateChanged { old_state, new_state });
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.emit(event);
    }

    fn emit_queue_changed(&self) {
        self.emit(PlayerEvent::QueueChanged {
            length: self.queue.len(),
            current_index: self.queue.current_index(),
        });
    }

    fn emit_volume(&self) {
        self.emit(PlayerEvent::VolumeChanged {
            level: self.engine.volume(),
            muted: self.muted,
        });
    }

    fn emit_sleep_timer(&self) {
        let display = self.sleep_timer.display();
        self.emit(PlayerEvent::SleepTimerChanged {
            active: display.active,
            remaining: display.label,
        });
    }
}

impl<B: AudioBackend> std::fmt::Debug for Orchestrator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("loaded", &self.loaded_id())
            .field("queue_len", &self.queue.len())
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
