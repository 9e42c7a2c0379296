//! Player runtime
//!
//! A single-task event loop that owns the [`Orchestrator`]. Commands arrive
//! from any number of cloneable [`PlayerHandle`]s; the loop executes the
//! orchestrator's [`Task`]s, drives its clock and persists queue and config
//! whenever they change. Writes run on the blocking pool, one at a time, so
//! the loop never waits on the disk and documents land in order.
//!
//! The loop is not `Send` (audio units usually are not), so run it on a
//! current-thread runtime or inside a `LocalSet`.

use crate::config::{OrchestratorSettings, PlayerConfig, CONFIG_NAMESPACE, QUEUE_NAMESPACE};
use crate::engine::{AudioBackend, LoadTicket, TIME_UPDATE_INTERVAL};
use crate::error::{BackendError, PlaybackError, Result};
use crate::events::{EventBus, PlayerEvent};
use crate::media_session::{MediaSessionBridge, MediaSessionConfig, MediaSessionPlatform, TransportCommand};
use crate::orchestrator::{Orchestrator, Task};
use crate::queue::{Queue, QueueSnapshot};
use crate::types::PlayerStatus;
use futures::future::{FutureExt, LocalBoxFuture, OptionFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tune_core::{load_state, save_state, PlayHistory, RepeatMode, SongCatalog, StateStore, Track, TrackId};

const SLEEP_TICK: Duration = Duration::from_secs(1);

/// Commands accepted by the runtime
#[derive(Debug)]
pub enum PlayerCommand {
    SetQueue(Vec<Track>),
    AddToQueue(Vec<Track>),
    RemoveFromQueue(usize),
    MoveQueueItem { from: usize, to: usize },
    ClearQueue,
    ShuffleQueue,
    SetShuffle(bool),
    SetRepeat(RepeatMode),
    PlayIndex(usize),
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    Next,
    Previous,
    Seek(Duration),
    /// Relative seek in signed seconds
    SeekBy(f64),
    SetVolume(f32),
    Mute,
    Unmute,
    SetSleepTimer { minutes: u32, songs: u32 },
    ClearSleepTimer,
    SetConfig(PlayerConfig),
    /// Forwarded from the OS media session
    Transport(TransportCommand),
    Status(oneshot::Sender<PlayerStatus>),
    Shutdown,
}

/// Cloneable front door to a running [`PlayerRuntime`]
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
    events: EventBus<PlayerEvent>,
}

impl PlayerHandle {
    /// Queue a command for the runtime
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| PlaybackError::ChannelClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn set_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(PlayerCommand::SetQueue(tracks))
    }

    pub fn add_to_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(PlayerCommand::AddToQueue(tracks))
    }

    pub fn play_index(&self, index: usize) -> Result<()> {
        self.send(PlayerCommand::PlayIndex(index))
    }

    pub fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn next(&self) -> Result<()> {
        self.send(PlayerCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send(PlayerCommand::Previous)
    }

    pub fn seek(&self, position: Duration) -> Result<()> {
        self.send(PlayerCommand::Seek(position))
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(PlayerCommand::SetVolume(volume))
    }

    pub fn set_sleep_timer(&self, minutes: u32, songs: u32) -> Result<()> {
        self.send(PlayerCommand::SetSleepTimer { minutes, songs })
    }

    /// Snapshot of the player as seen by the runtime
    pub async fn status(&self) -> Result<PlayerStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Status(tx))?;
        rx.await.map_err(|_| PlaybackError::ChannelClosed)
    }

    /// Ask the runtime to persist, release audio and exit
    pub fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown)
    }
}

/// Builder for [`PlayerRuntime`]
pub struct PlayerRuntimeBuilder<B: AudioBackend> {
    backend: B,
    config: Option<PlayerConfig>,
    settings: OrchestratorSettings,
    queue: Option<Queue>,
    catalog: Option<Arc<dyn SongCatalog>>,
    history: Option<Arc<dyn PlayHistory>>,
    store: Option<Arc<dyn StateStore>>,
    media_platform: Option<Box<dyn MediaSessionPlatform>>,
    media_config: MediaSessionConfig,
    poll_interval: Duration,
}

impl<B: AudioBackend + 'static> PlayerRuntimeBuilder<B> {
    /// Use this config instead of the persisted one
    #[must_use]
    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start from this (empty) queue, e.g. one with a fixed shuffle seed
    #[must_use]
    pub fn queue(mut self, queue: Queue) -> Self {
        self.queue = Some(queue);
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn SongCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn PlayHistory>) -> Self {
        self.history = Some(history);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_media_platform(mut self, platform: Box<dyn MediaSessionPlatform>) -> Self {
        self.media_platform = Some(platform);
        self
    }

    #[must_use]
    pub fn media_config(mut self, config: MediaSessionConfig) -> Self {
        self.media_config = config;
        self
    }

    /// How often the engine is polled
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Assemble the runtime, rehydrating queue and config from the store.
    ///
    /// Unreadable persisted state is logged and replaced by defaults.
    pub fn build(self) -> (PlayerRuntime<B>, PlayerHandle) {
        let stored_config = self
            .store
            .as_deref()
            .and_then(|store| load_or_warn::<PlayerConfig>(store, CONFIG_NAMESPACE));
        let config = self.config.or(stored_config).unwrap_or_default();

        let mut settings = self.settings;
        if self.catalog.is_none() {
            settings.auto_extend_queue = false;
        }

        let mut media_config = self.media_config;
        media_config.app_name.clone_from(&settings.app_name);
        media_config.seek_step = settings.seek_step;
        let media = MediaSessionBridge::new(self.media_platform, media_config);

        let mut orchestrator = Orchestrator::new(self.backend)
            .with_config(config)
            .with_settings(settings)
            .with_media_session(media)
            .with_queue(self.queue.unwrap_or_default());

        if let Some(snapshot) = self
            .store
            .as_deref()
            .and_then(|store| load_or_warn::<QueueSnapshot>(store, QUEUE_NAMESPACE))
        {
            info!(tracks = snapshot.tracks.len(), "Restored queue");
            orchestrator.restore_queue(snapshot);
        }

        let (tx, commands) = mpsc::unbounded_channel();
        // Weak so OS handlers do not keep the loop alive once every handle is gone
        let weak = tx.downgrade();
        let handle = PlayerHandle {
            tx,
            events: orchestrator.events().clone(),
        };

        orchestrator.media_session_mut().attach(move |command| {
            let sent = weak
                .upgrade()
                .is_some_and(|tx| tx.send(PlayerCommand::Transport(command)).is_ok());
            if !sent {
                debug!(?command, "Player runtime gone; media command dropped");
            }
        });

        let runtime = PlayerRuntime {
            orchestrator,
            commands,
            catalog: self.catalog,
            history: self.history,
            store: self.store,
            write: None,
            queue_dirty: false,
            config_dirty: false,
            poll_interval: self.poll_interval,
        };
        (runtime, handle)
    }
}

fn load_or_warn<T: serde::de::DeserializeOwned>(store: &dyn StateStore, namespace: &str) -> Option<T> {
    match load_state(store, namespace) {
        Ok(value) => value,
        Err(e) => {
            warn!(namespace, error = %e, "Ignoring unreadable persisted state");
            None
        }
    }
}

enum Completion<U> {
    Load(LoadTicket, std::result::Result<U, BackendError>),
    Preload(LoadTicket, std::result::Result<U, BackendError>),
    Related(TrackId, tune_core::Result<Vec<Track>>),
    Recorded,
}

type InFlight<U> = FuturesUnordered<LocalBoxFuture<'static, Completion<U>>>;

/// Event loop owning the orchestrator
pub struct PlayerRuntime<B: AudioBackend> {
    orchestrator: Orchestrator<B>,
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    catalog: Option<Arc<dyn SongCatalog>>,
    history: Option<Arc<dyn PlayHistory>>,
    store: Option<Arc<dyn StateStore>>,
    /// Store write in flight on the blocking pool
    write: Option<JoinHandle<()>>,
    queue_dirty: bool,
    config_dirty: bool,
    poll_interval: Duration,
}

impl<B: AudioBackend + 'static> PlayerRuntime<B> {
    pub fn builder(backend: B) -> PlayerRuntimeBuilder<B> {
        PlayerRuntimeBuilder {
            backend,
            config: None,
            settings: OrchestratorSettings::default(),
            queue: None,
            catalog: None,
            history: None,
            store: None,
            media_platform: None,
            media_config: MediaSessionConfig::default(),
            poll_interval: TIME_UPDATE_INTERVAL,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<B> {
        &self.orchestrator
    }

    /// Run until [`PlayerCommand::Shutdown`] or every handle is dropped
    pub async fn run(mut self) -> Result<()> {
        let mut in_flight: InFlight<B::Unit> = FuturesUnordered::new();
        let mut poll = interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sleep_tick = interval_at(Instant::now() + SLEEP_TICK, SLEEP_TICK);
        sleep_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Player runtime started");
        loop {
            self.dispatch_tasks(&mut in_flight);
            self.persist();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                Some(done) = in_flight.next(), if !in_flight.is_empty() => self.complete(done),
                Some(written) = OptionFuture::from(self.write.as_mut()), if self.write.is_some() => {
                    self.write = None;
                    if let Err(e) = written {
                        warn!(error = %e, "State write task failed");
                    }
                }
                _ = poll.tick() => self.orchestrator.tick(Instant::now().into_std()),
                _ = sleep_tick.tick() => self.orchestrator.on_sleep_tick(),
            }
        }

        self.flush().await;
        self.orchestrator.shutdown();
        info!("Player runtime stopped");
        Ok(())
    }

    fn apply(&mut self, command: PlayerCommand) {
        let o = &mut self.orchestrator;
        let result = match command {
            PlayerCommand::SetQueue(tracks) => {
                o.set_queue(tracks);
                Ok(())
            }
            PlayerCommand::AddToQueue(tracks) => {
                o.add_to_queue(tracks);
                Ok(())
            }
            PlayerCommand::RemoveFromQueue(index) => {
                o.remove_from_queue(index);
                Ok(())
            }
            PlayerCommand::MoveQueueItem { from, to } => {
                o.move_queue_item(from, to);
                Ok(())
            }
            PlayerCommand::ClearQueue => {
                o.clear_queue();
                Ok(())
            }
            PlayerCommand::ShuffleQueue => {
                o.shuffle_queue();
                Ok(())
            }
            PlayerCommand::SetShuffle(enabled) => {
                o.set_shuffle(enabled);
                Ok(())
            }
            PlayerCommand::SetRepeat(mode) => {
                o.set_repeat(mode);
                Ok(())
            }
            PlayerCommand::PlayIndex(index) => {
                o.play_index(index);
                Ok(())
            }
            PlayerCommand::Play => o.play(),
            PlayerCommand::Pause => {
                o.pause();
                Ok(())
            }
            PlayerCommand::TogglePlayPause => {
                o.toggle_play_pause();
                Ok(())
            }
            PlayerCommand::Stop => {
                o.stop();
                Ok(())
            }
            PlayerCommand::Next => {
                o.next();
                Ok(())
            }
            PlayerCommand::Previous => {
                o.previous();
                Ok(())
            }
            PlayerCommand::Seek(position) => o.seek(position),
            PlayerCommand::SeekBy(delta) => o.seek_by(delta),
            PlayerCommand::SetVolume(volume) => {
                o.set_volume(volume);
                Ok(())
            }
            PlayerCommand::Mute => {
                o.mute();
                Ok(())
            }
            PlayerCommand::Unmute => {
                o.unmute();
                Ok(())
            }
            PlayerCommand::SetSleepTimer { minutes, songs } => {
                o.set_sleep_timer(minutes, songs);
                Ok(())
            }
            PlayerCommand::ClearSleepTimer => {
                o.clear_sleep_timer();
                Ok(())
            }
            PlayerCommand::SetConfig(config) => {
                o.set_config(config);
                Ok(())
            }
            PlayerCommand::Transport(command) => {
                o.handle_transport(command);
                Ok(())
            }
            PlayerCommand::Status(reply) => {
                let _ = reply.send(o.status());
                Ok(())
            }
            PlayerCommand::Shutdown => Ok(()),
        };

        if let Err(e) = result {
            debug!(error = %e, "Command had no effect");
        }
    }

    fn complete(&mut self, done: Completion<B::Unit>) {
        match done {
            Completion::Load(ticket, result) => self.orchestrator.on_load_finished(ticket, result),
            Completion::Preload(ticket, result) => self.orchestrator.on_preload_finished(ticket, result),
            Completion::Related(track_id, result) => self.orchestrator.on_related_fetched(&track_id, result),
            Completion::Recorded => {}
        }
    }

    fn dispatch_tasks(&mut self, in_flight: &mut InFlight<B::Unit>) {
        for task in self.orchestrator.take_tasks() {
            match task {
                Task::Load(pending) => {
                    let ticket = pending.ticket;
                    in_flight.push(pending.future.map(move |r| Completion::Load(ticket, r)).boxed_local());
                }
                Task::Preload(pending) => {
                    let ticket = pending.ticket;
                    in_flight.push(pending.future.map(move |r| Completion::Preload(ticket, r)).boxed_local());
                }
                Task::FetchRelated { track_id } => {
                    let Some(catalog) = self.catalog.clone() else {
                        continue;
                    };
                    in_flight.push(
                        async move {
                            let result = catalog.fetch_related_tracks(&track_id).await;
                            Completion::Related(track_id, result)
                        }
                        .boxed_local(),
                    );
                }
                Task::RecordPlay(record) => {
                    let Some(history) = self.history.clone() else {
                        continue;
                    };
                    in_flight.push(
                        async move {
                            let track_id = record.track.id.clone();
                            if let Err(e) = history.record_play(record).await {
                                warn!(%track_id, error = %e, "Recording play failed");
                            }
                            Completion::Recorded
                        }
                        .boxed_local(),
                    );
                }
            }
        }
    }

    /// Start writing whatever changed, unless a write is still running
    fn persist(&mut self) {
        self.queue_dirty |= self.orchestrator.take_queue_dirty();
        self.config_dirty |= self.orchestrator.take_config_dirty();
        if self.write.is_some() {
            return;
        }
        let Some(store) = self.store.clone() else {
            self.queue_dirty = false;
            self.config_dirty = false;
            return;
        };

        let snapshot = std::mem::take(&mut self.queue_dirty).then(|| self.orchestrator.queue().snapshot());
        let config = std::mem::take(&mut self.config_dirty).then(|| *self.orchestrator.config());
        if snapshot.is_none() && config.is_none() {
            return;
        }

        self.write = Some(tokio::task::spawn_blocking(move || {
            if let Some(snapshot) = snapshot {
                if let Err(e) = save_state(store.as_ref(), QUEUE_NAMESPACE, &snapshot) {
                    warn!(error = %e, "Failed to persist queue");
                }
            }
            if let Some(config) = config {
                if let Err(e) = save_state(store.as_ref(), CONFIG_NAMESPACE, &config) {
                    warn!(error = %e, "Failed to persist player config");
                }
            }
        }));
    }

    /// Wait for the running write, then write what is still dirty
    async fn flush(&mut self) {
        loop {
            if let Some(write) = self.write.take() {
                if let Err(e) = write.await {
                    warn!(error = %e, "State write task failed");
                }
            }
            self.persist();
            if self.write.is_none() {
                break;
            }
        }
    }
}

impl<B: AudioBackend> std::fmt::Debug for PlayerRuntime<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerRuntime")
            .field("orchestrator", &self.orchestrator)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
