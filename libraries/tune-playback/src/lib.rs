//! Tune - Playback
//!
//! Platform-agnostic playback core for Tune.
//!
//! This crate provides:
//! - Queue with shuffle (cycle-based, no repeats within a cycle) and repeat
//!   modes (None, All, One)
//! - Audio engine adapter over a pluggable [`AudioBackend`] (stale-load
//!   guard, preloading, crossfade)
//! - Playback orchestrator that keeps queue, engine, sleep timer and media
//!   session consistent
//! - Sleep timer (by minutes or by song count)
//! - Media-session bridge for OS media controls
//! - Single-task runtime with a cloneable [`PlayerHandle`]
//!
//! # Architecture
//!
//! `tune-playback` does no I/O of its own:
//! - Audio output comes from an [`AudioBackend`] (`tune-audio-desktop`
//!   provides real ones)
//! - Recommendations and listening history go through
//!   [`tune_core::SongCatalog`] and [`tune_core::PlayHistory`]
//! - Persistence goes through [`tune_core::StateStore`]
//!
//! # Example: Queue navigation
//!
//! ```rust
//! use tune_core::{DownloadVariant, RepeatMode, Track};
//! use tune_playback::Queue;
//!
//! let track = |id: &str| {
//!     Track::new(id, id).with_download(DownloadVariant::new("320kbps", format!("https://cdn.example.com/{id}.mp4")))
//! };
//!
//! let mut queue = Queue::new();
//! queue.set_queue(vec![track("a"), track("b")]);
//! assert_eq!(queue.current_index(), Some(0));
//!
//! queue.advance_next();
//! assert_eq!(queue.current_index(), Some(1));
//!
//! // End of queue without repeat: nothing next
//! assert_eq!(queue.peek_next(), None);
//!
//! queue.set_repeat(RepeatMode::All);
//! assert_eq!(queue.peek_next(), Some(0));
//! ```
//!
//! # Example: Running the player
//!
//! ```rust,no_run
//! use tune_playback::{AudioBackend, PlayerRuntime};
//!
//! async fn start<B: AudioBackend + 'static>(backend: B) -> tune_playback::Result<()> {
//!     let (runtime, handle) = PlayerRuntime::builder(backend).build();
//!     let mut events = handle.subscribe();
//!
//!     let player = async move {
//!         handle.play()?;
//!         while let Ok(event) = events.recv().await {
//!             println!("{event:?}");
//!         }
//!         Ok::<_, tune_playback::PlaybackError>(())
//!     };
//!
//!     let (run, _) = tokio::join!(runtime.run(), player);
//!     run
//! }
//! ```

pub mod config;
pub mod engine;
mod error;
pub mod events;
mod history;
pub mod media_session;
pub mod orchestrator;
pub mod queue;
pub mod runtime;
mod shuffle;
pub mod sleep_timer;
mod throttle;
pub mod types;

// Public exports
pub use config::{OrchestratorSettings, PlayerConfig, CONFIG_NAMESPACE, MAX_CROSSFADE_MS, QUEUE_NAMESPACE};
pub use engine::{
    AudioBackend, AudioEngine, AudioUnit, FadeCurve, LoadOutcome, LoadTicket, OpenFuture, PendingLoad,
    TIME_UPDATE_INTERVAL,
};
pub use error::{BackendError, LoadError, PlatformError, PlaybackError, Result};
pub use events::{EngineEvent, EventBus, PlayerEvent, DEFAULT_EVENT_CAPACITY};
pub use media_session::{
    ActionDetails, ActionHandler, Artwork, MediaAction, MediaMetadata, MediaSessionBridge, MediaSessionConfig,
    MediaSessionPlatform, PositionState, TransportCommand,
};
pub use orchestrator::{Orchestrator, Task};
pub use queue::{Queue, QueueSnapshot};
pub use runtime::{PlayerCommand, PlayerHandle, PlayerRuntime, PlayerRuntimeBuilder};
pub use sleep_timer::{SleepTimer, SleepTimerDisplay};
pub use throttle::PositionThrottle;
pub use types::{PlayerState, PlayerStatus, TransportState};
