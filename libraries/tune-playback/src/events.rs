//! Playback Events
//!
//! Event-based communication for UI synchronization during playback.
//! Two streams exist:
//! - [`EngineEvent`]: raw notifications from the audio engine adapter
//! - [`PlayerEvent`]: orchestrated, throttled notifications for renderers
//!
//! Both fan out through an [`EventBus`]; observers subscribe and unsubscribe
//! independently (dropping the receiver unsubscribes).

use crate::types::PlayerState;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tune_core::{RepeatMode, TrackId};

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Broadcast fan-out of events to any number of observers
///
/// Slow receivers lag and lose the oldest events rather than blocking the
/// emitter.
#[derive(Debug, Clone)]
pub struct EventBus<E: Clone> {
    tx: broadcast::Sender<E>,
    capacity: usize,
}

impl<E: Clone> EventBus<E> {
    /// Creates a new bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Emit an event; returns the number of subscribers that received it
    pub fn emit(&self, event: E) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Buffer size per subscriber
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Events emitted by the audio engine adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A load was requested
    LoadStarted { track_id: TrackId },

    /// The track is loaded and ready to play
    LoadSucceeded {
        track_id: TrackId,
        duration: Option<Duration>,
    },

    /// Loading failed
    LoadFailed { track_id: TrackId, error: String },

    /// Duration became known
    DurationKnown { track_id: TrackId, duration: Duration },

    /// Playback started or resumed
    PlayStarted { track_id: TrackId },

    /// Playback paused
    Paused { track_id: TrackId },

    /// Playback stopped and the unit released
    Stopped { track_id: TrackId },

    /// Periodic position report (at most every 250ms while playing)
    TimeUpdate {
        track_id: TrackId,
        position: Duration,
        duration: Option<Duration>,
    },

    /// The track played to its end
    Ended { track_id: TrackId },

    /// Buffering started or finished
    BufferingChanged { track_id: TrackId, buffering: bool },

    /// The next track is fetched and decoded, ready to start instantly
    PreloadReady { track_id: TrackId },

    /// Crossfade started between two tracks
    CrossfadeStarted {
        from_track_id: TrackId,
        to_track_id: TrackId,
        duration: Duration,
    },

    /// The outgoing track finished fading out and was released
    CrossfadeCompleted { from_track_id: TrackId },
}

impl EngineEvent {
    /// Track the event refers to (the incoming track for crossfades)
    pub fn track_id(&self) -> &TrackId {
        match self {
            Self::LoadStarted { track_id }
            | Self::LoadSucceeded { track_id, .. }
            | Self::LoadFailed { track_id, .. }
            | Self::DurationKnown { track_id, .. }
            | Self::PlayStarted { track_id }
            | Self::Paused { track_id }
            | Self::Stopped { track_id }
            | Self::TimeUpdate { track_id, .. }
            | Self::Ended { track_id }
            | Self::BufferingChanged { track_id, .. }
            | Self::PreloadReady { track_id } => track_id,
            Self::CrossfadeStarted { to_track_id, .. } => to_track_id,
            Self::CrossfadeCompleted { from_track_id } => from_track_id,
        }
    }
}

/// Events emitted by the orchestrator for renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Lifecycle state changed
    StateChanged {
        old_state: PlayerState,
        new_state: PlayerState,
    },

    /// A different track became current
    TrackChanged {
        track_id: TrackId,
        previous_track_id: Option<TrackId>,
    },

    /// Throttled position update
    PositionChanged {
        position: Duration,
        duration: Option<Duration>,
    },

    /// Queue contents or current index changed
    QueueChanged {
        length: usize,
        current_index: Option<usize>,
    },

    /// Shuffle or repeat changed
    ModesChanged { shuffle: bool, repeat: RepeatMode },

    /// Volume changed
    VolumeChanged { level: f32, muted: bool },

    /// Buffering started or finished
    BufferingChanged { buffering: bool },

    /// Sleep timer set, cleared or counted down
    SleepTimerChanged {
        active: bool,
        remaining: Option<String>,
    },

    /// Sleep timer stopped playback
    SleepTimerFired,

    /// Tracks appended from the related-songs collaborator
    QueueExtended { added: usize },

    /// A track failed to load
    Error { track_id: TrackId, message: String },

    /// Too many consecutive failures; playback stopped
    PlaybackStalled { failures: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_receives_events() {
        let bus: EventBus<PlayerEvent> = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let delivered = bus.emit(PlayerEvent::SleepTimerFired);
        assert_eq!(delivered, 2);
        assert_eq!(a.recv().await.unwrap(), PlayerEvent::SleepTimerFired);
        assert_eq!(b.recv().await.unwrap(), PlayerEvent::SleepTimerFired);
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bus: EventBus<PlayerEvent> = EventBus::default();
        assert_eq!(bus.emit(PlayerEvent::SleepTimerFired), 0);
    }

    #[test]
    fn dropping_receiver_unsubscribes() {
        let bus: EventBus<PlayerEvent> = EventBus::new(4);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn engine_event_track_id_for_crossfade_is_incoming() {
        let event = EngineEvent::CrossfadeStarted {
            from_track_id: "a".into(),
            to_track_id: "b".into(),
            duration: Duration::from_secs(1),
        };
        assert_eq!(event.track_id().as_str(), "b");
    }
}
