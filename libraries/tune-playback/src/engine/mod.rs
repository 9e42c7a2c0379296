//! Audio engine adapter
//!
//! Wraps a platform [`AudioBackend`] behind a small command surface and a
//! stream of [`EngineEvent`]s. The engine owns every audio unit:
//!
//! - at most one *current* unit (the one the user hears)
//! - at most one *preloaded* unit (silent, paused, waiting to be promoted)
//! - during a crossfade, one *outgoing* unit fading to silence
//!
//! Loads are split into `begin_load` (synchronous bookkeeping, returns the
//! backend future) and `complete_load` (applies the result). Every
//! `begin_load` supersedes earlier tickets; late results for superseded
//! tickets are released and ignored.

mod backend;
mod crossfade;

pub use backend::{AudioBackend, AudioUnit, OpenFuture};
pub use crossfade::{CrossfadeRamp, FadeCurve, RampGains};

use crate::error::{BackendError, LoadError, PlaybackError, Result};
use crate::events::{EngineEvent, EventBus};
use futures::future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tune_core::{AudioQuality, Track, TrackId};

/// Minimum spacing between `TimeUpdate` events while playing
pub const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Identifies one load request; only the newest ticket is honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// An in-flight load handed back to the caller to await
pub struct PendingLoad<U> {
    pub ticket: LoadTicket,
    pub track_id: TrackId,
    pub future: OpenFuture<U>,
}

impl<U> std::fmt::Debug for PendingLoad<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLoad")
            .field("ticket", &self.ticket)
            .field("track_id", &self.track_id)
            .finish_non_exhaustive()
    }
}

/// Result of applying a finished load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The unit is now current
    Loaded { duration: Option<Duration> },
    /// A newer load started meanwhile; the result was discarded
    Superseded,
}

struct Loaded<U> {
    track: Track,
    unit: U,
    duration: Option<Duration>,
    ended: bool,
    buffering: bool,
}

impl<U: AudioUnit> Loaded<U> {
    fn new(track: Track, unit: U) -> Self {
        let duration = unit
            .duration()
            .or_else(|| track.duration_secs.map(|s| Duration::from_secs(u64::from(s))));
        Self {
            track,
            unit,
            duration,
            ended: false,
            buffering: false,
        }
    }

    fn id(&self) -> &TrackId {
        &self.track.id
    }
}

struct Outgoing<U> {
    loaded: Loaded<U>,
    ramp: CrossfadeRamp,
}

/// Engine adapter over an [`AudioBackend`]
pub struct AudioEngine<B: AudioBackend> {
    backend: B,
    current: Option<Loaded<B::Unit>>,
    preloaded: Option<Loaded<B::Unit>>,
    outgoing: Option<Outgoing<B::Unit>>,

    generation: u64,
    pending_load: Option<(u64, Track)>,
    preload_generation: u64,
    pending_preload: Option<(u64, Track)>,

    volume: f32,
    fade_curve: FadeCurve,
    last_time_update: Option<Instant>,

    outbox: Vec<EngineEvent>,
    bus: EventBus<EngineEvent>,
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            current: None,
            preloaded: None,
            outgoing: None,
            generation: 0,
            pending_load: None,
            preload_generation: 0,
            pending_preload: None,
            volume: 1.0,
            fade_curve: FadeCurve::default(),
            last_time_update: None,
            outbox: Vec::new(),
            bus: EventBus::default(),
        }
    }

    pub fn with_fade_curve(mut self, curve: FadeCurve) -> Self {
        self.fade_curve = curve;
        self
    }

    /// Bus carrying every engine event, for observers other than the orchestrator
    pub fn events(&self) -> &EventBus<EngineEvent> {
        &self.bus
    }

    /// Take events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, event: EngineEvent) {
        self.bus.emit(event.clone());
        self.outbox.push(event);
    }

    // ===== Loading =====

    /// Load `track` and wait for it. Convenience over `begin_load` + `complete_load`.
    pub async fn load_track(&mut self, track: &Track, quality: AudioQuality) -> std::result::Result<LoadOutcome, LoadError> {
        let pending = self.begin_load(track, quality)?;
        let result = pending.future.await;
        self.complete_load(pending.ticket, result)
    }

    /// Start loading `track`, replacing whatever is current.
    ///
    /// The current unit (and any fading unit) is stopped and released before
    /// the new request starts. A ready preload of the same track is promoted
    /// without touching the backend.
    pub fn begin_load(&mut self, track: &Track, quality: AudioQuality) -> std::result::Result<PendingLoad<B::Unit>, LoadError> {
        self.release_current();
        self.release_outgoing();

        self.generation += 1;
        let ticket = LoadTicket(self.generation);
        self.pending_load = Some((self.generation, track.clone()));
        self.emit(EngineEvent::LoadStarted {
            track_id: track.id.clone(),
        });

        if let Some(ready) = self.take_preloaded_for(&track.id) {
            debug!(track_id = %track.id, "Promoting preloaded unit");
            return Ok(PendingLoad {
                ticket,
                track_id: track.id.clone(),
                future: Box::pin(future::ready(Ok(ready.unit))),
            });
        }

        let Some(url) = track.stream_url(quality) else {
            self.pending_load = None;
            let err = LoadError::NoPlayableUrl {
                track_id: track.id.clone(),
            };
            self.emit(EngineEvent::LoadFailed {
                track_id: track.id.clone(),
                error: err.to_string(),
            });
            return Err(err);
        };

        debug!(track_id = %track.id, %url, %quality, "Loading track");
        Ok(PendingLoad {
            ticket,
            track_id: track.id.clone(),
            future: self.backend.open(&url),
        })
    }

    /// Apply the result of a load started with `begin_load`
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<B::Unit, BackendError>,
    ) -> std::result::Result<LoadOutcome, LoadError> {
        let track = match self.pending_load.take() {
            Some((generation, track)) if generation == ticket.0 => track,
            other => {
                self.pending_load = other;
                if let Ok(mut unit) = result {
                    unit.stop();
                }
                debug!(ticket = ticket.0, "Discarding superseded load");
                return Ok(LoadOutcome::Superseded);
            }
        };

        match result {
            Ok(mut unit) => {
                unit.set_volume(self.volume);
                let loaded = Loaded::new(track, unit);
                let duration = loaded.duration;
                let track_id = loaded.id().clone();
                self.current = Some(loaded);
                self.last_time_update = None;

                if let Some(duration) = duration {
                    self.emit(EngineEvent::DurationKnown {
                        track_id: track_id.clone(),
                        duration,
                    });
                }
                self.emit(EngineEvent::LoadSucceeded { track_id, duration });
                Ok(LoadOutcome::Loaded { duration })
            }
            Err(source) => {
                let err = LoadError::Backend {
                    track_id: track.id.clone(),
                    source,
                };
                self.emit(EngineEvent::LoadFailed {
                    track_id: track.id,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    // ===== Preloading =====

    /// Start fetching `track` silently for an instant later start.
    ///
    /// Returns `None` when there is nothing to do: the track is current,
    /// already preloaded or being preloaded, or has no playable URL.
    pub fn begin_preload(&mut self, track: &Track, quality: AudioQuality) -> Option<PendingLoad<B::Unit>> {
        let already = self.current_track_id() == Some(&track.id)
            || self.has_preloaded(&track.id)
            || self
                .pending_preload
                .as_ref()
                .is_some_and(|(_, t)| t.id == track.id);
        if already {
            return None;
        }

        let Some(url) = track.stream_url(quality) else {
            warn!(track_id = %track.id, "Skipping preload: no playable URL");
            return None;
        };

        if let Some(mut stale) = self.preloaded.take() {
            stale.unit.stop();
        }
        self.preload_generation += 1;
        self.pending_preload = Some((self.preload_generation, track.clone()));
        debug!(track_id = %track.id, "Preloading next track");

        Some(PendingLoad {
            ticket: LoadTicket(self.preload_generation),
            track_id: track.id.clone(),
            future: self.backend.open(&url),
        })
    }

    /// Apply a preload result. Failures are logged and swallowed.
    pub fn complete_preload(&mut self, ticket: LoadTicket, result: std::result::Result<B::Unit, BackendError>) {
        let track = match self.pending_preload.take() {
            Some((generation, track)) if generation == ticket.0 => track,
            other => {
                self.pending_preload = other;
                if let Ok(mut unit) = result {
                    unit.stop();
                }
                return;
            }
        };

        match result {
            Ok(mut unit) => {
                unit.pause();
                unit.set_volume(0.0);
                let track_id = track.id.clone();
                self.preloaded = Some(Loaded::new(track, unit));
                self.emit(EngineEvent::PreloadReady { track_id });
            }
            Err(e) => {
                warn!(track_id = %track.id, error = %e, "Preload failed");
            }
        }
    }

    /// Whether `track_id` is preloaded and ready
    pub fn has_preloaded(&self, track_id: &TrackId) -> bool {
        self.preloaded.as_ref().is_some_and(|p| p.id() == track_id)
    }

    /// Drop any preloaded unit
    pub fn clear_preload(&mut self) {
        self.pending_preload = None;
        if let Some(mut stale) = self.preloaded.take() {
            stale.unit.stop();
        }
    }

    fn take_preloaded_for(&mut self, track_id: &TrackId) -> Option<Loaded<B::Unit>> {
        if self.has_preloaded(track_id) {
            self.preloaded.take()
        } else {
            None
        }
    }

    // ===== Transport =====

    /// Start or resume the current unit
    pub fn play(&mut self) -> Result<()> {
        let current = self.current.as_mut().ok_or(PlaybackError::NothingLoaded)?;
        if current.ended {
            current.unit.seek(Duration::ZERO)?;
            current.ended = false;
        }
        current.unit.play()?;
        let track_id = current.id().clone();

        if let Some(outgoing) = self.outgoing.as_mut() {
            outgoing.loaded.unit.play()?;
        }
        self.last_time_update = None;
        self.emit(EngineEvent::PlayStarted { track_id });
        Ok(())
    }

    /// Pause the current unit. A running crossfade is cut short.
    pub fn pause(&mut self) {
        self.finish_crossfade();
        if let Some(current) = self.current.as_mut() {
            current.unit.pause();
            let track_id = current.id().clone();
            self.emit(EngineEvent::Paused { track_id });
        }
    }

    /// Stop and release the current unit
    pub fn stop(&mut self) {
        self.release_outgoing();
        if let Some(track_id) = self.release_current() {
            self.emit(EngineEvent::Stopped { track_id });
        }
    }

    /// Seek within the current unit, clamped to `[0, duration]`
    pub fn seek(&mut self, position: Duration) -> Result<()> {
        let current = self.current.as_mut().ok_or(PlaybackError::NothingLoaded)?;
        let target = match current.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        current.unit.seek(target)?;
        current.ended = false;

        let event = EngineEvent::TimeUpdate {
            track_id: current.id().clone(),
            position: target,
            duration: current.duration,
        };
        self.emit(event);
        Ok(())
    }

    /// Set output volume (clamped to 0.0..=1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        match self.outgoing.as_mut() {
            Some(outgoing) => outgoing.ramp.set_target(self.volume),
            None => {
                if let Some(current) = self.current.as_mut() {
                    current.unit.set_volume(self.volume);
                }
            }
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn current_time(&self) -> Duration {
        self.current.as_ref().map_or(Duration::ZERO, |c| c.unit.position())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.current.as_ref().and_then(|c| c.duration)
    }

    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.unit.is_playing())
    }

    pub fn current_track_id(&self) -> Option<&TrackId> {
        self.current.as_ref().map(|c| c.id())
    }

    pub fn is_crossfading(&self) -> bool {
        self.outgoing.is_some()
    }

    // ===== Crossfade =====

    /// Start a crossfade into the preloaded unit.
    ///
    /// The preloaded unit becomes current immediately and ramps up while the
    /// old current ramps down. Returns `false` if there is no current unit,
    /// no ready preload, or a crossfade is already running.
    pub fn start_crossfade(&mut self, duration: Duration, now: Instant) -> bool {
        if self.outgoing.is_some() || self.current.is_none() || self.preloaded.is_none() {
            return false;
        }
        let (Some(old), Some(mut next)) = (self.current.take(), self.preloaded.take()) else {
            return false;
        };

        next.unit.set_volume(0.0);
        if let Err(e) = next.unit.play() {
            warn!(track_id = %next.id(), error = %e, "Crossfade target failed to start");
            next.unit.stop();
            self.current = Some(old);
            return false;
        }

        let from_track_id = old.id().clone();
        let to_track_id = next.id().clone();
        let ramp = CrossfadeRamp::new(now, duration, self.fade_curve, old.unit.volume(), self.volume);

        debug!(from = %from_track_id, to = %to_track_id, ?duration, "Crossfade started");
        self.outgoing = Some(Outgoing { loaded: old, ramp });
        let incoming_duration = next.duration;
        self.current = Some(next);
        self.last_time_update = None;

        self.emit(EngineEvent::CrossfadeStarted {
            from_track_id,
            to_track_id: to_track_id.clone(),
            duration,
        });
        if let Some(duration) = incoming_duration {
            self.emit(EngineEvent::DurationKnown {
                track_id: to_track_id.clone(),
                duration,
            });
        }
        self.emit(EngineEvent::PlayStarted {
            track_id: to_track_id,
        });
        true
    }

    fn finish_crossfade(&mut self) {
        if let Some(mut outgoing) = self.outgoing.take() {
            outgoing.loaded.unit.stop();
            if let Some(current) = self.current.as_mut() {
                current.unit.set_volume(self.volume);
            }
            self.emit(EngineEvent::CrossfadeCompleted {
                from_track_id: outgoing.loaded.track.id,
            });
        }
    }

    // ===== Polling =====

    /// Advance time-driven state: crossfade ramp, buffering, time updates and
    /// end-of-track detection. Call frequently (every 50-250ms).
    pub fn poll(&mut self, now: Instant) {
        if let Some(outgoing) = self.outgoing.as_mut() {
            let gains = outgoing.ramp.gains(now);
            outgoing.loaded.unit.set_volume(gains.outgoing);
            if let Some(current) = self.current.as_mut() {
                current.unit.set_volume(gains.incoming);
            }
            if gains.finished || outgoing.loaded.unit.is_finished() {
                self.finish_crossfade();
            }
        }

        let Some(current) = self.current.as_mut() else {
            return;
        };

        let buffering = current.unit.is_buffering();
        let mut events = Vec::new();
        if buffering != current.buffering {
            current.buffering = buffering;
            events.push(EngineEvent::BufferingChanged {
                track_id: current.id().clone(),
                buffering,
            });
        }

        if current.duration.is_none() {
            if let Some(duration) = current.unit.duration() {
                current.duration = Some(duration);
                events.push(EngineEvent::DurationKnown {
                    track_id: current.id().clone(),
                    duration,
                });
            }
        }

        let due = self
            .last_time_update
            .map_or(true, |at| now.saturating_duration_since(at) >= TIME_UPDATE_INTERVAL);
        if current.unit.is_playing() && due {
            self.last_time_update = Some(now);
            events.push(EngineEvent::TimeUpdate {
                track_id: current.id().clone(),
                position: current.unit.position(),
                duration: current.duration,
            });
        }

        if !current.ended && current.unit.is_finished() {
            current.ended = true;
            events.push(EngineEvent::Ended {
                track_id: current.id().clone(),
            });
        }

        for event in events {
            self.emit(event);
        }
    }

    // ===== Teardown =====

    /// Stop and release every unit
    pub fn destroy(&mut self) {
        self.generation += 1;
        self.pending_load = None;
        self.release_outgoing();
        self.release_current();
        self.clear_preload();
    }

    fn release_current(&mut self) -> Option<TrackId> {
        self.current.take().map(|mut current| {
            current.unit.stop();
            current.track.id
        })
    }

    fn release_outgoing(&mut self) {
        if let Some(mut outgoing) = self.outgoing.take() {
            outgoing.loaded.unit.stop();
        }
    }
}

impl<B: AudioBackend> Drop for AudioEngine<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<B: AudioBackend> std::fmt::Debug for AudioEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("current", &self.current_track_id())
            .field("preloaded", &self.preloaded.as_ref().map(|p| p.id()))
            .field("crossfading", &self.is_crossfading())
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}
