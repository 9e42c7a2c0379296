//! Headless backend
//!
//! Fetches and probes real audio but renders nothing: the playhead is driven
//! by the tokio clock. Useful on machines without an output device (CI,
//! servers) and as the default backend of the command-line player.

use crate::fetch::{extension_hint, HttpFetcher};
use crate::probe::probe_audio;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use tune_playback::{AudioBackend, AudioUnit, BackendError, OpenFuture};

/// Backend producing silent, clock-driven units
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    fetcher: Arc<HttpFetcher>,
}

impl HeadlessBackend {
    pub fn new() -> crate::Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new()?))
    }

    pub fn with_fetcher(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }
}

impl AudioBackend for HeadlessBackend {
    type Unit = HeadlessUnit;

    fn open(&self, url: &str) -> OpenFuture<HeadlessUnit> {
        let fetcher = Arc::clone(&self.fetcher);
        let url = url.to_string();
        async move {
            let bytes = fetcher.fetch(&url).await?;
            let probed = probe_audio(bytes, extension_hint(&url).as_deref())?;
            debug!(%url, codec = %probed.codec, duration = ?probed.duration, "Opened headless unit");
            Ok::<_, BackendError>(HeadlessUnit::new(probed.duration))
        }
        .boxed_local()
    }
}

/// Silent unit whose position advances with wall-clock time while playing
#[derive(Debug)]
pub struct HeadlessUnit {
    duration: Option<Duration>,
    offset: Duration,
    started: Option<Instant>,
    volume: f32,
    stopped: bool,
}

impl HeadlessUnit {
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration,
            offset: Duration::ZERO,
            started: None,
            volume: 1.0,
            stopped: false,
        }
    }

    fn clamp(&self, position: Duration) -> Duration {
        self.duration.map_or(position, |d| position.min(d))
    }
}

impl AudioUnit for HeadlessUnit {
    fn play(&mut self) -> Result<(), BackendError> {
        if self.stopped {
            return Err(BackendError::Output("unit was released".into()));
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.started = None;
    }

    fn stop(&mut self) {
        self.pause();
        self.stopped = true;
    }

    fn seek(&mut self, position: Duration) -> Result<(), BackendError> {
        self.offset = self.clamp(position);
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position(&self) -> Duration {
        let elapsed = self.started.map_or(Duration::ZERO, |s| s.elapsed());
        self.clamp(self.offset + elapsed)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.started.is_some() && !self.is_finished()
    }

    fn is_finished(&self) -> bool {
        self.duration.is_some_and(|d| self.position() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn position_follows_the_clock() {
        let mut unit = HeadlessUnit::new(Some(Duration::from_secs(10)));
        assert_eq!(unit.position(), Duration::ZERO);

        unit.play().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(unit.position(), Duration::from_secs(3));
        assert!(unit.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_position() {
        let mut unit = HeadlessUnit::new(Some(Duration::from_secs(10)));
        unit.play().unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        unit.pause();
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(unit.position(), Duration::from_secs(2));
        assert!(!unit.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn seek_is_clamped_and_finishes() {
        let mut unit = HeadlessUnit::new(Some(Duration::from_secs(4)));
        unit.seek(Duration::from_secs(30)).unwrap();
        assert_eq!(unit.position(), Duration::from_secs(4));
        assert!(unit.is_finished());

        unit.seek(Duration::from_secs(1)).unwrap();
        unit.play().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(unit.is_finished());
        assert!(!unit.is_playing());
    }

    #[tokio::test]
    async fn released_unit_refuses_to_play() {
        let mut unit = HeadlessUnit::new(None);
        unit.stop();
        assert!(matches!(unit.play(), Err(BackendError::Output(_))));
    }
}
