//! Audio output through rodio
//!
//! One [`OutputStream`] is opened per backend and shared by every unit; each
//! unit owns a [`Sink`] on the stream's mixer, so a crossfade is simply two
//! sinks playing at different gains.

use crate::error::AudioError;
use crate::fetch::{extension_hint, HttpFetcher};
use crate::probe::probe_audio;
use futures::FutureExt;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::io::Cursor;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tune_playback::{AudioBackend, AudioUnit, BackendError, OpenFuture};

/// Backend rendering to the default output device
pub struct RodioBackend {
    // Must outlive every sink connected to its mixer
    stream: Rc<OutputStream>,
    fetcher: Arc<HttpFetcher>,
}

impl RodioBackend {
    /// Open the default output device
    pub fn open_default() -> crate::Result<Self> {
        Self::with_fetcher(HttpFetcher::new()?)
    }

    pub fn with_fetcher(fetcher: HttpFetcher) -> crate::Result<Self> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AudioError::Output(format!("failed to open default output: {e}")))?;
        Ok(Self {
            stream: Rc::new(stream),
            fetcher: Arc::new(fetcher),
        })
    }
}

impl std::fmt::Debug for RodioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioBackend").finish_non_exhaustive()
    }
}

impl AudioBackend for RodioBackend {
    type Unit = RodioUnit;

    fn open(&self, url: &str) -> OpenFuture<RodioUnit> {
        let stream = Rc::clone(&self.stream);
        let fetcher = Arc::clone(&self.fetcher);
        let url = url.to_string();
        async move {
            let bytes = fetcher.fetch(&url).await?;
            let probed = probe_audio(bytes.clone(), extension_hint(&url).as_deref())?;

            let decoder = Decoder::new(Cursor::new(bytes))
                .map_err(|e| BackendError::Decode(e.to_string()))?;
            let duration = probed.duration.or_else(|| decoder.total_duration());

            let sink = Sink::connect_new(stream.mixer());
            sink.pause();
            sink.append(decoder);

            debug!(%url, codec = %probed.codec, ?duration, "Opened output unit");
            Ok::<_, BackendError>(RodioUnit {
                _stream: stream,
                sink,
                duration,
                playing: false,
            })
        }
        .boxed_local()
    }
}

/// One sink on the shared output stream
pub struct RodioUnit {
    _stream: Rc<OutputStream>,
    sink: Sink,
    duration: Option<Duration>,
    playing: bool,
}

impl AudioUnit for RodioUnit {
    fn play(&mut self) -> Result<(), BackendError> {
        self.sink.play();
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
        self.playing = false;
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.playing = false;
    }

    fn seek(&mut self, position: Duration) -> Result<(), BackendError> {
        self.sink.try_seek(position).map_err(|e| {
            warn!(?position, "Seek failed: {e}");
            BackendError::Seek(e.to_string())
        })
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    fn volume(&self) -> f32 {
        self.sink.volume()
    }

    fn position(&self) -> Duration {
        let pos = self.sink.get_pos();
        self.duration.map_or(pos, |d| pos.min(d))
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing && !self.sink.is_paused() && !self.sink.empty()
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}
