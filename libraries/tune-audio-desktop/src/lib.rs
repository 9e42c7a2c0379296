//! Desktop audio backends for Tune
//!
//! This crate provides [`tune_playback::AudioBackend`] implementations and an
//! OS media-controls platform for desktop targets.
//!
//! # Features
//!
//! - `HeadlessBackend`: fetches and validates audio, clock-driven playhead,
//!   no output device required (always available)
//! - `RodioBackend`: real output on the default device (`rodio-output`)
//! - `SouvlakiPlatform`: MPRIS / SMTC / Now Playing integration
//!   (`os-controls`)
//!
//! Every backend downloads the whole resource with reqwest and probes it with
//! Symphonia before handing a unit to the engine, so undecodable payloads
//! fail the load instead of failing mid-playback.
//!
//! # Example
//!
//! ```no_run
//! use tune_audio_desktop::HeadlessBackend;
//! use tune_playback::PlayerRuntime;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HeadlessBackend::new()?;
//! let (runtime, handle) = PlayerRuntime::builder(backend).build();
//! # let _ = (runtime, handle);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod fetch;
mod headless;
pub mod probe;

#[cfg(feature = "os-controls")]
mod os_controls;
#[cfg(feature = "rodio-output")]
mod rodio_output;

pub use error::{AudioError, Result};
pub use fetch::HttpFetcher;
pub use headless::{HeadlessBackend, HeadlessUnit};
pub use probe::{probe_audio, ProbedAudio};

#[cfg(feature = "os-controls")]
pub use os_controls::SouvlakiPlatform;
#[cfg(feature = "rodio-output")]
pub use rodio_output::{RodioBackend, RodioUnit};
