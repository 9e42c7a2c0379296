//! Tune Core
//!
//! Platform-agnostic domain types, collaborator traits, and error handling for
//! the Tune player.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `ImageVariant`, `DownloadVariant`, `AudioQuality`, `RepeatMode`
//! - **Collaborator Traits**: `SongCatalog`, `PlayHistory`, `StateStore`
//! - **Error Handling**: Unified `TuneError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use tune_core::{AudioQuality, DownloadVariant, Track};
//!
//! let track = Track::new("abc123", "Midnight City")
//!     .with_artist("M83")
//!     .with_download(DownloadVariant::new("96kbps", "http://cdn.example.com/a.mp3"))
//!     .with_download(DownloadVariant::new("320kbps", "https://cdn.example.com/b.mp3"));
//!
//! assert!(track.is_playable());
//! assert_eq!(
//!     track.stream_url(AudioQuality::Low).as_deref(),
//!     Some("https://cdn.example.com/a.mp3")
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;
mod urls;

// Re-export commonly used types
pub use error::{Result, TuneError};
pub use storage::{load_state, save_state, StateStore};
pub use traits::{PlayHistory, PlayRecord, SongCatalog};
pub use types::{AudioQuality, DownloadVariant, ImageVariant, RepeatMode, Track, TrackId};
pub use urls::secure_url;
