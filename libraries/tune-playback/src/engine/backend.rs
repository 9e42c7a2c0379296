//! Audio backend abstraction
//!
//! Platform-specific code (fetching, decoding, output) is provided through
//! these traits. The engine adapter only ever talks to an [`AudioUnit`]:
//! one opened stream that can be played, paused, seeked and released.

use crate::error::BackendError;
use futures::future::LocalBoxFuture;
use std::time::Duration;

/// Future resolving once a unit is opened and its duration is known
pub type OpenFuture<U> = LocalBoxFuture<'static, Result<U, BackendError>>;

/// Factory for playable units
pub trait AudioBackend {
    /// Unit type produced by this backend
    type Unit: AudioUnit + 'static;

    /// Start opening `url`. The returned future must not borrow the backend.
    fn open(&self, url: &str) -> OpenFuture<Self::Unit>;
}

/// One opened audio stream
pub trait AudioUnit {
    /// Start or resume output
    fn play(&mut self) -> Result<(), BackendError>;

    /// Pause output, keeping position
    fn pause(&mut self);

    /// Stop output and release the underlying resources
    fn stop(&mut self);

    /// Seek to `position`
    fn seek(&mut self, position: Duration) -> Result<(), BackendError>;

    /// Set output gain (0.0 to 1.0)
    fn set_volume(&mut self, volume: f32);

    /// Current output gain
    fn volume(&self) -> f32;

    /// Current playhead
    fn position(&self) -> Duration;

    /// Total length, if the stream reports one
    fn duration(&self) -> Option<Duration>;

    /// Whether output is running
    fn is_playing(&self) -> bool;

    /// Whether the stream has played to its end
    fn is_finished(&self) -> bool;

    /// Whether output is stalled waiting for data
    fn is_buffering(&self) -> bool {
        false
    }
}
