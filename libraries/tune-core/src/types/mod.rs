/// Domain types for Tune
mod ids;
mod quality;
mod repeat;
mod track;

pub use ids::TrackId;
pub use quality::AudioQuality;
pub use repeat::RepeatMode;
pub use track::{DownloadVariant, ImageVariant, Track};
