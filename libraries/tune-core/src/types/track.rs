/// Track domain type
use super::{AudioQuality, TrackId};
use crate::urls::secure_url;
use serde::{Deserialize, Serialize};

/// Artwork variant served by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    /// Quality tag, e.g. `"50x50"`, `"150x150"`, `"500x500"`
    pub quality: String,
    /// Image location
    pub url: String,
}

impl ImageVariant {
    /// Create a new image variant
    pub fn new(quality: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            url: url.into(),
        }
    }
}

/// Streamable audio variant served by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadVariant {
    /// Quality tag, e.g. `"96kbps"`, `"320kbps"`
    pub quality: String,
    /// Stream location
    pub url: String,
}

impl DownloadVariant {
    /// Create a new download variant
    pub fn new(quality: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            url: url.into(),
        }
    }

    fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// A playable song as delivered by the catalog.
///
/// Download variants are ordered from lowest to highest bitrate. A track is
/// playable only when at least one variant carries a non-empty URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog identifier, unique within a queue
    pub id: TrackId,
    /// Display name
    pub name: String,
    /// Artist names, primary first
    #[serde(default)]
    pub artists: Vec<String>,
    /// Album name
    #[serde(default)]
    pub album: Option<String>,
    /// Artwork variants
    #[serde(default)]
    pub images: Vec<ImageVariant>,
    /// Audio variants, lowest bitrate first
    #[serde(default)]
    pub downloads: Vec<DownloadVariant>,
    /// Length in seconds as reported by the catalog
    #[serde(default)]
    pub duration_secs: Option<u32>,
}

impl Track {
    /// Create a track with no artists, artwork or downloads
    pub fn new(id: impl Into<TrackId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists: Vec::new(),
            album: None,
            images: Vec::new(),
            downloads: Vec::new(),
            duration_secs: None,
        }
    }

    /// Append an artist
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artists.push(artist.into());
        self
    }

    /// Set the album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Append an artwork variant
    #[must_use]
    pub fn with_image(mut self, image: ImageVariant) -> Self {
        self.images.push(image);
        self
    }

    /// Append a download variant (callers add them lowest bitrate first)
    #[must_use]
    pub fn with_download(mut self, download: DownloadVariant) -> Self {
        self.downloads.push(download);
        self
    }

    /// Set the catalog duration
    #[must_use]
    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Whether any download variant has a usable URL
    pub fn is_playable(&self) -> bool {
        self.downloads.iter().any(DownloadVariant::has_url)
    }

    /// Up to `max` artist names joined with `", "`, or `None` if there are none
    pub fn artist_line(&self, max: usize) -> Option<String> {
        let names: Vec<&str> = self
            .artists
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .take(max)
            .collect();

        if names.is_empty() {
            None
        } else {
            Some(names.join(", "))
        }
    }

    /// Pick the stream URL for a quality tier, upgraded to HTTPS.
    ///
    /// Walks the tier's preference order and falls back to the first variant
    /// with a URL. Returns `None` for unplayable tracks.
    pub fn stream_url(&self, quality: AudioQuality) -> Option<String> {
        quality
            .preference_order()
            .iter()
            .filter_map(|&index| self.downloads.get(index))
            .find(|variant| variant.has_url())
            .or_else(|| self.downloads.iter().find(|variant| variant.has_url()))
            .map(|variant| secure_url(&variant.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_tier_track() -> Track {
        let mut track = Track::new("t1", "Song");
        for (i, tag) in ["12kbps", "48kbps", "96kbps", "160kbps", "320kbps"]
            .iter()
            .enumerate()
        {
            track = track.with_download(DownloadVariant::new(*tag, format!("https://cdn/{i}.mp4")));
        }
        track
    }

    #[test]
    fn highest_prefers_last_variant() {
        let track = five_tier_track();
        assert_eq!(
            track.stream_url(AudioQuality::Highest).as_deref(),
            Some("https://cdn/4.mp4")
        );
        assert_eq!(
            track.stream_url(AudioQuality::Medium).as_deref(),
            Some("https://cdn/2.mp4")
        );
        assert_eq!(
            track.stream_url(AudioQuality::Low).as_deref(),
            Some("https://cdn/1.mp4")
        );
    }

    #[test]
    fn missing_preferred_index_falls_through_preference_list() {
        // Only two variants: index 0 and 1
        let track = Track::new("t1", "Song")
            .with_download(DownloadVariant::new("12kbps", "https://cdn/0.mp4"))
            .with_download(DownloadVariant::new("48kbps", "https://cdn/1.mp4"));

        assert_eq!(
            track.stream_url(AudioQuality::Highest).as_deref(),
            Some("https://cdn/1.mp4")
        );
    }

    #[test]
    fn empty_urls_are_skipped() {
        let track = Track::new("t1", "Song")
            .with_download(DownloadVariant::new("12kbps", "http://cdn/0.mp4"))
            .with_download(DownloadVariant::new("48kbps", ""))
            .with_download(DownloadVariant::new("96kbps", "  "));

        assert!(track.is_playable());
        assert_eq!(
            track.stream_url(AudioQuality::Medium).as_deref(),
            Some("https://cdn/0.mp4")
        );
    }

    #[test]
    fn unplayable_track_has_no_url() {
        let track = Track::new("t1", "Song").with_download(DownloadVariant::new("12kbps", ""));
        assert!(!track.is_playable());
        assert_eq!(track.stream_url(AudioQuality::Highest), None);
    }

    #[test]
    fn artist_line_caps_and_skips_blanks() {
        let track = Track::new("t1", "Song")
            .with_artist("A")
            .with_artist(" ")
            .with_artist("B")
            .with_artist("C")
            .with_artist("D");
        assert_eq!(track.artist_line(3).as_deref(), Some("A, B, C"));
        assert_eq!(Track::new("t2", "x").artist_line(3), None);
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let track: Track = serde_json::from_str(r#"{"id":"x","name":"Y"}"#).unwrap();
        assert_eq!(track.id.as_str(), "x");
        assert!(track.downloads.is_empty());
        assert!(!track.is_playable());
    }
}
