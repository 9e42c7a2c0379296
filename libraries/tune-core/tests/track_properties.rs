//! Property-based tests for track URL selection

use proptest::prelude::*;
use tune_core::{AudioQuality, DownloadVariant, Track};

// ===== Helpers =====

fn arbitrary_url() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "http://[a-z]{1,8}\\.example\\.com/[a-z0-9]{1,8}\\.mp4",
        "https://[a-z]{1,8}\\.example\\.com/[a-z0-9]{1,8}\\.mp4",
    ]
}

fn arbitrary_track() -> impl Strategy<Value = Track> {
    prop::collection::vec(arbitrary_url(), 0..6).prop_map(|urls| {
        urls.into_iter()
            .enumerate()
            .fold(Track::new("t", "Song"), |track, (i, url)| {
                track.with_download(DownloadVariant::new(format!("q{i}"), url))
            })
    })
}

fn arbitrary_quality() -> impl Strategy<Value = AudioQuality> {
    prop_oneof![
        Just(AudioQuality::Low),
        Just(AudioQuality::Medium),
        Just(AudioQuality::High),
        Just(AudioQuality::Highest),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: a URL is chosen exactly when the track is playable
    #[test]
    fn url_chosen_iff_playable(track in arbitrary_track(), quality in arbitrary_quality()) {
        prop_assert_eq!(track.stream_url(quality).is_some(), track.is_playable());
    }

    /// Property: chosen URLs never use plain HTTP
    #[test]
    fn chosen_url_is_never_plain_http(track in arbitrary_track(), quality in arbitrary_quality()) {
        if let Some(url) = track.stream_url(quality) {
            prop_assert!(url.starts_with("https://"), "got {}", url);
        }
    }

    /// Property: the chosen URL belongs to one of the track's variants
    #[test]
    fn chosen_url_comes_from_track(track in arbitrary_track(), quality in arbitrary_quality()) {
        if let Some(url) = track.stream_url(quality) {
            let suffix = url.trim_start_matches("https://");
            prop_assert!(track.downloads.iter().any(|d| d.url.ends_with(suffix)));
        }
    }
}
