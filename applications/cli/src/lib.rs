//! Tune CLI Library
//!
//! Pieces of the `tune-player` binary that are worth testing on their own:
//! configuration loading, command parsing and terminal rendering.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::{parse_line, Input, HELP};
pub use config::{AppConfig, CliArgs, CONFIG_FILE};
pub use error::{CliError, Result};

use std::path::Path;
use std::time::Duration;
use tune_core::Track;
use tune_playback::{PlayerEvent, PlayerStatus};

/// Read a JSON array of tracks
pub fn read_queue_file(path: &Path) -> Result<Vec<Track>> {
    let raw = std::fs::read_to_string(path).map_err(|e| CliError::Queue(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| CliError::Queue(format!("{}: {e}", path.display())))
}

fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// One-line summary of the player
pub fn format_status(status: &PlayerStatus) -> String {
    let mut line = format!("[{:?}]", status.state);
    match (status.current_index, &status.current_track_id) {
        (Some(index), Some(id)) => line.push_str(&format!(" {}/{} {id}", index + 1, status.queue_len)),
        _ => line.push_str(&format!(" queue: {} tracks", status.queue_len)),
    }
    line.push_str(&format!(" {}", clock(status.position)));
    if let Some(duration) = status.duration {
        line.push_str(&format!("/{}", clock(duration)));
    }
    line.push_str(&format!(
        " vol {}%{}",
        (status.volume * 100.0).round() as u32,
        if status.muted { " (muted)" } else { "" }
    ));
    line.push_str(&format!(" repeat {}", status.repeat));
    if status.shuffle {
        line.push_str(" shuffle");
    }
    if let Some(label) = &status.sleep_timer.label {
        line.push_str(&format!(" sleep {label}"));
    }
    line
}

/// Render an event for the terminal; `None` for events too chatty to print
pub fn format_event(event: &PlayerEvent) -> Option<String> {
    match event {
        PlayerEvent::TrackChanged { track_id, .. } => Some(format!("> now playing {track_id}")),
        PlayerEvent::QueueExtended { added } => Some(format!("+ {added} related tracks queued")),
        PlayerEvent::Error { track_id, message } => Some(format!("! {track_id}: {message}")),
        PlayerEvent::PlaybackStalled { failures } => {
            Some(format!("! playback stopped after {failures} failed tracks"))
        }
        PlayerEvent::SleepTimerFired => Some("z sleep timer fired, playback paused".to_string()),
        PlayerEvent::ModesChanged { shuffle, repeat } => {
            Some(format!("~ shuffle {} repeat {repeat}", if *shuffle { "on" } else { "off" }))
        }
        PlayerEvent::VolumeChanged { level, muted } => Some(format!(
            "~ volume {}%{}",
            (level * 100.0).round() as u32,
            if *muted { " (muted)" } else { "" }
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tune_core::{RepeatMode, TrackId};
    use tune_playback::{PlayerState, SleepTimerDisplay};

    #[test]
    fn status_line() {
        let status = PlayerStatus {
            state: PlayerState::Playing,
            current_track_id: Some(TrackId::new("abc")),
            current_index: Some(1),
            queue_len: 4,
            position: Duration::from_secs(75),
            duration: Some(Duration::from_secs(200)),
            volume: 0.5,
            muted: false,
            shuffle: true,
            repeat: RepeatMode::All,
            sleep_timer: SleepTimerDisplay {
                active: true,
                seconds_remaining: Some(90),
                songs_remaining: None,
                label: Some("1:30".into()),
            },
        };

        let line = format_status(&status);

        assert!(line.starts_with("[Playing] 2/4 abc 1:15/3:20 vol 50%"), "{line}");
        assert!(line.contains("shuffle"));
        assert!(line.ends_with("sleep 1:30"));
    }

    #[test]
    fn chatty_events_are_hidden() {
        assert!(format_event(&PlayerEvent::PositionChanged {
            position: Duration::ZERO,
            duration: None
        })
        .is_none());
        assert_eq!(
            format_event(&PlayerEvent::QueueExtended { added: 3 }).as_deref(),
            Some("+ 3 related tracks queued")
        );
    }

    #[test]
    fn queue_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let tracks = vec![Track::new("a", "Song A"), Track::new("b", "Song B")];
        std::fs::write(&path, serde_json::to_string(&tracks).unwrap()).unwrap();

        assert_eq!(read_queue_file(&path).unwrap(), tracks);
        assert!(matches!(
            read_queue_file(&dir.path().join("missing.json")),
            Err(CliError::Queue(_))
        ));
    }
}
