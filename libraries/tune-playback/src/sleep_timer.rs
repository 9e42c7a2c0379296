//! Sleep timer
//!
//! Stops playback after a number of minutes or a number of finished songs.
//! Exactly one of the two counters drives an active timer.
//!
//! Reaching zero does not deactivate the timer: `should_stop_playback`
//! stays true until the owner acts on it and calls `clear`.

use serde::{Deserialize, Serialize};

/// Sleep timer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Inactive,
    Time {
        seconds: u64,
    },
    Songs {
        songs: u32,
    },
}

/// Renderer-facing view of the sleep timer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepTimerDisplay {
    pub active: bool,
    pub seconds_remaining: Option<u64>,
    pub songs_remaining: Option<u32>,
    /// `H:MM:SS` / `M:SS` for time mode, `"N songs"` for song mode
    pub label: Option<String>,
}

/// Countdown that tells the orchestrator when to stop
#[derive(Debug, Clone, Default)]
pub struct SleepTimer {
    mode: Mode,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer.
    ///
    /// Minutes take precedence over songs. Zero for both clears the timer.
    pub fn set(&mut self, minutes: u32, songs: u32) {
        self.mode = if minutes > 0 {
            Mode::Time {
                seconds: u64::from(minutes) * 60,
            }
        } else if songs > 0 {
            Mode::Songs { songs }
        } else {
            Mode::Inactive
        };
    }

    pub fn clear(&mut self) {
        self.mode = Mode::Inactive;
    }

    pub fn is_active(&self) -> bool {
        self.mode != Mode::Inactive
    }

    /// One second of wall time elapsed.
    ///
    /// Returns `true` exactly on the tick that reaches zero.
    pub fn tick_second(&mut self) -> bool {
        match &mut self.mode {
            Mode::Time { seconds } if *seconds > 0 => {
                *seconds -= 1;
                *seconds == 0
            }
            _ => false,
        }
    }

    /// A track finished (naturally or into a crossfade).
    pub fn on_track_ended(&mut self) {
        if let Mode::Songs { songs } = &mut self.mode {
            *songs = songs.saturating_sub(1);
        }
    }

    /// Active and fully counted down
    pub fn should_stop_playback(&self) -> bool {
        matches!(
            self.mode,
            Mode::Time { seconds: 0 } | Mode::Songs { songs: 0 }
        )
    }

    /// Song mode with exactly the current song left
    pub fn stops_after_current_track(&self) -> bool {
        matches!(self.mode, Mode::Songs { songs: 1 })
    }

    pub fn seconds_remaining(&self) -> Option<u64> {
        match self.mode {
            Mode::Time { seconds } => Some(seconds),
            _ => None,
        }
    }

    pub fn songs_remaining(&self) -> Option<u32> {
        match self.mode {
            Mode::Songs { songs } => Some(songs),
            _ => None,
        }
    }

    /// Remaining time as `H:MM:SS` (one hour or more) or `M:SS`
    pub fn formatted_remaining(&self) -> Option<String> {
        self.seconds_remaining().map(format_clock)
    }

    pub fn display(&self) -> SleepTimerDisplay {
        let label = match self.mode {
            Mode::Inactive => None,
            Mode::Time { seconds } => Some(format_clock(seconds)),
            Mode::Songs { songs: 1 } => Some("1 song".to_string()),
            Mode::Songs { songs } => Some(format!("{songs} songs")),
        };
        SleepTimerDisplay {
            active: self.is_active(),
            seconds_remaining: self.seconds_remaining(),
            songs_remaining: self.songs_remaining(),
            label,
        }
    }
}

fn format_clock(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_take_precedence() {
        let mut timer = SleepTimer::new();
        timer.set(5, 3);
        assert_eq!(timer.seconds_remaining(), Some(300));
        assert_eq!(timer.songs_remaining(), None);
    }

    #[test]
    fn zero_zero_clears() {
        let mut timer = SleepTimer::new();
        timer.set(0, 2);
        assert!(timer.is_active());
        timer.set(0, 0);
        assert!(!timer.is_active());
        assert!(!timer.should_stop_playback());
    }

    #[test]
    fn countdown_by_time() {
        let mut timer = SleepTimer::new();
        timer.set(1, 0);
        for _ in 0..59 {
            assert!(!timer.tick_second());
        }
        assert!(!timer.should_stop_playback());
        assert!(timer.tick_second());
        assert!(timer.should_stop_playback());
        // Stays armed until cleared
        assert!(!timer.tick_second());
        assert!(timer.is_active());
        timer.clear();
        assert!(!timer.should_stop_playback());
    }

    #[test]
    fn countdown_by_songs() {
        let mut timer = SleepTimer::new();
        timer.set(0, 2);
        timer.on_track_ended();
        assert!(!timer.should_stop_playback());
        assert!(timer.stops_after_current_track());
        timer.on_track_ended();
        assert!(timer.should_stop_playback());
        timer.on_track_ended();
        assert_eq!(timer.songs_remaining(), Some(0));
    }

    #[test]
    fn song_mode_ignores_ticks() {
        let mut timer = SleepTimer::new();
        timer.set(0, 1);
        assert!(!timer.tick_second());
        assert_eq!(timer.songs_remaining(), Some(1));
    }

    #[test]
    fn formats_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(3600), "1:00:00");
        assert_eq!(format_clock(3 * 3600 + 7 * 60 + 9), "3:07:09");
    }

    #[test]
    fn display_labels() {
        let mut timer = SleepTimer::new();
        assert_eq!(timer.display(), SleepTimerDisplay::default());

        timer.set(90, 0);
        assert_eq!(timer.display().label.as_deref(), Some("1:30:00"));

        timer.set(0, 1);
        assert_eq!(timer.display().label.as_deref(), Some("1 song"));
    }
}
