//! Interactive command parsing
//!
//! Each stdin line is one command. Player commands map straight onto
//! [`PlayerCommand`]; the rest are handled by the front end itself.

use crate::error::{CliError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tune_core::{AudioQuality, RepeatMode};
use tune_playback::PlayerCommand;

pub const HELP: &str = "\
Commands:
  play | pause | toggle | stop        transport
  next | prev                         skip
  goto <n>                            play queue entry n (1-based)
  seek <secs> | fwd [secs] | back [secs]
  vol <0-100> | mute | unmute
  shuffle on|off | repeat off|all|one | reshuffle
  load <file.json> | add <file.json>  replace / extend the queue
  remove <n> | move <from> <to> | clear
  sleep <minutes> [songs] | sleep off
  quality <low|medium|high|highest> | crossfade <ms>
  status | help | quit";

const DEFAULT_SEEK_STEP: f64 = 10.0;

/// One parsed input line
#[derive(Debug)]
pub enum Input {
    Player(PlayerCommand),
    /// Replace the queue with the tracks in a JSON file
    Load(PathBuf),
    /// Append the tracks in a JSON file
    Add(PathBuf),
    Quality(AudioQuality),
    Crossfade(u32),
    Status,
    Help,
    Quit,
    Empty,
}

/// Parse one line of user input
pub fn parse_line(line: &str) -> Result<Input> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Input::Empty);
    };
    let args: Vec<&str> = words.collect();
    let verb = verb.to_ascii_lowercase();

    let input = match (verb.as_str(), args.as_slice()) {
        ("play", []) => Input::Player(PlayerCommand::Play),
        ("pause", []) => Input::Player(PlayerCommand::Pause),
        ("toggle" | "p", []) => Input::Player(PlayerCommand::TogglePlayPause),
        ("stop", []) => Input::Player(PlayerCommand::Stop),
        ("next" | "n", []) => Input::Player(PlayerCommand::Next),
        ("prev" | "previous", []) => Input::Player(PlayerCommand::Previous),
        ("goto", [n]) => Input::Player(PlayerCommand::PlayIndex(position(n)?)),
        ("seek", [secs]) => Input::Player(PlayerCommand::Seek(Duration::from_secs_f64(seconds(secs)?))),
        ("fwd", []) => Input::Player(PlayerCommand::SeekBy(DEFAULT_SEEK_STEP)),
        ("fwd", [secs]) => Input::Player(PlayerCommand::SeekBy(seconds(secs)?)),
        ("back", []) => Input::Player(PlayerCommand::SeekBy(-DEFAULT_SEEK_STEP)),
        ("back", [secs]) => Input::Player(PlayerCommand::SeekBy(-seconds(secs)?)),
        ("vol" | "volume", [level]) => {
            let level: u8 = number(level)?;
            if level > 100 {
                return Err(CliError::Parse("volume must be 0-100".into()));
            }
            Input::Player(PlayerCommand::SetVolume(f32::from(level) / 100.0))
        }
        ("mute", []) => Input::Player(PlayerCommand::Mute),
        ("unmute", []) => Input::Player(PlayerCommand::Unmute),
        ("shuffle", [flag]) => Input::Player(PlayerCommand::SetShuffle(on_off(flag)?)),
        ("repeat", [mode]) => Input::Player(PlayerCommand::SetRepeat(
            RepeatMode::from_str(&mode.to_ascii_lowercase())
                .ok_or_else(|| CliError::Parse(format!("unknown repeat mode '{mode}'")))?,
        )),
        ("reshuffle", []) => Input::Player(PlayerCommand::ShuffleQueue),
        ("load", [path]) => Input::Load(PathBuf::from(path)),
        ("add", [path]) => Input::Add(PathBuf::from(path)),
        ("remove", [n]) => Input::Player(PlayerCommand::RemoveFromQueue(position(n)?)),
        ("move", [from, to]) => Input::Player(PlayerCommand::MoveQueueItem {
            from: position(from)?,
            to: position(to)?,
        }),
        ("clear", []) => Input::Player(PlayerCommand::ClearQueue),
        ("sleep", ["off"]) => Input::Player(PlayerCommand::ClearSleepTimer),
        ("sleep", [minutes]) => Input::Player(PlayerCommand::SetSleepTimer {
            minutes: number(minutes)?,
            songs: 0,
        }),
        ("sleep", [minutes, songs]) => Input::Player(PlayerCommand::SetSleepTimer {
            minutes: number(minutes)?,
            songs: number(songs)?,
        }),
        ("quality", [q]) => Input::Quality(
            AudioQuality::from_str(&q.to_ascii_lowercase())
                .ok_or_else(|| CliError::Parse(format!("unknown quality '{q}'")))?,
        ),
        ("crossfade", [ms]) => Input::Crossfade(number(ms)?),
        ("status" | "s", []) => Input::Status,
        ("help" | "?", []) => Input::Help,
        ("quit" | "exit" | "q", []) => Input::Quit,
        _ => return Err(CliError::Parse(format!("unrecognised command '{}' (try 'help')", line.trim()))),
    };
    Ok(input)
}

fn number<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse()
        .map_err(|_| CliError::Parse(format!("'{s}' is not a valid number")))
}

/// 1-based position from the user, 0-based index for the queue
fn position(s: &str) -> Result<usize> {
    match number::<usize>(s)? {
        0 => Err(CliError::Parse("positions start at 1".into())),
        n => Ok(n - 1),
    }
}

fn seconds(s: &str) -> Result<f64> {
    let secs: f64 = number(s)?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(CliError::Parse(format!("'{s}' is not a valid number of seconds")))
    }
}

fn on_off(s: &str) -> Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(CliError::Parse(format!("expected on or off, got '{s}'"))),
    }
}
