/// Player application configuration
use crate::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tune_core::AudioQuality;
use tune_playback::PlayerConfig;

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "tune.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    /// Where queue and settings are persisted (platform data dir when unset)
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default = "default_app_name")]
    pub app_name: String,
}

fn default_app_name() -> String {
    "Tune".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            state_dir: None,
            app_name: default_app_name(),
        }
    }
}

impl AppConfig {
    /// Layer `path` (or `tune.toml` if present) and `TUNE_*` environment
    /// variables over `persisted`, the player config saved last session
    pub fn load(path: Option<&Path>, persisted: PlayerConfig) -> Result<Self> {
        Self::load_with_env(path, persisted, config::Environment::with_prefix("TUNE"))
    }

    fn load_with_env(path: Option<&Path>, persisted: PlayerConfig, env: config::Environment) -> Result<Self> {
        let base = Self {
            player: persisted,
            ..Self::default()
        };
        let mut settings = config::Config::builder().add_source(config::Config::try_from(&base)?);

        match path {
            Some(path) => settings = settings.add_source(config::File::from(path)),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if default.exists() {
                    settings = settings.add_source(config::File::from(default));
                }
            }
        }

        // TUNE_PLAYER__CROSSFADE_MS -> player.crossfade_ms
        settings = settings.add_source(
            env.prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.player = self.player.sanitized();
        self
    }

    /// Command-line flags win over file and environment
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(quality) = args.quality {
            self.player.audio_quality = quality;
        }
        if let Some(ms) = args.crossfade_ms {
            self.player.set_crossfade_ms(ms);
        }
        if args.no_preload {
            self.player.preload_next = false;
        }
        if let Some(dir) = &args.state_dir {
            self.state_dir = Some(dir.clone());
        }
    }
}

/// Command-line arguments of `tune-player`
#[derive(Debug, Clone, Parser)]
#[command(name = "tune-player")]
#[command(version, about = "Tune command-line music player", long_about = None)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Streaming quality (low, medium, high, highest)
    #[arg(long, value_parser = parse_quality)]
    pub quality: Option<AudioQuality>,

    /// Crossfade length in milliseconds (0 disables, max 10000)
    #[arg(long)]
    pub crossfade_ms: Option<u32>,

    /// Do not fetch the next track in advance
    #[arg(long)]
    pub no_preload: bool,

    /// Directory for persisted queue and settings
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// JSON file with tracks to replace the queue with
    #[arg(long)]
    pub queue: Option<PathBuf>,

    /// Pause playback after this many minutes
    #[arg(long)]
    pub sleep_minutes: Option<u32>,

    /// Pause playback after this many songs
    #[arg(long)]
    pub sleep_songs: Option<u32>,
}

fn parse_quality(s: &str) -> std::result::Result<AudioQuality, String> {
    AudioQuality::from_str(&s.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown quality '{s}' (expected low, medium, high or highest)"))
}
