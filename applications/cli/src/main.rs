/// Tune Player - command-line music player
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tune_cli::{format_event, format_status, parse_line, read_queue_file, AppConfig, CliArgs, Input, HELP};
use tune_core::{load_state, StateStore};
use tune_playback::{
    AudioBackend, OrchestratorSettings, PlayerCommand, PlayerConfig, PlayerHandle, PlayerRuntime, CONFIG_NAMESPACE,
};
use tune_storage::JsonFileStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tune_player=info,tune_cli=info,tune_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    // First pass only decides where state lives
    let mut bootstrap = AppConfig::load(args.config.as_deref(), PlayerConfig::default())?;
    bootstrap.apply_args(&args);
    let store = match &bootstrap.state_dir {
        Some(dir) => JsonFileStore::open(dir),
        None => JsonFileStore::open_default(&bootstrap.app_name),
    }
    .context("failed to open state directory")?;
    info!(root = %store.root().display(), "Using state directory");

    let persisted = match load_state::<PlayerConfig>(&store, CONFIG_NAMESPACE) {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable player config");
            PlayerConfig::default()
        }
    };
    let mut config = AppConfig::load(args.config.as_deref(), persisted)?;
    config.apply_args(&args);
    debug!(?config, "Configuration loaded");

    #[cfg(feature = "rodio-output")]
    let backend = tune_audio_desktop::RodioBackend::open_default().context("failed to open audio output")?;
    #[cfg(not(feature = "rodio-output"))]
    let backend = tune_audio_desktop::HeadlessBackend::new()?;

    run(backend, config, Arc::new(store), &args).await
}

async fn run<B: AudioBackend + 'static>(
    backend: B,
    config: AppConfig,
    store: Arc<dyn StateStore>,
    args: &CliArgs,
) -> anyhow::Result<()> {
    let settings = OrchestratorSettings {
        app_name: config.app_name.clone(),
        ..OrchestratorSettings::default()
    };

    #[allow(unused_mut)]
    let mut builder = PlayerRuntime::builder(backend)
        .config(config.player)
        .settings(settings)
        .with_store(store);

    #[cfg(feature = "os-controls")]
    match tune_audio_desktop::SouvlakiPlatform::new("tune_player", &config.app_name) {
        Ok(platform) => builder = builder.with_media_platform(Box::new(platform)),
        Err(e) => warn!(error = %e, "OS media controls unavailable"),
    }

    let (runtime, handle) = builder.build();

    if let Some(path) = &args.queue {
        handle.set_queue(read_queue_file(path)?)?;
    }
    let minutes = args.sleep_minutes.unwrap_or(0);
    let songs = args.sleep_songs.unwrap_or(0);
    if minutes > 0 || songs > 0 {
        handle.set_sleep_timer(minutes, songs)?;
    }

    let front = front_end(handle, config.player);
    let (run, front) = tokio::join!(runtime.run(), front);
    front?;
    run?;
    info!("Player stopped");
    Ok(())
}

/// Read commands from stdin and print player events until quit or EOF
async fn front_end(handle: PlayerHandle, mut player_config: PlayerConfig) -> anyhow::Result<()> {
    let mut events = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => {
                        if let Err(e) = apply(&handle, &mut player_config, input).await {
                            eprintln!("{e}");
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(text) = format_event(&event) {
                        println!("{text}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Err(e) = handle.shutdown() {
        debug!(error = %e, "Runtime already stopped");
    }
    Ok(())
}

async fn apply(handle: &PlayerHandle, player_config: &mut PlayerConfig, input: Input) -> anyhow::Result<()> {
    match input {
        Input::Player(command) => handle.send(command)?,
        Input::Load(path) => handle.set_queue(read_queue_file(&path)?)?,
        Input::Add(path) => handle.add_to_queue(read_queue_file(&path)?)?,
        Input::Quality(quality) => {
            player_config.audio_quality = quality;
            handle.send(PlayerCommand::SetConfig(*player_config))?;
        }
        Input::Crossfade(ms) => {
            player_config.set_crossfade_ms(ms);
            handle.send(PlayerCommand::SetConfig(*player_config))?;
        }
        Input::Status => println!("{}", format_status(&handle.status().await?)),
        Input::Help => println!("{HELP}"),
        Input::Quit | Input::Empty => {}
    }
    Ok(())
}
