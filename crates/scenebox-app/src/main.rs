//! Scenebox - Scene player
//!
//! Plays one scene of a sound library through the default output device.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use scenebox_audio::{load_scene, DeviceOutput, MediaEvent, Track};
use scenebox_core::{human_time_interval, EngineConfig, Library};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Scenebox - play a soundboard scene
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sound library JSON
    library: PathBuf,
    /// Scene id or name
    scene: String,
    /// Directory holding the sound files (default: `sounds/` next to the library)
    #[arg(long)]
    sounds: Option<PathBuf>,
    /// Engine configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Scenebox starting...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: EngineConfig) -> Result<()> {
    let library = Library::load(&args.library)
        .with_context(|| format!("loading library {}", args.library.display()))?;
    let scene = library
        .scene(&args.scene)
        .cloned()
        .ok_or_else(|| anyhow!("no scene named {}", args.scene))?;
    let sounds_dir = match args.sounds {
        Some(dir) => dir,
        None => args
            .library
            .parent()
            .map(|p| p.join("sounds"))
            .unwrap_or_else(|| PathBuf::from("sounds")),
    };

    let mut mixer = scenebox_audio::create_mixer(&config)?;
    let _output = DeviceOutput::open_with_block_size(mixer.context(), config.block_size as u32)?;
    let prior = mixer.resume_context();
    info!(%prior, "Audio context resume requested");

    let channel = mixer.add_channel(Some("scene"))?;
    let tracks = load_scene(channel, &library, &scene, &sounds_dir)?;
    if tracks.is_empty() {
        warn!(scene = %scene.name, "Scene has no sounds");
        mixer.close();
        return Ok(());
    }

    let mut finished = true;
    for track in &tracks {
        if !play_to_end(track).await {
            finished = false;
            break;
        }
    }
    if finished {
        info!(scene = %scene.name, "Scene finished");
    }

    if let Some(channel) = mixer.get_channel_mut("scene") {
        let fade = channel.fade_out(Some(Duration::from_millis(1000)))?;
        fade.await;
    }
    mixer.close();
    Ok(())
}

/// Play one playlist entry until it ends or fails to start. Returns false
/// when interrupted.
async fn play_to_end(track: &Track) -> bool {
    let mut events = track.subscribe();
    info!(track = %track.id(), looping = track.looping(), "Starting track");
    if let Err(e) = track.play().await {
        warn!(track = %track.id(), error = %e, "Skipping track");
        return true;
    }

    let mut status = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return false;
            }
            event = events.recv() => match event {
                Ok(MediaEvent::Ended) => {
                    debug!(track = %track.id(), "Track ended");
                    return true;
                }
                Ok(event) => debug!(track = %track.id(), ?event, "Track event"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(track = %track.id(), skipped, "Missed track events");
                    if track.ended() {
                        return true;
                    }
                }
                Err(RecvError::Closed) => return true,
            },
            _ = status.tick() => {
                let total = track
                    .duration()
                    .map(|d| human_time_interval((d * 1000.0) as u64))
                    .unwrap_or_else(|| "--:--".into());
                info!(
                    track = %track.id(),
                    position = %human_time_interval((track.time() * 1000.0) as u64),
                    %total,
                    "Playing"
                );
            }
        }
    }
}
