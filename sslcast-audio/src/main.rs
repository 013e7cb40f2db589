//! SSLCast Audio Playback - Main entry point
//!
//! Subscribes to the `event` topic on the SSLCast bus and plays configured
//! audio commentary with priority preemption on a single output channel.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sslcast_audio::backend::RodioBackend;
use sslcast_audio::{PlaybackScheduler, SchedulerMsg};
use sslcast_common::bus::{BusSubscriber, TOPIC_EVENT};
use sslcast_common::config::{load_yaml, AudioConfig};
use sslcast_common::GameEvent;

/// Bound on scheduler messages buffered between bus bridge and scheduler
const SCHEDULER_CHANNEL_CAPACITY: usize = 64;

/// Command-line arguments for sslcast-audio
#[derive(Parser, Debug)]
#[command(name = "sslcast-audio")]
#[command(about = "Audio commentary playback for SSLCast")]
#[command(version)]
struct Args {
    /// Path to the audio configuration file
    #[arg(
        short,
        long,
        default_value = "config/config_audio.yaml",
        env = "SSLCAST_AUDIO_CONFIG"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sslcast_audio=debug,sslcast_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config: AudioConfig = load_yaml(&args.config).context("Failed to load audio config")?;

    info!(
        "Starting SSLCast Audio: bus {}, sounds dir {}",
        config.bus_addr,
        config.sounds_dir.display()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (msg_tx, msg_rx) = mpsc::channel(SCHEDULER_CHANNEL_CAPACITY);

    // Backend completions re-enter the scheduler through the same channel as
    // bus events; blocking_send is fine from the backend's own OS thread
    let completion_tx = msg_tx.clone();
    let backend = RodioBackend::spawn(move |token| {
        if completion_tx
            .blocking_send(SchedulerMsg::Finished(token))
            .is_err()
        {
            warn!("Scheduler gone, dropping completion for token {token}");
        }
    })
    .context("Failed to start audio backend")?;

    let mut subscriber = BusSubscriber::connect(
        config.bus_addr.clone(),
        vec![TOPIC_EVENT.to_string()],
        shutdown_rx.clone(),
    );

    let scheduler = PlaybackScheduler::new(backend, config);
    let scheduler_handle = tokio::spawn(scheduler.run(msg_rx, shutdown_rx));

    // Bridge bus frames into scheduler messages
    let bridge_handle = tokio::spawn(async move {
        while let Some(frame) = subscriber.recv().await {
            let payload = match frame.payload_str() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Dropping non-UTF-8 event frame: {}", e);
                    continue;
                }
            };
            match GameEvent::from_json(payload) {
                Ok(event) => {
                    if msg_tx.send(SchedulerMsg::Event(event)).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!("Dropping undecodable event: {}", e),
            }
        }
        info!("Bus subscriber closed");
    });

    shutdown_signal().await;
    info!("Shutting down");
    let _ = shutdown_tx.send(true);

    let _ = scheduler_handle.await;
    bridge_handle.abort();

    info!("Audio playback shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
