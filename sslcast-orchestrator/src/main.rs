//! SSLCast Orchestrator - Main entry point
//!
//! Listens to the game-controller multicast group, derives game events from
//! referee snapshots, and publishes them on the SSLCast bus together with
//! periodic state updates.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sslcast_common::bus::BusPublisher;
use sslcast_common::config::{load_yaml, OrchestratorConfig, PriorityConfig};
use sslcast_orchestrator::{listener, orchestrator, GameTracker};

/// Bound on snapshots buffered between listener and tracker
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Command-line arguments for sslcast-orchestrator
#[derive(Parser, Debug)]
#[command(name = "sslcast-orchestrator")]
#[command(about = "Referee event orchestrator for SSLCast")]
#[command(version)]
struct Args {
    /// Path to the orchestrator configuration file
    #[arg(
        short,
        long,
        default_value = "config/config_orchestrator.yaml",
        env = "SSLCAST_ORCHESTRATOR_CONFIG"
    )]
    config: PathBuf,

    /// Path to the event priority table
    #[arg(
        short,
        long,
        default_value = "config/config_priority.yaml",
        env = "SSLCAST_PRIORITY_CONFIG"
    )]
    priorities: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sslcast_orchestrator=debug,sslcast_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config: OrchestratorConfig =
        load_yaml(&args.config).context("Failed to load orchestrator config")?;
    let priorities: PriorityConfig =
        load_yaml(&args.priorities).context("Failed to load priority table")?;

    info!(
        "Starting SSLCast Orchestrator: multicast {}:{}, bus {}",
        config.multicast.group, config.multicast.port, config.bus_bind_addr
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let publisher = BusPublisher::bind(&config.bus_bind_addr, shutdown_rx.clone())
        .await
        .context("Failed to bind bus publisher")?;

    let (snapshot_tx, snapshot_rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
    let listener_handle = tokio::spawn(listener::run(
        config.multicast.clone(),
        snapshot_tx,
        shutdown_rx.clone(),
    ));

    let (state_tx, state_rx) = watch::channel(None);
    let republish_handle = tokio::spawn(orchestrator::republish_state(
        publisher.clone(),
        state_rx,
        Duration::from_secs_f64(config.state_publish_interval_secs),
        shutdown_rx.clone(),
    ));

    let tracker = GameTracker::new(priorities);
    let orchestrator_handle = tokio::spawn(orchestrator::run(
        tracker,
        publisher,
        snapshot_rx,
        state_tx,
        shutdown_rx,
    ));

    shutdown_signal().await;
    info!("Shutting down");
    let _ = shutdown_tx.send(true);

    let _ = listener_handle.await;
    let _ = republish_handle.await;
    let _ = orchestrator_handle.await;

    info!("Orchestrator shutdown complete");
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
