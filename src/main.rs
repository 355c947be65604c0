//! Donation Transaction Tracker - Entry Point
//!
//! Initializes configuration, logging and the RPC wallet, then tracks
//! the transactions given on the command line until SIGINT.
//!
//! Wiring sequence:
//! 1. Parse CLI flags, load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Connect the RPC wallet (chain id check)
//! 4. Create the TransactionTracker with the log notifier
//! 5. Attach Prometheus metrics, spawn metrics + health servers
//! 6. Spawn the RPC connectivity monitor
//! 7. Register `--track` hashes and log every status change
//! 8. Wait for SIGINT → graceful shutdown (signal→cancel timers→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use donation_tx_tracker::adapters::chain::RpcWallet;
use donation_tx_tracker::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use donation_tx_tracker::adapters::notify::LogNotifier;
use donation_tx_tracker::config::{self, TrackerSettings};
use donation_tx_tracker::domain::transaction::{Metadata, TxKind};
use donation_tx_tracker::usecases::TransactionTracker;

/// Track donation DApp transactions until they settle on-chain.
#[derive(Debug, Parser)]
#[command(name = "tx-tracker", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Transaction to track, as `<hash>` or `<hash>:<kind>`. Repeatable.
    #[arg(short, long = "track", value_name = "HASH[:KIND]")]
    track: Vec<String>,
}

/// Split a `--track` argument into hash and kind.
fn parse_track_arg(arg: &str) -> (String, TxKind) {
    match arg.split_once(':') {
        Some((hash, kind)) => (hash.to_string(), TxKind::from(kind)),
        None => (arg.to_string(), TxKind::Unknown),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let config = config::loader::load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        tracked_on_start = cli.track.len(),
        "Starting transaction tracker"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Connect the RPC wallet ───────────────────────────
    let wallet = Arc::new(
        RpcWallet::connect(&config.rpc)
            .await
            .context("Failed to connect RPC wallet")?,
    );

    // ── 5. Create the tracker ───────────────────────────────
    let settings = TrackerSettings::from(&config.tracker);
    let tracker = TransactionTracker::new(wallet.clone(), Arc::new(LogNotifier), settings);

    // ── 6. Metrics + health servers ─────────────────────────
    let health = Arc::new(HealthState::new());
    let mut servers = Vec::new();
    let _metrics_subscription = if config.metrics.enabled {
        let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
        let subscription = metrics.attach(&tracker);

        let metrics_shutdown = shutdown_tx.subscribe();
        let bind_address = config.metrics.bind_address.clone();
        servers.push(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind_address, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }));

        let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
        let health_shutdown = shutdown_tx.subscribe();
        servers.push(tokio::spawn(async move {
            if let Err(e) = health_server.run(health_shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }));

        Some(subscription)
    } else {
        None
    };

    // ── 7. RPC connectivity monitor ─────────────────────────
    let monitor_handle = tokio::spawn(Arc::clone(&wallet).monitor(
        Duration::from_secs(config.rpc.health_check_interval_secs),
        Arc::clone(&health.wallet_connected),
        shutdown_tx.subscribe(),
    ));

    // ── 8. Log status changes, then register CLI hashes ─────
    let mut status_rx = tracker.subscribe_status_changes();
    let mut status_shutdown = shutdown_tx.subscribe();
    let status_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = status_shutdown.recv() => break,
                received = status_rx.recv() => match received {
                    Ok(tx) => info!(
                        hash = %tx.hash,
                        kind = %tx.kind,
                        status = %tx.status,
                        retries = tx.retry_count,
                        "transactionStatusChanged"
                    ),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Status subscriber lagging");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    for arg in &cli.track {
        let (hash, kind) = parse_track_arg(arg);
        tracker.add_transaction(hash, kind, Metadata::new());
    }

    info!(tracked = tracker.len(), "Tracker running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // 1. Readiness probe → 503
    health.tracker_running.store(false, Ordering::Relaxed);

    // 2. Signal all tasks to stop
    let _ = shutdown_tx.send(());

    // 3. Cancel pending polls and evictions
    tracker.shutdown();
    wallet.disconnect();
    for tx in tracker.get_all_transactions() {
        info!(hash = %tx.hash, status = %tx.status, "Final status");
    }

    // 4. Wait for background tasks (up to 5s each)
    let _ = tokio::time::timeout(Duration::from_secs(5), monitor_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), status_handle).await;
    for handle in servers {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
