//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7 for Docker
//! health checks and monitoring. Readiness depends on the RPC wallet
//! connection and on the tracker accepting work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Shared health state polled by readiness probes.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Whether the RPC wallet answered its last probe.
    pub wallet_connected: Arc<AtomicBool>,
    /// Whether the tracker is running (false during shutdown).
    pub tracker_running: Arc<AtomicBool>,
}

impl HealthState {
    /// Create a new health state (all healthy by default).
    pub fn new() -> Self {
        Self {
            wallet_connected: Arc::new(AtomicBool::new(true)),
            tracker_running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Check if the system is ready to serve traffic.
    pub fn is_ready(&self) -> bool {
        self.wallet_connected.load(Ordering::Relaxed)
            && self.tracker_running.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    /// Health state shared with all components.
    state: Arc<HealthState>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub const fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Start the health check server in the background.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(Arc::clone(&self.state));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: returns 200 only if the wallet is connected.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_requires_wallet() {
        let state = HealthState::new();
        assert!(state.is_ready());

        state.wallet_connected.store(false, Ordering::Relaxed);
        assert!(!state.is_ready());
    }
}
