//! Prometheus Metrics Registry - Tracker Observability
//!
//! Mirrors tracker lifecycle events into Prometheus metrics and exposes
//! them on `/metrics`. Fed by an ordinary tracker listener.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::transaction::{LifecycleEvent, TrackedTransaction};
use crate::usecases::listeners::Subscription;
use crate::usecases::transaction_tracker::TransactionTracker;

/// Centralized Prometheus metrics for the tracker.
///
/// All metrics follow the naming convention `tx_tracker_*` and carry a
/// `kind` label (donation, governance-vote, ...).
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Transactions registered.
    pub transactions_added: IntCounterVec,
    /// Transactions that reached a terminal status.
    pub transactions_settled: IntCounterVec,
    /// Records evicted (grace period or explicit removal).
    pub transactions_removed: IntCounterVec,
    /// Records currently held by the tracker.
    pub tracked: IntGauge,
    /// Time from submission to terminal status (seconds).
    pub settle_latency_seconds: HistogramVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transactions_added = IntCounterVec::new(
            Opts::new("tx_tracker_transactions_added_total", "Transactions registered for tracking"),
            &["kind"],
        )?;

        let transactions_settled = IntCounterVec::new(
            Opts::new(
                "tx_tracker_transactions_settled_total",
                "Transactions that reached a terminal status",
            ),
            &["kind", "status"],
        )?;

        let transactions_removed = IntCounterVec::new(
            Opts::new("tx_tracker_transactions_removed_total", "Tracked records evicted"),
            &["kind"],
        )?;

        let tracked = IntGauge::new("tx_tracker_tracked_transactions", "Records currently tracked")?;

        let settle_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tx_tracker_settle_latency_seconds",
                "Time from submission to terminal status",
            )
            .buckets(vec![1.0, 3.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
            &["status"],
        )?;

        // Register all metrics
        registry.register(Box::new(transactions_added.clone()))?;
        registry.register(Box::new(transactions_settled.clone()))?;
        registry.register(Box::new(transactions_removed.clone()))?;
        registry.register(Box::new(tracked.clone()))?;
        registry.register(Box::new(settle_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            transactions_added,
            transactions_settled,
            transactions_removed,
            tracked,
            settle_latency_seconds,
        })
    }

    /// Record one lifecycle event.
    pub fn observe(&self, event: &LifecycleEvent) {
        let tx = event.transaction();
        let kind = tx.kind.as_str();

        match event {
            LifecycleEvent::Added(_) => {
                self.transactions_added.with_label_values(&[kind]).inc();
                self.tracked.inc();
            }
            LifecycleEvent::Updated(_) => {
                if tx.is_terminal() {
                    self.transactions_settled
                        .with_label_values(&[kind, tx.status.as_str()])
                        .inc();
                    self.settle_latency_seconds
                        .with_label_values(&[tx.status.as_str()])
                        .observe(settle_latency(tx));
                }
            }
            LifecycleEvent::Removed(_) => {
                self.transactions_removed.with_label_values(&[kind]).inc();
                self.tracked.dec();
            }
        }
    }

    /// Subscribe this registry to `tracker`'s lifecycle events.
    pub fn attach(self: &Arc<Self>, tracker: &TransactionTracker) -> Subscription {
        let metrics = Arc::clone(self);
        tracker.add_listener(move |event| {
            metrics.observe(event);
            Ok(())
        })
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode metrics");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn settle_latency(tx: &TrackedTransaction) -> f64 {
    (tx.updated_at - tx.submitted_at).num_milliseconds().max(0) as f64 / 1000.0
}
