//! Configuration Module - TOML-based Tracker Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! RPC endpoints, polling cadence and server addresses are externalized
//! here - nothing is hardcoded in the usecases layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

/// Top-level application configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the tracker begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Application identity and logging.
  pub app: AppSection,
  /// JSON-RPC endpoint.
  pub rpc: RpcConfig,
  /// Polling cadence and retention.
  #[serde(default)]
  pub tracker: TrackerConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Application identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Human-readable name used in logs.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// JSON-RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
  /// HTTP(S) or WS(S) endpoint URL.
  pub url: String,
  /// Refuse to start if the node reports a different chain id.
  pub expected_chain_id: Option<u64>,
  /// How often the health task re-checks connectivity (seconds).
  #[serde(default = "default_health_check_interval")]
  pub health_check_interval_secs: u64,
}

impl RpcConfig {
  /// Endpoint as `scheme://host[:port]`, safe for logs.
  ///
  /// Hosted RPC URLs often embed the API key in the path or userinfo,
  /// so path, query and credentials are dropped.
  pub fn endpoint_label(&self) -> String {
    let (scheme, rest) = self.url.split_once("://").unwrap_or(("", self.url.as_str()));
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    if scheme.is_empty() {
      host.to_string()
    } else {
      format!("{scheme}://{host}")
    }
  }
}

/// Receipt polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
  /// Delay before the first receipt query (milliseconds).
  #[serde(default = "default_warmup_ms")]
  pub warmup_ms: u64,
  /// Delay between receipt queries (milliseconds).
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
  /// Unresolved polls before a transaction times out.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Ceiling for the error backoff (milliseconds).
  #[serde(default = "default_max_backoff_ms")]
  pub max_backoff_ms: u64,
  /// How long terminal records stay queryable (seconds).
  #[serde(default = "default_grace_period_secs")]
  pub grace_period_secs: u64,
  /// Buffer of the status-change broadcast channel.
  #[serde(default = "default_status_channel_capacity")]
  pub status_channel_capacity: usize,
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      warmup_ms: default_warmup_ms(),
      poll_interval_ms: default_poll_interval_ms(),
      max_retries: default_max_retries(),
      max_backoff_ms: default_max_backoff_ms(),
      grace_period_secs: default_grace_period_secs(),
      status_channel_capacity: default_status_channel_capacity(),
    }
  }
}

/// Runtime form of [`TrackerConfig`] with `Duration`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
  /// Delay before the first poll.
  pub warmup: Duration,
  /// Delay between polls.
  pub poll_interval: Duration,
  /// Retry budget.
  pub max_retries: u32,
  /// Error backoff ceiling.
  pub max_backoff: Duration,
  /// Retention after a terminal status.
  pub grace_period: Duration,
  /// Status broadcast buffer.
  pub status_channel_capacity: usize,
}

impl Default for TrackerSettings {
  fn default() -> Self {
    Self::from(&TrackerConfig::default())
  }
}

impl From<&TrackerConfig> for TrackerSettings {
  fn from(config: &TrackerConfig) -> Self {
    Self {
      warmup: Duration::from_millis(config.warmup_ms),
      poll_interval: Duration::from_millis(config.poll_interval_ms),
      max_retries: config.max_retries,
      max_backoff: Duration::from_millis(config.max_backoff_ms),
      grace_period: Duration::from_secs(config.grace_period_secs),
      status_channel_capacity: config.status_channel_capacity,
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: default_true(),
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

const fn default_health_check_interval() -> u64 {
  15
}

const fn default_warmup_ms() -> u64 {
  1_000
}

const fn default_poll_interval_ms() -> u64 {
  2_000
}

const fn default_max_retries() -> u32 {
  30
}

const fn default_max_backoff_ms() -> u64 {
  30_000
}

const fn default_grace_period_secs() -> u64 {
  300 // 5 minutes
}

const fn default_status_channel_capacity() -> usize {
  256
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

const fn default_health_port() -> u16 {
  8080
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rpc(url: &str) -> RpcConfig {
    RpcConfig {
      url: url.to_string(),
      expected_chain_id: None,
      health_check_interval_secs: default_health_check_interval(),
    }
  }

  #[test]
  fn test_endpoint_label_hides_secrets() {
    assert_eq!(
      rpc("https://user:pw@eth.example.com/v3/SECRET?x=1").endpoint_label(),
      "https://eth.example.com"
    );
    assert_eq!(rpc("http://localhost:8545").endpoint_label(), "http://localhost:8545");
    assert_eq!(rpc("localhost:8545/abc").endpoint_label(), "localhost:8545");
  }
}
