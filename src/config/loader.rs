//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
  let path = path.as_ref();

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    rpc = %config.rpc.endpoint_label(),
    max_retries = config.tracker.max_retries,
    poll_interval_ms = config.tracker.poll_interval_ms,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty RPC endpoint with a known scheme
/// - Positive polling cadence and retry budget
/// - Backoff ceiling not below the poll interval
fn validate_config(config: &AppConfig) -> Result<()> {
  // RPC validation
  anyhow::ensure!(!config.rpc.url.is_empty(), "RPC URL must not be empty");
  anyhow::ensure!(
    ["http://", "https://", "ws://", "wss://"]
      .iter()
      .any(|scheme| config.rpc.url.starts_with(scheme)),
    "RPC URL must be http(s) or ws(s), got {}",
    config.rpc.url
  );
  anyhow::ensure!(
    config.rpc.health_check_interval_secs > 0,
    "health_check_interval_secs must be positive"
  );

  // Tracker validation
  let tracker = &config.tracker;
  anyhow::ensure!(
    tracker.poll_interval_ms > 0,
    "poll_interval_ms must be positive"
  );
  anyhow::ensure!(
    tracker.max_retries > 0,
    "max_retries must be positive, got {}",
    tracker.max_retries
  );
  anyhow::ensure!(
    tracker.max_backoff_ms >= tracker.poll_interval_ms,
    "max_backoff_ms ({}) must be >= poll_interval_ms ({})",
    tracker.max_backoff_ms,
    tracker.poll_interval_ms
  );
  anyhow::ensure!(
    tracker.status_channel_capacity > 0,
    "status_channel_capacity must be positive"
  );

  // Metrics validation
  if config.metrics.enabled {
    anyhow::ensure!(
      !config.metrics.bind_address.is_empty(),
      "Metrics bind address must not be empty"
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL: &str = r#"
    [app]
    name = "tracker"

    [rpc]
    url = "http://localhost:8545"
  "#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = parse_config(MINIMAL).unwrap();
    assert_eq!(config.app.log_level, "info");
    assert_eq!(config.tracker.warmup_ms, 1_000);
    assert_eq!(config.tracker.poll_interval_ms, 2_000);
    assert_eq!(config.tracker.max_retries, 30);
    assert_eq!(config.tracker.grace_period_secs, 300);
    assert!(config.rpc.expected_chain_id.is_none());
    assert!(config.metrics.enabled);
  }

  #[test]
  fn test_rejects_bad_scheme() {
    let content = MINIMAL.replace("http://localhost:8545", "localhost:8545");
    assert!(parse_config(&content).is_err());
  }

  #[test]
  fn test_rejects_zero_retries() {
    let content = format!("{MINIMAL}\n[tracker]\nmax_retries = 0\n");
    assert!(parse_config(&content).is_err());
  }

  #[test]
  fn test_rejects_backoff_below_interval() {
    let content = format!("{MINIMAL}\n[tracker]\npoll_interval_ms = 5000\nmax_backoff_ms = 1000\n");
    let err = parse_config(&content).unwrap_err();
    assert!(err.to_string().contains("max_backoff_ms"));
  }

  #[test]
  fn test_logged_endpoint_drops_api_key() {
    let content = MINIMAL.replace(
      "http://localhost:8545",
      "https://mainnet.example.io/v3/0123456789abcdef",
    );
    let config = parse_config(&content).unwrap();
    let label = config.rpc.endpoint_label();
    assert_eq!(label, "https://mainnet.example.io");
    assert!(!label.contains("0123456789abcdef"));
  }

  #[test]
  fn test_settings_conversion() {
    let config = parse_config(MINIMAL).unwrap();
    let settings = crate::config::TrackerSettings::from(&config.tracker);
    assert_eq!(settings.warmup, std::time::Duration::from_secs(1));
    assert_eq!(settings.grace_period, std::time::Duration::from_secs(300));
  }
}
