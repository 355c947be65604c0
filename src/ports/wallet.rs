//! Wallet Provider Port - Injected Wallet / RPC Interface
//!
//! Defines the trait the tracker uses to reach the chain: a connection
//! flag, a handle describing the active provider, and a raw JSON-RPC
//! `request(method, params)` entry point.
//!
//! Methods the tracker issues:
//! - `eth_getTransactionReceipt` (polling loop)
//! - `eth_estimateGas`, `eth_gasPrice` (on-demand cost estimation)

use async_trait::async_trait;

/// JSON-RPC method names used by the tracker.
pub mod methods {
  /// Receipt lookup by transaction hash.
  pub const GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
  /// Gas estimation for a call object.
  pub const ESTIMATE_GAS: &str = "eth_estimateGas";
  /// Current gas price in wei.
  pub const GAS_PRICE: &str = "eth_gasPrice";
}

/// Descriptor of the provider behind a wallet adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHandle {
  /// Human-readable label (wallet name or RPC host).
  pub label: String,
  /// Chain the provider is connected to, when known.
  pub chain_id: Option<u64>,
}

/// Errors surfaced by a wallet adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
  /// No wallet / provider is connected.
  #[error("wallet not connected")]
  NotConnected,
  /// The RPC call itself failed (transport, node error).
  #[error("{method} failed: {message}")]
  Request {
    /// JSON-RPC method.
    method: String,
    /// Provider error text.
    message: String,
  },
  /// The adapter does not implement this method.
  #[error("unsupported method: {0}")]
  UnsupportedMethod(String),
  /// The provider answered with something we cannot decode.
  #[error("malformed {method} response: {reason}")]
  MalformedResponse {
    /// JSON-RPC method.
    method: String,
    /// Decode failure.
    reason: String,
  },
}

impl AdapterError {
  /// Build a `Request` error from any displayable cause.
  pub fn request(method: &str, cause: impl std::fmt::Display) -> Self {
    Self::Request {
      method: method.to_string(),
      message: cause.to_string(),
    }
  }

  /// Build a `MalformedResponse` error from any displayable cause.
  pub fn malformed(method: &str, cause: impl std::fmt::Display) -> Self {
    Self::MalformedResponse {
      method: method.to_string(),
      reason: cause.to_string(),
    }
  }
}

/// Trait for wallet / provider adapters.
///
/// Implementors wrap an injected wallet or a plain JSON-RPC endpoint.
/// The tracker never depends on transport details: every chain query
/// goes through [`WalletProvider::request`].
#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
  /// Whether a wallet is currently connected.
  fn is_connected(&self) -> bool;

  /// Describe the active provider, `None` when disconnected.
  fn provider(&self) -> Option<ProviderHandle>;

  /// Issue a raw JSON-RPC request.
  ///
  /// # Errors
  /// Returns [`AdapterError::NotConnected`] when no wallet is available,
  /// or a request/decode error from the provider.
  async fn request(
    &self,
    method: &str,
    params: Vec<serde_json::Value>,
  ) -> Result<serde_json::Value, AdapterError>;
}
