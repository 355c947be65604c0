//! RPC Wallet - alloy-rs 0.9 JSON-RPC Wallet Adapter
//!
//! Implements the `WalletProvider` port on top of an alloy provider.
//! Validates RPC connectivity (and optionally the chain id) at startup,
//! then serves the three JSON-RPC methods the tracker needs through
//! alloy's typed calls, re-encoding the answers as JSON-RPC values.
//!
//! The provider is stored type-erased as `dyn Provider` to keep the
//! filler-heavy builder type out of the adapter API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy::primitives::B256;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::config::RpcConfig;
use crate::ports::wallet::{AdapterError, ProviderHandle, WalletProvider, methods};

/// Wallet adapter backed by a plain JSON-RPC endpoint.
///
/// "Connected" means the last connectivity probe succeeded; the flag is
/// refreshed by [`RpcWallet::monitor`] and cleared by
/// [`RpcWallet::disconnect`].
pub struct RpcWallet {
    /// The alloy provider (type-erased).
    provider: Arc<dyn Provider + Send + Sync>,
    /// Endpoint label safe for logs (no credentials or query string).
    label: String,
    /// Chain id reported at connect time.
    chain_id: u64,
    /// Result of the last connectivity probe.
    connected: AtomicBool,
}

impl RpcWallet {
    /// Connect to the RPC endpoint and validate the chain id.
    ///
    /// # Errors
    /// Fails if the URL is invalid, the node is unreachable, or the
    /// chain id differs from `expected_chain_id`.
    #[instrument(skip_all)]
    pub async fn connect(config: &RpcConfig) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .on_builtin(&config.url)
            .await
            .context("Failed to connect to RPC endpoint")?;

        // Wrap in Arc<dyn Provider> for type erasure
        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if let Some(expected) = config.expected_chain_id {
            anyhow::ensure!(
                chain_id == expected,
                "Expected chain_id={expected}, node reports {chain_id}"
            );
        }

        let label = config.endpoint_label();
        info!(chain_id, endpoint = %label, "Connected to RPC");

        Ok(Self {
            provider,
            label,
            chain_id,
            connected: AtomicBool::new(true),
        })
    }

    /// Probe the node with a lightweight call and update the flag.
    pub async fn refresh_connection(&self) -> bool {
        let healthy = self.provider.get_block_number().await.is_ok();
        let was = self.connected.swap(healthy, Ordering::Relaxed);
        if was != healthy {
            if healthy {
                info!(endpoint = %self.label, "RPC connection restored");
            } else {
                warn!(endpoint = %self.label, "RPC connection lost");
            }
        }
        healthy
    }

    /// Mark the wallet as disconnected until the next successful probe.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Re-probe connectivity every `interval` until shutdown.
    ///
    /// Mirrors the result into `health` for the readiness probe.
    pub async fn monitor(
        self: Arc<Self>,
        interval: Duration,
        health: Arc<AtomicBool>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("RPC monitor shutting down");
                    return;
                }
                () = tokio::time::sleep(interval) => {
                    let ok = self.refresh_connection().await;
                    health.store(ok, Ordering::Relaxed);
                }
            }
        }
    }

    async fn transaction_receipt(&self, params: &[Value]) -> Result<Value, AdapterError> {
        let method = methods::GET_TRANSACTION_RECEIPT;
        let hash: B256 = first_param(method, params)?
            .as_str()
            .ok_or_else(|| AdapterError::malformed(method, "hash param must be a string"))?
            .parse()
            .map_err(|e| AdapterError::malformed(method, e))?;

        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| AdapterError::request(method, e))?;

        serde_json::to_value(receipt).map_err(|e| AdapterError::malformed(method, e))
    }

    async fn estimate_gas(&self, params: &[Value]) -> Result<Value, AdapterError> {
        let method = methods::ESTIMATE_GAS;
        let tx: TransactionRequest = serde_json::from_value(first_param(method, params)?.clone())
            .map_err(|e| AdapterError::malformed(method, e))?;

        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .map_err(|e| AdapterError::request(method, e))?;

        Ok(Value::String(format!("{gas:#x}")))
    }

    async fn gas_price(&self) -> Result<Value, AdapterError> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| AdapterError::request(methods::GAS_PRICE, e))?;

        Ok(Value::String(format!("{price:#x}")))
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn provider(&self) -> Option<ProviderHandle> {
        self.is_connected().then(|| ProviderHandle {
            label: self.label.clone(),
            chain_id: Some(self.chain_id),
        })
    }

    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }

        match method {
            methods::GET_TRANSACTION_RECEIPT => self.transaction_receipt(&params).await,
            methods::ESTIMATE_GAS => self.estimate_gas(&params).await,
            methods::GAS_PRICE => self.gas_price().await,
            other => Err(AdapterError::UnsupportedMethod(other.to_string())),
        }
    }
}

fn first_param<'a>(method: &str, params: &'a [Value]) -> Result<&'a Value, AdapterError> {
    params
        .first()
        .ok_or_else(|| AdapterError::malformed(method, "missing first parameter"))
}
