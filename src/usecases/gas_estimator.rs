//! Gas Estimator - On-demand Gas and Cost Queries
//!
//! Delegates `eth_estimateGas` / `eth_gasPrice` to the wallet adapter and
//! composes them into a [`TransactionCost`]. Unlike the polling loop,
//! these calls propagate adapter errors straight to the caller.

use std::sync::Arc;

use alloy::primitives::{U64, U256};
use tracing::{debug, instrument};

use crate::domain::cost::{CostError, TransactionCost, TransactionParams};
use crate::ports::wallet::{AdapterError, WalletProvider, methods};

/// Errors from the on-demand gas operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
  /// The wallet adapter failed (including "not connected").
  #[error(transparent)]
  Adapter(#[from] AdapterError),
  /// The cost could not be computed from the returned figures.
  #[error(transparent)]
  Cost(#[from] CostError),
}

/// Gas queries backed by a wallet adapter.
pub struct GasEstimator {
  wallet: Arc<dyn WalletProvider>,
}

impl GasEstimator {
  /// Create an estimator over `wallet`.
  pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
    Self { wallet }
  }

  /// Estimate gas units for `params`.
  ///
  /// # Errors
  /// [`AdapterError::NotConnected`] without a wallet, otherwise any
  /// request or decode failure.
  #[instrument(skip(self, params))]
  pub async fn estimate_gas(&self, params: &TransactionParams) -> Result<u64, AdapterError> {
    self.ensure_connected()?;

    let call = serde_json::to_value(params)
      .map_err(|e| AdapterError::malformed(methods::ESTIMATE_GAS, e))?;

    let result = self
      .wallet
      .request(methods::ESTIMATE_GAS, vec![call])
      .await?;

    let gas: U64 = serde_json::from_value(result)
      .map_err(|e| AdapterError::malformed(methods::ESTIMATE_GAS, e))?;

    let gas = gas.to::<u64>();
    debug!(gas, "Gas estimated");
    Ok(gas)
  }

  /// Current gas price in wei.
  ///
  /// # Errors
  /// Same failure modes as [`GasEstimator::estimate_gas`].
  #[instrument(skip(self))]
  pub async fn gas_price(&self) -> Result<u128, AdapterError> {
    self.ensure_connected()?;

    let result = self.wallet.request(methods::GAS_PRICE, Vec::new()).await?;

    let price: U256 = serde_json::from_value(result)
      .map_err(|e| AdapterError::malformed(methods::GAS_PRICE, e))?;

    let price = u128::try_from(price)
      .map_err(|e| AdapterError::malformed(methods::GAS_PRICE, e))?;

    debug!(gas_price_wei = %price, "Gas price updated");
    Ok(price)
  }

  /// Estimate and price a transaction.
  ///
  /// # Errors
  /// Fails if either sub-query fails or the product overflows.
  pub async fn transaction_cost(
    &self,
    params: &TransactionParams,
  ) -> Result<TransactionCost, TrackerError> {
    let gas = self.estimate_gas(params).await?;
    let price = self.gas_price().await?;
    Ok(TransactionCost::compute(gas, price)?)
  }

  fn ensure_connected(&self) -> Result<(), AdapterError> {
    if self.wallet.is_connected() {
      Ok(())
    } else {
      Err(AdapterError::NotConnected)
    }
  }
}
