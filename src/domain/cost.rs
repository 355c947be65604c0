//! Transaction cost math.
//!
//! Gas estimate × gas price in wei, plus the same figure expressed in the
//! chain's native unit (1 ether = 10^18 wei) as an exact `Decimal`.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places between wei and the native unit.
pub const NATIVE_UNIT_DECIMALS: u32 = 18;

/// Call object for `eth_estimateGas`.
///
/// Quantities serialize as hex strings; absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    /// Sender address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient / contract address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Value sent in wei.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// ABI-encoded calldata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Gas limit hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
}

/// Estimated cost of sending a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCost {
    /// Gas units the call is expected to consume.
    pub gas_estimate: u64,
    /// Current gas price in wei.
    pub gas_price: u128,
    /// `gas_estimate × gas_price` in wei.
    pub total_cost: u128,
    /// `total_cost` in the native unit.
    pub cost_in_native_unit: Decimal,
}

/// Why a cost could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CostError {
    /// `gas × price` does not fit in 128 bits.
    #[error("gas cost overflows u128 (gas={gas}, price={price})")]
    Overflow {
        /// Gas estimate.
        gas: u64,
        /// Gas price in wei.
        price: u128,
    },
    /// The wei total exceeds what `Decimal` can represent.
    #[error("cost of {0} wei is out of decimal range")]
    OutOfRange(u128),
}

impl TransactionCost {
    /// Compose a cost from an estimate and a price.
    pub fn compute(gas_estimate: u64, gas_price: u128) -> Result<Self, CostError> {
        let total_cost = u128::from(gas_estimate)
            .checked_mul(gas_price)
            .ok_or(CostError::Overflow { gas: gas_estimate, price: gas_price })?;

        Ok(Self {
            gas_estimate,
            gas_price,
            total_cost,
            cost_in_native_unit: wei_to_native(total_cost)?,
        })
    }
}

/// Convert wei to the native unit without losing precision.
pub fn wei_to_native(wei: u128) -> Result<Decimal, CostError> {
    let signed = i128::try_from(wei).map_err(|_| CostError::OutOfRange(wei))?;
    Decimal::try_from_i128_with_scale(signed, NATIVE_UNIT_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|_| CostError::OutOfRange(wei))
}
