//! Receipt decoding.
//!
//! The receipt schema belongs to the Ethereum JSON-RPC interface; we only
//! read the handful of quantities the tracker attaches to a record. All
//! numeric fields arrive as `0x`-prefixed hex quantities.

use alloy::primitives::{U64, U128};
use serde::{Deserialize, Serialize};

/// Receipt-derived fields attached to a resolved transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    /// Whether execution succeeded (`status == 0x1`).
    pub success: bool,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Gas consumed by the transaction.
    pub gas_used: Option<u64>,
    /// Price per gas actually paid (wei).
    pub effective_gas_price: Option<u128>,
}

/// Wire shape of the fields we read from `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    gas_used: Option<U64>,
    #[serde(default)]
    effective_gas_price: Option<U128>,
}

impl ReceiptSummary {
    /// Decode an `eth_getTransactionReceipt` result.
    ///
    /// Returns `Ok(None)` for a JSON `null` (transaction not mined yet).
    /// A receipt without a `status` field (pre-Byzantium, carries a state
    /// root instead) is treated as successful.
    pub fn from_json(value: &serde_json::Value) -> Result<Option<Self>, serde_json::Error> {
        if value.is_null() {
            return Ok(None);
        }

        let raw = RawReceipt::deserialize(value)?;

        Ok(Some(Self {
            success: raw.status.is_none_or(|s| s == U64::from(1)),
            block_number: raw.block_number.map(|n| n.to::<u64>()),
            gas_used: raw.gas_used.map(|n| n.to::<u64>()),
            effective_gas_price: raw.effective_gas_price.map(|n| n.to::<u128>()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_means_not_mined() {
        assert_eq!(ReceiptSummary::from_json(&serde_json::Value::Null).unwrap(), None);
    }

    #[test]
    fn test_successful_receipt() {
        let receipt = ReceiptSummary::from_json(&json!({
            "status": "0x1",
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "transactionHash": "0xabc"
        }))
        .unwrap()
        .unwrap();

        assert!(receipt.success);
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.gas_used, Some(21_000));
        assert_eq!(receipt.effective_gas_price, Some(1_000_000_000));
    }

    #[test]
    fn test_reverted_receipt() {
        let receipt = ReceiptSummary::from_json(&json!({ "status": "0x0", "blockNumber": "0x1" }))
            .unwrap()
            .unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.gas_used, None);
    }

    #[test]
    fn test_receipt_without_status_is_success() {
        let receipt = ReceiptSummary::from_json(&json!({ "root": "0x00", "blockNumber": "0x2" }))
            .unwrap()
            .unwrap();
        assert!(receipt.success);
    }

    #[test]
    fn test_malformed_receipt_errors() {
        assert!(ReceiptSummary::from_json(&json!({ "status": "yes" })).is_err());
        assert!(ReceiptSummary::from_json(&json!("0x1")).is_err());
    }
}
