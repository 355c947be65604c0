//! Chain Adapters - JSON-RPC Blockchain Access
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC connection management with chain id validation
//! - Receipt lookup, gas estimation and gas price queries
//! - Periodic connectivity probing for the readiness endpoint

pub mod provider;

pub use provider::RpcWallet;
