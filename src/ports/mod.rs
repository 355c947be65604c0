//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `WalletProvider`: Wallet connection state and raw JSON-RPC access
//! - `Notifier`: Human-readable status messages for the UI

pub mod notifier;
pub mod wallet;

pub use notifier::{Notifier, NullNotifier};
pub use wallet::{AdapterError, ProviderHandle, WalletProvider};
