//! Use Cases Layer - Application Logic
//!
//! Orchestrates domain rules with the port interfaces to implement the
//! tracker's workflows.
//!
//! Use cases:
//! - `TransactionTracker`: Receipt polling, lifecycle events, eviction
//! - `GasEstimator`: On-demand gas estimate / price / cost queries
//! - `ListenerRegistry`: Isolated synchronous event delivery
//! - `TimerHandle`: Cancellable per-hash polling task

pub mod gas_estimator;
pub mod listeners;
pub mod timer;
pub mod transaction_tracker;

pub use gas_estimator::{GasEstimator, TrackerError};
pub use listeners::{ListenerId, Subscription};
pub use transaction_tracker::TransactionTracker;
