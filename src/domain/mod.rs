//! Domain layer - Tracked transactions, receipts and cost math.
//!
//! Pure types and rules for the transaction status tracker: the status
//! state machine, receipt decoding, status messages and gas cost
//! arithmetic. No I/O here (hexagonal architecture inner ring).

pub mod cost;
pub mod notification;
pub mod receipt;
pub mod transaction;

// Re-export core types for convenience
pub use cost::{CostError, TransactionCost, TransactionParams};
pub use notification::{NotifyLevel, StatusNotification};
pub use receipt::ReceiptSummary;
pub use transaction::{
    FailureReason, LifecycleEvent, Metadata, TrackedTransaction, TxEvent, TxHash, TxKind,
    TxStatus,
};
