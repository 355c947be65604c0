//! Human-readable status messages.
//!
//! One message per status, paired with the severity the sink uses to
//! present it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::transaction::{TxKind, TxStatus};

/// Severity attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A message destined for the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotification {
    /// Rendered text.
    pub message: String,
    /// Severity.
    pub level: NotifyLevel,
}

impl StatusNotification {
    /// Build the notification for a transaction of `kind` entering `status`.
    pub fn for_status(status: TxStatus, kind: TxKind) -> Self {
        let (message, level) = match status {
            TxStatus::Pending => (format!("Transaction submitted: {kind}"), NotifyLevel::Info),
            TxStatus::Confirmed => (format!("✅ Transaction confirmed: {kind}"), NotifyLevel::Success),
            TxStatus::Failed => (format!("❌ Transaction failed: {kind}"), NotifyLevel::Error),
            TxStatus::Timeout => (format!("⏰ Transaction timeout: {kind}"), NotifyLevel::Warning),
        };
        Self { message, level }
    }
}
