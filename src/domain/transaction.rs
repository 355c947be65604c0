//! Tracked transaction domain types.
//!
//! Defines the record the tracker keeps per submitted transaction hash,
//! the status state machine and the append-only event log.
//!
//! Status transitions are monotonic: a record starts `Pending` and moves
//! exactly once into one of the terminal states. Every mutator on
//! [`TrackedTransaction`] refuses to touch a terminal record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::receipt::ReceiptSummary;

// ────────────────────────────────────────────
// Type aliases consumed by ports and usecases
// ────────────────────────────────────────────

/// Opaque transaction identifier (hex string) used as the tracker key.
pub type TxHash = String;

/// Caller-supplied context attached to a transaction, preserved verbatim.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ────────────────────────────────────────────
// Enums
// ────────────────────────────────────────────

/// What the DApp submitted the transaction for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxKind {
    /// Donation to a project.
    Donation,
    /// Vote on a governance proposal.
    GovernanceVote,
    /// ERC-20 spend approval.
    Approval,
    /// Plain token transfer.
    Transfer,
    /// Anything the caller did not tag.
    Unknown,
}

impl TxKind {
    /// Wire tag for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Donation => "donation",
            Self::GovernanceVote => "governance-vote",
            Self::Approval => "approval",
            Self::Transfer => "transfer",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = std::convert::Infallible;

    /// Unrecognised tags map to [`TxKind::Unknown`] rather than failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "donation" => Self::Donation,
            "governance-vote" | "governance_vote" | "vote" => Self::GovernanceVote,
            "approval" => Self::Approval,
            "transfer" => Self::Transfer,
            _ => Self::Unknown,
        })
    }
}

impl From<&str> for TxKind {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }
}

/// Lifecycle status of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Submitted, no receipt observed yet.
    Pending,
    /// Receipt observed with the success flag set.
    Confirmed,
    /// Reverted on-chain, or the wallet went away mid-poll.
    Failed,
    /// Retry budget exhausted without a receipt.
    Timeout,
}

impl TxStatus {
    /// Whether no further transition may leave this status.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only `Pending → terminal` is a legal transition.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(self, Self::Pending) && next.is_terminal()
    }

    /// Lowercase wire tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transaction ended in `Failed` or `Timeout`.
///
/// Rendered into the `error` field of the corresponding [`TxEvent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// The wallet adapter reported it is no longer connected.
    #[error("wallet disconnected")]
    WalletDisconnected,
    /// Receipt obtained but the success flag was not set.
    #[error("transaction reverted")]
    Reverted,
    /// No receipt after the whole retry budget.
    #[error("no receipt after {attempts} polling attempts")]
    Timeout {
        /// Attempts made before giving up.
        attempts: u32,
    },
}

// ────────────────────────────────────────────
// Records
// ────────────────────────────────────────────

/// One entry of the append-only transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    /// Status entered by this transition.
    pub status: TxStatus,
    /// When the transition was observed.
    pub timestamp: DateTime<Utc>,
    /// Failure description for `Failed` / `Timeout`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the tracker knows about one submitted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTransaction {
    /// Transaction hash (immutable key).
    pub hash: TxHash,
    /// What the transaction was for.
    pub kind: TxKind,
    /// Current lifecycle status.
    pub status: TxStatus,
    /// Registration time.
    pub submitted_at: DateTime<Utc>,
    /// Time of the last status change.
    pub updated_at: DateTime<Utc>,
    /// Polling attempts that did not resolve the transaction.
    pub retry_count: u32,
    /// Caller-supplied context.
    pub metadata: Metadata,
    /// Transition log, oldest first.
    pub events: Vec<TxEvent>,
    /// Receipt fields attached once the transaction resolved on-chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptSummary>,
}

impl TrackedTransaction {
    /// Create a fresh pending record with its initial `pending` event.
    pub fn new(hash: impl Into<TxHash>, kind: TxKind, metadata: Metadata) -> Self {
        Self::new_at(hash, kind, metadata, Utc::now())
    }

    /// Same as [`TrackedTransaction::new`] with an explicit clock reading.
    pub fn new_at(
        hash: impl Into<TxHash>,
        kind: TxKind,
        metadata: Metadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            hash: hash.into(),
            kind,
            status: TxStatus::Pending,
            submitted_at: now,
            updated_at: now,
            retry_count: 0,
            metadata,
            events: vec![TxEvent {
                status: TxStatus::Pending,
                timestamp: now,
                error: None,
            }],
            receipt: None,
        }
    }

    /// Whether the record reached a terminal status.
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Count one unresolved polling attempt. No-op once terminal.
    ///
    /// Returns the new retry count.
    pub fn record_retry(&mut self) -> u32 {
        if !self.is_terminal() {
            self.retry_count = self.retry_count.saturating_add(1);
        }
        self.retry_count
    }

    /// Move to `next`, appending one event.
    ///
    /// Returns `false` (and changes nothing) for an illegal transition.
    pub fn transition(
        &mut self,
        next: TxStatus,
        reason: Option<&FailureReason>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }

        self.status = next;
        self.updated_at = now;
        self.events.push(TxEvent {
            status: next,
            timestamp: now,
            error: reason.map(ToString::to_string),
        });
        true
    }

    /// Apply a decoded receipt: attach its summary and settle the status.
    pub fn resolve_with_receipt(&mut self, receipt: ReceiptSummary, now: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }

        let (next, reason) = if receipt.success {
            (TxStatus::Confirmed, None)
        } else {
            (TxStatus::Failed, Some(FailureReason::Reverted))
        };

        self.receipt = Some(receipt);
        self.transition(next, reason.as_ref(), now)
    }
}

/// Lifecycle notification delivered to tracker listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A hash was registered (or re-registered).
    Added(TrackedTransaction),
    /// A status transition happened.
    Updated(TrackedTransaction),
    /// The record was evicted.
    Removed(TrackedTransaction),
}

impl LifecycleEvent {
    /// Snapshot carried by the event.
    pub const fn transaction(&self) -> &TrackedTransaction {
        match self {
            Self::Added(tx) | Self::Updated(tx) | Self::Removed(tx) => tx,
        }
    }

    /// Short event name (`added`, `updated`, `removed`).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Updated(_) => "updated",
            Self::Removed(_) => "removed",
        }
    }
}
