//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that the tracked-transaction state machine
//! and the cost arithmetic hold their invariants across random inputs.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use donation_tx_tracker::domain::cost::TransactionCost;
use donation_tx_tracker::domain::receipt::ReceiptSummary;
use donation_tx_tracker::domain::transaction::{
    FailureReason, Metadata, TrackedTransaction, TxKind, TxStatus,
};

/// One thing that can happen to a record while it is tracked.
#[derive(Debug, Clone)]
enum Step {
    Retry,
    Receipt(bool),
    Disconnect,
    Timeout,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Retry),
        1 => any::<bool>().prop_map(Step::Receipt),
        1 => Just(Step::Disconnect),
        1 => Just(Step::Timeout),
    ]
}

fn apply(tx: &mut TrackedTransaction, step: &Step, tick: i64) {
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(tick);
    match step {
        Step::Retry => {
            tx.record_retry();
        }
        Step::Receipt(success) => {
            tx.resolve_with_receipt(
                ReceiptSummary { success: *success, ..ReceiptSummary::default() },
                now,
            );
        }
        Step::Disconnect => {
            tx.transition(TxStatus::Failed, Some(&FailureReason::WalletDisconnected), now);
        }
        Step::Timeout => {
            let attempts = tx.retry_count;
            tx.transition(TxStatus::Timeout, Some(&FailureReason::Timeout { attempts }), now);
        }
    }
}

// ── Status State Machine Properties ─────────────────────────

proptest! {
    /// At most one terminal transition ever happens, and the event log
    /// always ends with the current status.
    #[test]
    fn status_changes_at_most_once(steps in prop::collection::vec(step(), 0..60)) {
        let mut tx = TrackedTransaction::new("0xabc", TxKind::Donation, Metadata::new());
        let mut terminal_seen: Option<TxStatus> = None;

        for (i, s) in steps.iter().enumerate() {
            apply(&mut tx, s, i64::try_from(i).unwrap());

            if let Some(first) = terminal_seen {
                prop_assert_eq!(tx.status, first, "terminal status must never change");
            } else if tx.is_terminal() {
                terminal_seen = Some(tx.status);
            }
        }

        prop_assert!(tx.events.len() <= 2);
        prop_assert_eq!(tx.events[0].status, TxStatus::Pending);
        prop_assert_eq!(tx.events.last().unwrap().status, tx.status);
        prop_assert_eq!(tx.events.len(), if tx.is_terminal() { 2 } else { 1 });
    }

    /// The retry counter only grows while pending and freezes afterwards.
    #[test]
    fn retry_count_freezes_when_terminal(steps in prop::collection::vec(step(), 0..60)) {
        let mut tx = TrackedTransaction::new("0xabc", TxKind::GovernanceVote, Metadata::new());
        let mut expected = 0u32;

        for (i, s) in steps.iter().enumerate() {
            if matches!(s, Step::Retry) && !tx.is_terminal() {
                expected += 1;
            }
            apply(&mut tx, s, i64::try_from(i).unwrap());
            prop_assert_eq!(tx.retry_count, expected);
        }
    }

    /// Timestamps never go backwards along the event log.
    #[test]
    fn event_timestamps_monotonic(steps in prop::collection::vec(step(), 1..40)) {
        let mut tx = TrackedTransaction::new_at(
            "0xabc",
            TxKind::Transfer,
            Metadata::new(),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        for (i, s) in steps.iter().enumerate() {
            apply(&mut tx, s, i64::try_from(i).unwrap());
        }

        prop_assert!(tx.events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        prop_assert!(tx.updated_at >= tx.submitted_at);
    }
}

// ── Kind Parsing Properties ─────────────────────────────────

proptest! {
    /// Any string parses to some kind; known tags round-trip.
    #[test]
    fn kind_parse_is_total(s in "\\PC{0,24}") {
        let kind = TxKind::from(s.as_str());
        prop_assert_eq!(TxKind::from(kind.as_str()), kind);
    }
}

// ── Cost Arithmetic Properties ──────────────────────────────

proptest! {
    /// total = gas × price, and the native amount is exactly total / 1e18.
    #[test]
    fn cost_is_exact_product(gas in 0u64..30_000_000, price in 0u128..10_000_000_000_000u128) {
        let cost = TransactionCost::compute(gas, price).unwrap();
        prop_assert_eq!(cost.total_cost, u128::from(gas) * price);

        let back = cost.cost_in_native_unit * Decimal::from(1_000_000_000_000_000_000u64);
        let total = i128::try_from(cost.total_cost).unwrap();
        prop_assert_eq!(back, Decimal::from_i128_with_scale(total, 0));
    }

    /// Cost is monotonic in the gas price.
    #[test]
    fn cost_monotonic_in_price(gas in 1u64..1_000_000, price in 0u128..1_000_000_000_000, bump in 1u128..1_000_000) {
        let low = TransactionCost::compute(gas, price).unwrap();
        let high = TransactionCost::compute(gas, price + bump).unwrap();
        prop_assert!(high.total_cost > low.total_cost);
        prop_assert!(high.cost_in_native_unit > low.cost_in_native_unit);
    }
}
