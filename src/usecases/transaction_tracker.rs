//! Transaction Tracker - Receipt Polling and Lifecycle Notifications
//!
//! Accepts submitted transaction hashes and, without blocking the caller,
//! polls the wallet adapter until each one resolves on-chain. Every status
//! transition is logged on the record, delivered to listeners, broadcast
//! to status subscribers and rendered for the notification sink.
//!
//! Per-hash flow (one cancellable task per hash):
//! 1. Wait the warm-up delay so the transaction can propagate
//! 2. Query `eth_getTransactionReceipt` every poll interval
//! 3. Settle on receipt / disconnection / exhausted retry budget
//! 4. Keep the terminal record for the grace period, then evict
//!
//! Query errors back off exponentially from the poll interval, capped
//! at `max_backoff`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::gas_estimator::{GasEstimator, TrackerError};
use super::listeners::{ListenerId, ListenerRegistry, Subscription};
use super::timer::TimerHandle;
use crate::config::TrackerSettings;
use crate::domain::cost::{TransactionCost, TransactionParams};
use crate::domain::notification::StatusNotification;
use crate::domain::receipt::ReceiptSummary;
use crate::domain::transaction::{
  FailureReason, LifecycleEvent, Metadata, TrackedTransaction, TxHash, TxKind, TxStatus,
};
use crate::ports::notifier::Notifier;
use crate::ports::wallet::{AdapterError, WalletProvider, methods};

/// Result of a single receipt query.
#[derive(Debug)]
enum PollOutcome {
  /// Adapter reports no wallet.
  Disconnected,
  /// Transaction not mined yet.
  NotMined,
  /// Receipt available.
  Mined(ReceiptSummary),
  /// The query itself failed.
  QueryFailed(AdapterError),
}

/// What the polling task does after applying an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextStep {
  /// Poll again after the delay.
  Retry(Duration),
  /// Terminal status reached; start the grace period.
  Settled,
  /// The record was removed or replaced; stop silently.
  Gone,
}

/// Tracked record plus the task driving it.
struct Entry {
  record: TrackedTransaction,
  /// Registration generation; a task only touches its own generation.
  generation: u64,
  timer: Option<TimerHandle>,
}

struct Shared {
  wallet: Arc<dyn WalletProvider>,
  notifier: Arc<dyn Notifier>,
  settings: TrackerSettings,
  entries: Mutex<HashMap<TxHash, Entry>>,
  listeners: Arc<ListenerRegistry>,
  status_tx: broadcast::Sender<TrackedTransaction>,
  gas: GasEstimator,
  next_generation: AtomicU64,
}

/// Handle to the transaction tracker service.
///
/// Cheap to clone; all clones share the same state. When the last clone
/// is dropped every pending timer is cancelled.
#[derive(Clone)]
pub struct TransactionTracker {
  shared: Arc<Shared>,
}

impl TransactionTracker {
  /// Create a tracker over a wallet adapter and a notification sink.
  pub fn new(
    wallet: Arc<dyn WalletProvider>,
    notifier: Arc<dyn Notifier>,
    settings: TrackerSettings,
  ) -> Self {
    let (status_tx, _) = broadcast::channel(settings.status_channel_capacity.max(1));

    Self {
      shared: Arc::new(Shared {
        gas: GasEstimator::new(Arc::clone(&wallet)),
        wallet,
        notifier,
        settings,
        entries: Mutex::new(HashMap::new()),
        listeners: ListenerRegistry::new(),
        status_tx,
        next_generation: AtomicU64::new(1),
      }),
    }
  }

  /// Register a submitted transaction and start polling for its receipt.
  ///
  /// Returns the pending record immediately; the first receipt query runs
  /// after the warm-up delay. Re-registering a hash replaces the previous
  /// record and cancels its polling.
  ///
  /// # Panics
  /// Must be called from within a tokio runtime.
  #[instrument(skip_all, fields(hash, kind = %kind))]
  pub fn add_transaction(
    &self,
    hash: impl Into<TxHash>,
    kind: TxKind,
    metadata: Metadata,
  ) -> TrackedTransaction {
    let hash = hash.into();
    tracing::Span::current().record("hash", hash.as_str());

    let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
    let record = TrackedTransaction::new(hash.clone(), kind, metadata);

    let replaced = self.shared.lock().insert(
      hash.clone(),
      Entry {
        record: record.clone(),
        generation,
        timer: None,
      },
    );
    if let Some(old) = replaced {
      debug!(previous_status = %old.record.status, "Replacing tracked transaction");
      if let Some(timer) = old.timer {
        timer.cancel();
      }
    }

    info!("Transaction submitted, tracking");
    self.shared.publish(LifecycleEvent::Added(record.clone()));

    let task = TimerHandle::spawn(run_polling(
      Arc::downgrade(&self.shared),
      hash.clone(),
      generation,
    ));
    match self.shared.lock().get_mut(&hash) {
      Some(entry) if entry.generation == generation => entry.timer = Some(task),
      // Removed or replaced by a listener while publishing.
      _ => task.cancel(),
    }

    record
  }

  /// Point lookup.
  pub fn get_transaction(&self, hash: &str) -> Option<TrackedTransaction> {
    self.shared.lock().get(hash).map(|e| e.record.clone())
  }

  /// Snapshot of every tracked record, oldest submission first.
  pub fn get_all_transactions(&self) -> Vec<TrackedTransaction> {
    let mut all: Vec<TrackedTransaction> =
      self.shared.lock().values().map(|e| e.record.clone()).collect();
    all.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.hash.cmp(&b.hash)));
    all
  }

  /// Records currently in `status`.
  pub fn get_transactions_by_status(&self, status: TxStatus) -> Vec<TrackedTransaction> {
    self
      .get_all_transactions()
      .into_iter()
      .filter(|tx| tx.status == status)
      .collect()
  }

  /// Number of tracked records.
  pub fn len(&self) -> usize {
    self.shared.lock().len()
  }

  /// Whether nothing is tracked.
  pub fn is_empty(&self) -> bool {
    self.shared.lock().is_empty()
  }

  /// Subscribe to `added` / `updated` / `removed` events.
  ///
  /// The listener stays registered while the returned [`Subscription`]
  /// lives. Callbacks run synchronously on the polling task; errors and
  /// panics are logged and do not affect other listeners.
  pub fn add_listener<F>(&self, listener: F) -> Subscription
  where
    F: Fn(&LifecycleEvent) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.shared.listeners.subscribe(listener)
  }

  /// Unsubscribe a listener by id. Returns `false` if unknown.
  pub fn remove_listener(&self, id: ListenerId) -> bool {
    self.shared.listeners.unsubscribe(id)
  }

  /// Broadcast of every status change (`transactionStatusChanged`).
  ///
  /// Carries the record snapshot after the initial `pending` entry and
  /// after each transition.
  pub fn subscribe_status_changes(&self) -> broadcast::Receiver<TrackedTransaction> {
    self.shared.status_tx.subscribe()
  }

  /// Evict a record now, cancelling any pending poll or eviction timer.
  ///
  /// Emits `removed` and returns the evicted record, or `None` if the
  /// hash was not tracked.
  #[instrument(skip(self))]
  pub fn remove_transaction(&self, hash: &str) -> Option<TrackedTransaction> {
    let entry = self.shared.lock().remove(hash)?;
    if let Some(timer) = entry.timer {
      timer.cancel();
    }

    info!(status = %entry.record.status, "Transaction removed");
    self.shared.listeners.emit(&LifecycleEvent::Removed(entry.record.clone()));
    Some(entry.record)
  }

  /// Cancel every pending timer. Records stay queryable.
  pub fn shutdown(&self) {
    let timers: Vec<TimerHandle> = self
      .shared
      .lock()
      .values_mut()
      .filter_map(|e| e.timer.take())
      .collect();

    info!(cancelled = timers.len(), "Transaction tracker stopped");
    for timer in timers {
      timer.cancel();
    }
  }

  /// Estimate gas units for a call.
  ///
  /// # Errors
  /// [`AdapterError::NotConnected`] when no wallet is connected.
  pub async fn estimate_gas(&self, params: &TransactionParams) -> Result<u64, AdapterError> {
    self.shared.gas.estimate_gas(params).await
  }

  /// Current gas price in wei.
  ///
  /// # Errors
  /// [`AdapterError::NotConnected`] when no wallet is connected.
  pub async fn gas_price(&self) -> Result<u128, AdapterError> {
    self.shared.gas.gas_price().await
  }

  /// Estimate gas, fetch the price, and compose the total cost.
  ///
  /// # Errors
  /// Fails if either query fails or the cost is out of range.
  pub async fn calculate_transaction_cost(
    &self,
    params: &TransactionParams,
  ) -> Result<TransactionCost, TrackerError> {
    self.shared.gas.transaction_cost(params).await
  }
}

impl Shared {
  fn lock(&self) -> MutexGuard<'_, HashMap<TxHash, Entry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Query the adapter once for `hash`'s receipt.
  async fn poll_once(&self, hash: &str) -> PollOutcome {
    if !self.wallet.is_connected() {
      return PollOutcome::Disconnected;
    }

    let params = vec![serde_json::Value::String(hash.to_string())];
    match self.wallet.request(methods::GET_TRANSACTION_RECEIPT, params).await {
      Ok(value) => match ReceiptSummary::from_json(&value) {
        Ok(Some(receipt)) => PollOutcome::Mined(receipt),
        Ok(None) => PollOutcome::NotMined,
        Err(e) => PollOutcome::QueryFailed(AdapterError::malformed(
          methods::GET_TRANSACTION_RECEIPT,
          e,
        )),
      },
      Err(AdapterError::NotConnected) => PollOutcome::Disconnected,
      Err(e) => PollOutcome::QueryFailed(e),
    }
  }

  /// Apply a poll outcome to the record if it still belongs to `generation`.
  ///
  /// Returns the next step and, when a transition happened, the snapshot
  /// to publish once the lock is released.
  fn apply_outcome(
    &self,
    hash: &str,
    generation: u64,
    outcome: PollOutcome,
    error_streak: &mut u32,
  ) -> (NextStep, Option<TrackedTransaction>) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(hash).filter(|e| e.generation == generation) else {
      return (NextStep::Gone, None);
    };
    let record = &mut entry.record;
    let now = Utc::now();
    let max_retries = self.settings.max_retries;

    let next = match outcome {
      PollOutcome::Disconnected => {
        warn!(hash, retries = record.retry_count, "Wallet disconnected while polling");
        record.transition(TxStatus::Failed, Some(&FailureReason::WalletDisconnected), now);
        NextStep::Settled
      }
      PollOutcome::Mined(receipt) => {
        record.resolve_with_receipt(receipt, now);
        info!(
          hash,
          status = %record.status,
          block = ?receipt.block_number,
          gas_used = ?receipt.gas_used,
          "Receipt received"
        );
        NextStep::Settled
      }
      PollOutcome::NotMined => {
        *error_streak = 0;
        let attempts = record.record_retry();
        if attempts >= max_retries {
          record.transition(TxStatus::Timeout, Some(&FailureReason::Timeout { attempts }), now);
          warn!(hash, attempts, "No receipt within retry budget");
          NextStep::Settled
        } else {
          debug!(hash, attempts, "Receipt not available yet");
          NextStep::Retry(self.settings.poll_interval)
        }
      }
      PollOutcome::QueryFailed(e) => {
        *error_streak = error_streak.saturating_add(1);
        let attempts = record.record_retry();
        if attempts >= max_retries {
          record.transition(TxStatus::Timeout, Some(&FailureReason::Timeout { attempts }), now);
          warn!(hash, attempts, error = %e, "Receipt query failing, retry budget exhausted");
          NextStep::Settled
        } else {
          let delay = error_backoff(&self.settings, *error_streak);
          warn!(
            hash,
            attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %e,
            "Receipt query failed, backing off"
          );
          NextStep::Retry(delay)
        }
      }
    };

    let snapshot = (next == NextStep::Settled).then(|| record.clone());
    (next, snapshot)
  }

  /// Deliver a lifecycle event: listeners, status broadcast, then the
  /// notification sink.
  fn publish(&self, event: LifecycleEvent) {
    self.listeners.emit(&event);

    let tx = event.transaction();
    // No receivers is fine.
    let _ = self.status_tx.send(tx.clone());

    let notification = StatusNotification::for_status(tx.status, tx.kind);
    self.notifier.notify(&notification.message, notification.level);
  }

  /// Grace period elapsed: drop the record if it is still this generation.
  fn evict_expired(&self, hash: &str, generation: u64) {
    let evicted = {
      let mut entries = self.lock();
      match entries.get(hash) {
        Some(entry) if entry.generation == generation => entries.remove(hash),
        _ => None,
      }
    };

    let Some(entry) = evicted else {
      return;
    };
    // Running inside this very task; don't abort ourselves.
    if let Some(timer) = entry.timer {
      timer.detach();
    }

    debug!(hash, status = %entry.record.status, "Grace period elapsed, evicting");
    self.listeners.emit(&LifecycleEvent::Removed(entry.record));
  }
}

/// Delay after the `streak`-th consecutive query error.
///
/// `poll_interval × 2^streak`, capped at `max_backoff`.
fn error_backoff(settings: &TrackerSettings, streak: u32) -> Duration {
  let factor = 1u32.checked_shl(streak).unwrap_or(u32::MAX);
  settings
    .poll_interval
    .saturating_mul(factor)
    .min(settings.max_backoff)
}

/// Polling chain for one registration.
///
/// Holds only a weak reference between ticks so a dropped tracker ends
/// the chain.
async fn run_polling(shared: Weak<Shared>, hash: TxHash, generation: u64) {
  let Some(settings) = shared.upgrade().map(|s| s.settings) else {
    return;
  };

  tokio::time::sleep(settings.warmup).await;

  let mut error_streak = 0u32;
  loop {
    let Some(tracker) = shared.upgrade() else {
      return;
    };

    let outcome = tracker.poll_once(&hash).await;
    let (next, settled) = tracker.apply_outcome(&hash, generation, outcome, &mut error_streak);

    if let Some(snapshot) = settled {
      tracker.publish(LifecycleEvent::Updated(snapshot));
    }
    drop(tracker);

    match next {
      NextStep::Retry(delay) => tokio::time::sleep(delay).await,
      NextStep::Settled => break,
      NextStep::Gone => return,
    }
  }

  tokio::time::sleep(settings.grace_period).await;

  if let Some(tracker) = shared.upgrade() {
    tracker.evict_expired(&hash, generation);
  }
}
