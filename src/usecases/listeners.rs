//! Listener Registry - Lifecycle Event Subscribers
//!
//! Keeps the tracker's subscriber list and delivers lifecycle events.
//! Delivery is synchronous and isolated: a listener that returns an
//! error or panics is logged and skipped, the remaining listeners still
//! receive the event.
//!
//! Subscriptions are RAII: [`Subscription`] unsubscribes on drop unless
//! it is explicitly kept with [`Subscription::forget`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::transaction::LifecycleEvent;

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
  fn new() -> Self {
    Self(Uuid::new_v4())
  }
}

impl std::fmt::Display for ListenerId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

/// Callback invoked for every lifecycle event.
pub type Listener = Arc<dyn Fn(&LifecycleEvent) -> anyhow::Result<()> + Send + Sync>;

/// Ordered set of listeners shared between the tracker and subscriptions.
#[derive(Default)]
pub struct ListenerRegistry {
  entries: Mutex<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
  /// Create an empty registry.
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Register `listener`; events are delivered in registration order.
  pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
  where
    F: Fn(&LifecycleEvent) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    let id = ListenerId::new();
    let listener: Listener = Arc::new(listener);
    self.lock().push((id, listener));
    Subscription {
      id,
      registry: Arc::downgrade(self),
      active: true,
    }
  }

  /// Remove a listener. Returns `false` if it was not registered.
  pub fn unsubscribe(&self, id: ListenerId) -> bool {
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|(entry_id, _)| *entry_id != id);
    entries.len() != before
  }

  /// Number of registered listeners.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  /// Whether no listener is registered.
  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Deliver `event` to every listener.
  ///
  /// The list is snapshotted first so a listener may subscribe or
  /// unsubscribe from inside its callback. Returns the number of
  /// listeners that failed.
  pub fn emit(&self, event: &LifecycleEvent) -> usize {
    let snapshot: Vec<(ListenerId, Listener)> = self.lock().clone();
    let mut failures = 0;

    for (id, listener) in snapshot {
      match catch_unwind(AssertUnwindSafe(|| listener(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
          failures += 1;
          warn!(
            listener = %id,
            event = event.name(),
            hash = %event.transaction().hash,
            error = %e,
            "Listener returned an error"
          );
        }
        Err(_) => {
          failures += 1;
          error!(
            listener = %id,
            event = event.name(),
            hash = %event.transaction().hash,
            "Listener panicked"
          );
        }
      }
    }

    failures
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Scoped listener registration.
///
/// Dropping the subscription removes the listener.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
  id: ListenerId,
  registry: Weak<ListenerRegistry>,
  active: bool,
}

impl Subscription {
  /// Identifier usable with `remove_listener`.
  pub const fn id(&self) -> ListenerId {
    self.id
  }

  /// Keep the listener registered for the registry's whole lifetime.
  pub fn forget(mut self) -> ListenerId {
    self.active = false;
    self.id
  }

  /// Unsubscribe now.
  pub fn unsubscribe(self) {
    drop(self);
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("id", &self.id)
      .field("active", &self.active)
      .finish()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if !self.active {
      return;
    }
    if let Some(registry) = self.registry.upgrade() {
      registry.unsubscribe(self.id);
    }
  }
}
