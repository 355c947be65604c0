//! Timer Handle - Cancellable Scheduled Task
//!
//! Owns the tokio task that drives one transaction's polling chain.
//! Dropping or cancelling the handle aborts the task, so whoever holds
//! the handle controls the lifetime of every timer scheduled for that
//! hash.

use std::future::Future;

use tokio::task::JoinHandle;

/// Handle to a spawned, cancellable timer chain.
#[derive(Debug)]
pub struct TimerHandle {
  task: Option<JoinHandle<()>>,
}

impl TimerHandle {
  /// Spawn `fut` on the current runtime and return its handle.
  pub fn spawn<F>(fut: F) -> Self
  where
    F: Future<Output = ()> + Send + 'static,
  {
    Self {
      task: Some(tokio::spawn(fut)),
    }
  }

  /// Abort the task if it is still running.
  pub fn cancel(mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }

  /// Release the task without aborting it.
  ///
  /// Used by a task that evicts its own record: aborting itself from
  /// inside would cancel the remainder of the eviction.
  pub fn detach(mut self) {
    self.task.take();
  }
}

impl Drop for TimerHandle {
  fn drop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::time::Duration;

  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_cancel_prevents_firing() {
    let fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fired);

    let handle = TimerHandle::spawn(async move {
      tokio::time::sleep(Duration::from_secs(5)).await;
      flag.store(true, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.cancel();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(!fired.load(Ordering::SeqCst));
  }

  #[tokio::test(start_paused = true)]
  async fn test_drop_aborts() {
    let fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fired);

    {
      let _handle = TimerHandle::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        flag.store(true, Ordering::SeqCst);
      });
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!fired.load(Ordering::SeqCst));
  }

  #[tokio::test(start_paused = true)]
  async fn test_detach_lets_task_finish() {
    let fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fired);

    let handle = TimerHandle::spawn(async move {
      tokio::time::sleep(Duration::from_secs(5)).await;
      flag.store(true, Ordering::SeqCst);
    });
    handle.detach();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(fired.load(Ordering::SeqCst));
  }
}
