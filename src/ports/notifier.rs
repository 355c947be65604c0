//! Notification Sink Port - User-facing Status Messages
//!
//! The tracker pushes one human-readable message per status transition
//! through this trait. The UI layer (toasts, log lines, chat bots)
//! decides how to present it.

use crate::domain::notification::NotifyLevel;

/// Receives human-readable status messages.
///
/// Called synchronously from the polling task; implementations must not
/// block for long.
pub trait Notifier: Send + Sync + 'static {
  /// Present `message` with the given severity.
  fn notify(&self, message: &str, level: NotifyLevel);
}

/// A notifier that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
  fn notify(&self, _message: &str, _level: NotifyLevel) {}
}
