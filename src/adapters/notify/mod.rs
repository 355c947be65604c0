//! Notification Adapters
//!
//! Headless implementations of the `Notifier` port. Each message
//! becomes a structured tracing event at the matching level.

use tracing::{error, info, warn};

use crate::domain::notification::NotifyLevel;
use crate::ports::notifier::Notifier;

/// Emits every status message as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => {
                info!(target: "notifications", %level, "{message}");
            }
            NotifyLevel::Warning => warn!(target: "notifications", %level, "{message}"),
            NotifyLevel::Error => error!(target: "notifications", %level, "{message}"),
        }
    }
}
