//! Best-effort native notifications.
//!
//! Hosts without a notification capability, or where permission was denied,
//! simply get nothing: [`NotificationSink::offer`] never fails.

use ripple_protocol::Event;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Notification failures. Logged and discarded by the sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The host has no notification capability.
    #[error("Notifications unavailable")]
    Unavailable,

    /// The user denied notification permission.
    #[error("Notification permission denied")]
    PermissionDenied,

    /// The host failed to show the notification.
    #[error("Notification failed: {0}")]
    Failed(String),
}

/// A host notification capability.
pub trait Notifier: Send + Sync {
    /// Whether the capability is present and permitted.
    fn is_available(&self) -> bool {
        true
    }

    /// Show a one-shot notification.
    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!(title = %title, body = %body, "Notification");
        Ok(())
    }
}

/// Forwards notify-worthy events to an optional [`Notifier`].
#[derive(Clone, Default)]
pub struct NotificationSink {
    notifier: Option<Arc<dyn Notifier>>,
}

impl NotificationSink {
    /// Create a sink backed by `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier: Some(notifier),
        }
    }

    /// Create a sink that ignores every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether a notifier is attached.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Show a notification for `event` if it is notify-worthy.
    ///
    /// Returns `true` if a notification was shown.
    pub fn offer(&self, event: &Event) -> bool {
        if !event.notify {
            return false;
        }
        let Some(notifier) = &self.notifier else {
            return false;
        };
        if !notifier.is_available() {
            debug!(event = %event.id, "Notifier unavailable, skipping");
            return false;
        }

        let title = format!("{} from {}", event.kind, event.origin_id);
        let body = event.content().unwrap_or_default();
        match notifier.show(&title, body) {
            Ok(()) => true,
            Err(e) => {
                debug!(event = %event.id, error = %e, "Notification dropped");
                false
            }
        }
    }
}
