//! Subscription handle.
//!
//! A [`Subscription`] owns one supervisor task, its watermark and its
//! connection state. Callers only ever read snapshots of those; independent
//! subscriptions share nothing.
//!
//! Creating a subscription and connecting it are separate steps: callbacks
//! registered between [`Subscription::new`] and [`Subscription::connect`]
//! see the very first batch.

use ripple_core::cursor::DEFAULT_RECENT_WINDOW;
use ripple_core::{
    BackoffPolicy, CursorTracker, EventBus, NotificationSink, SubscriberHandle, Viewer,
};
use ripple_protocol::{Cursor, Event};
use ripple_transport::TransportDriver;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::supervisor::{ConnectionState, Status, StatusCallback, Supervisor};

/// Options for starting a subscription.
#[derive(Clone)]
pub struct SubscriptionOptions {
    /// Reconnect backoff.
    pub backoff: BackoffPolicy,
    /// Resume after this event instead of starting fresh.
    pub resume_from: Option<Cursor>,
    /// Number of recent event ids remembered for deduplication.
    pub recent_window: usize,
    /// Native notifications for notify-worthy events.
    pub notifications: NotificationSink,
    /// Observer of connection state transitions.
    pub on_status: Option<StatusCallback>,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            resume_from: None,
            recent_window: DEFAULT_RECENT_WINDOW,
            notifications: NotificationSink::disabled(),
            on_status: None,
        }
    }
}

impl SubscriptionOptions {
    /// Set the status callback.
    #[must_use]
    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Status) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(callback));
        self
    }
}

/// A live subscription to one event stream.
pub struct Subscription {
    viewer: Viewer,
    bus: EventBus,
    state: watch::Receiver<ConnectionState>,
    watermark: watch::Receiver<Option<Cursor>>,
    shutdown: watch::Sender<bool>,
    pending: Option<Supervisor>,
    task: Option<JoinHandle<()>>,
    notifications: Option<SubscriberHandle>,
}

impl Subscription {
    /// Create an idle subscription for events visible to `viewer`.
    ///
    /// Nothing is opened until [`connect`](Self::connect) is called.
    pub fn new(
        driver: Arc<dyn TransportDriver>,
        viewer: Viewer,
        options: SubscriptionOptions,
    ) -> Self {
        let bus = EventBus::new();

        let notifications = options.notifications.is_enabled().then(|| {
            let sink = options.notifications.clone();
            bus.subscribe(viewer.clone(), move |event| {
                sink.offer(event);
            })
        });

        let mut tracker = CursorTracker::with_window(options.recent_window);
        if let Some(cursor) = options.resume_from {
            tracker = tracker.resumed(cursor);
        }

        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (watermark_tx, watermark_rx) = watch::channel(tracker.watermark().cloned());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            driver = driver.name(),
            viewer = %viewer.identity,
            role = %viewer.role,
            since = ?tracker.since(),
            "Subscription created"
        );

        let supervisor = Supervisor {
            driver,
            bus: bus.clone(),
            tracker,
            backoff: options.backoff,
            on_status: options.on_status,
            state: state_tx,
            watermark: watermark_tx,
            shutdown: shutdown_rx,
        };

        Self {
            viewer,
            bus,
            state: state_rx,
            watermark: watermark_rx,
            shutdown: shutdown_tx,
            pending: Some(supervisor),
            task: None,
            notifications,
        }
    }

    /// Start the supervisor task.
    ///
    /// Must be called from within a tokio runtime. Calling it again, or after
    /// [`unsubscribe`](Self::unsubscribe), does nothing.
    pub fn connect(&mut self) {
        if let Some(supervisor) = self.pending.take() {
            debug!(subscribers = self.bus.subscriber_count(), "Connecting subscription");
            self.task = Some(tokio::spawn(supervisor.run()));
        }
    }

    /// Register a callback for events visible to this subscription's viewer.
    pub fn on_event<F>(&self, callback: F) -> SubscriberHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.subscribe(self.viewer.clone(), callback)
    }

    /// The bus events are dispatched on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The viewer events are projected for.
    #[must_use]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Cursor of the newest delivered event.
    #[must_use]
    pub fn watermark(&self) -> Option<Cursor> {
        self.watermark.borrow().clone()
    }

    /// The `since` value the next open will carry.
    #[must_use]
    pub fn since(&self) -> Option<u64> {
        self.watermark.borrow().as_ref().map(|c| c.created_at)
    }

    /// Tear down the transport and any pending timer.
    ///
    /// Idempotent. The state is `Idle` once this returns.
    pub async fn unsubscribe(&mut self) {
        self.shutdown.send_replace(true);
        self.pending = None;

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Supervisor task failed");
            }
        }
        if let Some(handle) = self.notifications.take() {
            handle.unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
