//! Reconnection supervisor.
//!
//! Owns the connection state machine for one subscription:
//!
//! ```text
//! Idle -> Connecting -> Open -> Reconnecting -> Connecting -> ...
//!              |                     ^
//!              +---------------------+ (retryable failure)
//!              +--> Failed (rejected credentials / server refusal)
//! ```
//!
//! `Open` is entered on the first item a stream yields, which resets the
//! attempt counter. Unsubscribing from any state returns to `Idle`.

use ripple_core::{BackoffPolicy, CursorTracker, EventBus};
use ripple_protocol::{Cursor, Event};
use ripple_transport::{EventStream, StreamItem, TransportDriver, TransportError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::metrics;

/// Connection state of one subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not subscribed.
    #[default]
    Idle,
    /// Opening the transport.
    Connecting,
    /// The transport is delivering.
    Open,
    /// Waiting for the backoff timer.
    Reconnecting,
    /// Rejected by the server; needs a new subscription.
    Failed,
}

impl ConnectionState {
    /// Numeric value exported as a gauge.
    #[must_use]
    pub fn as_gauge(self) -> f64 {
        match self {
            ConnectionState::Idle => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Open => 2.0,
            ConnectionState::Reconnecting => 3.0,
            ConnectionState::Failed => 4.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A state transition reported to the status callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Opening the transport. `attempt` counts failures since the last open.
    Connecting { attempt: u32 },
    /// First item received on the stream.
    Open,
    /// The transport failed; the next open happens after `delay`.
    Reconnecting {
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// The server rejected the subscription.
    Failed { error: String },
    /// The subscription was torn down.
    Idle,
}

impl Status {
    /// The state this status moves to.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self {
            Status::Connecting { .. } => ConnectionState::Connecting,
            Status::Open => ConnectionState::Open,
            Status::Reconnecting { .. } => ConnectionState::Reconnecting,
            Status::Failed { .. } => ConnectionState::Failed,
            Status::Idle => ConnectionState::Idle,
        }
    }
}

/// Injectable observer of state transitions.
pub type StatusCallback = Arc<dyn Fn(&Status) + Send + Sync>;

enum Outcome {
    Shutdown,
    Failed(TransportError),
}

/// Drives one transport driver until shut down.
pub(crate) struct Supervisor {
    pub(crate) driver: Arc<dyn TransportDriver>,
    pub(crate) bus: EventBus,
    pub(crate) tracker: CursorTracker,
    pub(crate) backoff: BackoffPolicy,
    pub(crate) on_status: Option<StatusCallback>,
    pub(crate) state: watch::Sender<ConnectionState>,
    pub(crate) watermark: watch::Sender<Option<Cursor>>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl Supervisor {
    pub(crate) async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            self.transition(Status::Connecting { attempt });
            metrics::record_attempt();

            match self.connect(&mut attempt).await {
                Outcome::Shutdown => break,
                Outcome::Failed(error) if !error.is_retryable() => {
                    metrics::record_error("rejected");
                    self.transition(Status::Failed {
                        error: error.to_string(),
                    });
                    // Stay failed until torn down.
                    cancelled(&mut self.shutdown).await;
                    break;
                }
                Outcome::Failed(error) => {
                    metrics::record_error("transport");
                    let delay = self.backoff.delay(attempt);
                    metrics::record_backoff(delay);
                    self.transition(Status::Reconnecting {
                        attempt,
                        delay,
                        error: error.to_string(),
                    });
                    attempt = attempt.saturating_add(1);

                    tokio::select! {
                        biased;
                        () = cancelled(&mut self.shutdown) => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        self.transition(Status::Idle);
    }

    async fn connect(&mut self, attempt: &mut u32) -> Outcome {
        let since = self.tracker.since();
        debug!(
            driver = self.driver.name(),
            since = ?since,
            attempt = *attempt,
            "Opening transport"
        );

        let opened = tokio::select! {
            biased;
            () = cancelled(&mut self.shutdown) => return Outcome::Shutdown,
            result = self.driver.open(since) => result,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Outcome::Failed(e),
        };
        let outcome = self.pump(stream.as_mut(), attempt).await;
        stream.close().await;
        outcome
    }

    async fn pump(&mut self, stream: &mut dyn EventStream, attempt: &mut u32) -> Outcome {
        let mut open = false;

        loop {
            let next = tokio::select! {
                biased;
                () = cancelled(&mut self.shutdown) => return Outcome::Shutdown,
                next = stream.next() => next,
            };

            match next {
                Ok(Some(item)) => {
                    if !open {
                        open = true;
                        *attempt = 0;
                        self.transition(Status::Open);
                    }
                    if let StreamItem::Events(events) = item {
                        self.deliver(events);
                    }
                }
                Ok(None) => return Outcome::Failed(TransportError::ConnectionClosed),
                Err(e) => return Outcome::Failed(e),
            }
        }
    }

    fn deliver(&mut self, events: Vec<Event>) {
        if events.is_empty() || *self.shutdown.borrow() {
            return;
        }

        let received = events.len();
        let accepted = self.tracker.accept_batch(events);
        metrics::record_batch(received, accepted.len());
        if accepted.len() < received {
            debug!(
                dropped = received - accepted.len(),
                "Discarded redelivered events"
            );
        }

        for event in accepted {
            let report = self.bus.dispatch(event);
            metrics::record_hidden(report.hidden);
        }
        self.watermark.send_replace(self.tracker.watermark().cloned());
    }

    fn transition(&self, status: Status) {
        let state = status.state();
        self.state.send_replace(state);
        metrics::set_connection_state(state);

        match &status {
            Status::Reconnecting {
                attempt,
                delay,
                error,
            } => warn!(attempt, delay = ?delay, error = %error, "Transport failed, reconnecting"),
            Status::Failed { error } => warn!(error = %error, "Subscription rejected"),
            Status::Open => info!(driver = self.driver.name(), "Connection open"),
            Status::Connecting { attempt } => debug!(attempt, "Connecting"),
            Status::Idle => debug!("Subscription idle"),
        }

        if let Some(callback) = &self.on_status {
            callback(&status);
        }
    }
}

/// Resolve once shutdown has been requested or the handle is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
