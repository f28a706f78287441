//! Transport abstraction traits for Ripple.
//!
//! A [`TransportDriver`] opens an [`EventStream`] resuming after a `since`
//! cursor. The supervisor only ever sees this contract, whether events arrive
//! over a long-lived push connection or a polling loop.

use async_trait::async_trait;
use ripple_protocol::Event;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Delivery mechanism, selected once when the driver is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One long-lived server-push connection.
    #[default]
    Push,
    /// Fixed-interval requests.
    Poll,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Push => f.write_str("push"),
            TransportKind::Poll => f.write_str("poll"),
        }
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No frame arrived within the liveness window.
    #[error("No frame received within {0:?}")]
    Timeout(Duration),

    /// Failed to establish the connection.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The server answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Too many consecutive malformed frames.
    #[error("{0} consecutive malformed frames")]
    ParseBurst(usize),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ripple_protocol::ProtocolError),

    /// Credentials were rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server rejected the subscription.
    #[error("Rejected by server ({code}): {message}")]
    Rejected { code: u16, message: String },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Classify an HTTP status that is not a success.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => TransportError::Unauthorized(if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            }),
            _ => TransportError::Status { status, body },
        }
    }

    /// Whether the supervisor should back off and reconnect.
    ///
    /// Application-level rejections need fresh credentials instead.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TransportError::Unauthorized(_) | TransportError::Rejected { .. }
        )
    }
}

/// One item read from an [`EventStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A delivery batch. Poll ticks may produce an empty batch.
    Events(Vec<Event>),
    /// Liveness signal carrying no events.
    Heartbeat,
}

/// Opens event streams.
#[async_trait]
pub trait TransportDriver: Send + Sync {
    /// Open a stream delivering events newer than `since`.
    async fn open(&self, since: Option<u64>) -> Result<Box<dyn EventStream>, TransportError>;

    /// Get the driver name (e.g., "websocket", "http-poll").
    fn name(&self) -> &'static str;

    /// Which delivery mechanism this driver uses.
    fn kind(&self) -> TransportKind;
}

/// An open stream of events.
#[async_trait]
pub trait EventStream: Send {
    /// Wait for the next item.
    ///
    /// Returns `None` if the stream ended cleanly.
    async fn next(&mut self) -> Result<Option<StreamItem>, TransportError>;

    /// Close the stream. Idempotent.
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            TransportError::from_status(401, ""),
            TransportError::Unauthorized(msg) if msg == "HTTP 401"
        ));
        assert!(matches!(
            TransportError::from_status(403, "banned"),
            TransportError::Unauthorized(msg) if msg == "banned"
        ));
        assert!(TransportError::from_status(503, "").is_retryable());
    }

    #[test]
    fn test_rejections_are_fatal() {
        assert!(!TransportError::Unauthorized("x".into()).is_retryable());
        assert!(!TransportError::Rejected {
            code: 409,
            message: "x".into()
        }
        .is_retryable());
        assert!(TransportError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(TransportError::ParseBurst(6).is_retryable());
        assert!(TransportError::ConnectionClosed.is_retryable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(TransportKind::default(), TransportKind::Push);
        assert_eq!(TransportKind::Poll.to_string(), "poll");
    }
}
