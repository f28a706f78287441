//! Outbound message publishing.
//!
//! The [`Publisher`] validates a send request locally and forwards it once to
//! a [`PublishBoundary`]. It never retries: a request that may already have
//! been persisted is not sent a second time. A published message is not
//! injected into the local bus; the sender sees it when it arrives back
//! through the inbound stream with its server-assigned id.

use async_trait::async_trait;
use ripple_protocol::{Event, EventId, PublishRequest};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Default maximum content length in characters.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 200;

/// Maximum recipient id length.
pub const MAX_RECIPIENT_ID_LENGTH: usize = 64;

/// Local validation failures. These never reach the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Content is empty after trimming.
    #[error("Message content cannot be empty")]
    Empty,

    /// Content exceeds the configured maximum.
    #[error("Message content is {len} characters (max: {max})")]
    TooLong { len: usize, max: usize },

    /// Recipient id is malformed.
    #[error("Invalid recipient id: {0}")]
    InvalidRecipient(&'static str),
}

/// Failures reported by a [`PublishBoundary`].
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// Credentials were rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The request could not be delivered or was refused.
    #[error("{0}")]
    Transport(String),
}

/// Publish errors returned to the caller.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Request failed local validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Credentials were rejected; a fresh login is required.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The boundary failed. The message may or may not have been stored.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<BoundaryError> for PublishError {
    fn from(err: BoundaryError) -> Self {
        match err {
            BoundaryError::Unauthorized(msg) => PublishError::Unauthorized(msg),
            BoundaryError::Transport(msg) => PublishError::Transport(msg),
        }
    }
}

/// The external endpoint that persists outbound messages.
#[async_trait]
pub trait PublishBoundary: Send + Sync {
    /// Submit a validated request, returning the persisted event.
    async fn send(&self, request: PublishRequest) -> Result<Event, BoundaryError>;
}

/// Validate a recipient id.
///
/// # Errors
///
/// Returns an error if the id is empty, too long, or has invalid characters.
pub fn validate_recipient_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::InvalidRecipient("recipient id cannot be empty"));
    }
    if id.len() > MAX_RECIPIENT_ID_LENGTH {
        return Err(ValidationError::InvalidRecipient("recipient id too long"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
    {
        return Err(ValidationError::InvalidRecipient(
            "recipient id contains invalid characters",
        ));
    }
    Ok(())
}

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Identity sent as the message sender.
    pub sender_id: String,
    /// Channel messages are published to.
    pub channel: String,
    /// Maximum content length in characters, after trimming.
    pub max_content_length: usize,
}

impl PublisherConfig {
    /// Create a configuration with the default content limit.
    #[must_use]
    pub fn new(sender_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            channel: channel.into(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// Validates and forwards outbound messages.
#[derive(Clone)]
pub struct Publisher {
    boundary: Arc<dyn PublishBoundary>,
    config: PublisherConfig,
}

impl Publisher {
    /// Create a new publisher.
    #[must_use]
    pub fn new(boundary: Arc<dyn PublishBoundary>, config: PublisherConfig) -> Self {
        Self { boundary, config }
    }

    /// Get the publisher configuration.
    #[must_use]
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Build the request for `content` without sending it.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first failed check.
    pub fn prepare(
        &self,
        content: &str,
        recipient_id: Option<&str>,
    ) -> Result<PublishRequest, ValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::Empty);
        }

        let len = content.chars().count();
        if len > self.config.max_content_length {
            return Err(ValidationError::TooLong {
                len,
                max: self.config.max_content_length,
            });
        }

        if let Some(id) = recipient_id {
            validate_recipient_id(id)?;
        }

        Ok(PublishRequest {
            content: content.to_string(),
            recipient_id: recipient_id.map(str::to_string),
            sender_id: self.config.sender_id.clone(),
            channel: self.config.channel.clone(),
        })
    }

    /// Validate and send a message, returning the server-assigned event id.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Validation`] without contacting the boundary
    /// when the request is invalid, or the boundary's failure otherwise.
    pub async fn publish(
        &self,
        content: &str,
        recipient_id: Option<&str>,
    ) -> Result<EventId, PublishError> {
        let request = self.prepare(content, recipient_id)?;
        let direct = request.recipient_id.is_some();

        match self.boundary.send(request).await {
            Ok(event) => {
                debug!(event = %event.id, direct, "Message published");
                Ok(event.id)
            }
            Err(e) => {
                warn!(error = %e, direct, "Publish failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_protocol::{EventKind, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBoundary {
        calls: AtomicUsize,
        last: Mutex<Option<PublishRequest>>,
        fail: Option<fn() -> BoundaryError>,
    }

    #[async_trait]
    impl PublishBoundary for RecordingBoundary {
        async fn send(&self, request: PublishRequest) -> Result<Event, BoundaryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            if let Some(fail) = self.fail {
                return Err(fail());
            }
            Ok(Event::new(
                format!("srv-{n}"),
                EventKind::Message,
                Role::RegularUser,
                request.sender_id,
                1_000,
            ))
        }
    }

    fn connection_reset() -> BoundaryError {
        BoundaryError::Transport("connection reset".into())
    }

    fn token_expired() -> BoundaryError {
        BoundaryError::Unauthorized("token expired".into())
    }

    fn publisher(boundary: Arc<RecordingBoundary>) -> Publisher {
        Publisher::new(boundary, PublisherConfig::new("42", "lobby"))
    }

    #[tokio::test]
    async fn test_blank_content_never_reaches_boundary() {
        let boundary = Arc::new(RecordingBoundary::default());
        let publisher = publisher(boundary.clone());

        let err = publisher.publish("   ", None).await.unwrap_err();
        assert!(matches!(err, PublishError::Validation(ValidationError::Empty)));
        assert_eq!(boundary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_length_limit_counts_trimmed_chars() {
        let boundary = Arc::new(RecordingBoundary::default());
        let publisher = publisher(boundary.clone());

        let exact = format!("  {}  ", "é".repeat(DEFAULT_MAX_CONTENT_LENGTH));
        assert!(publisher.publish(&exact, None).await.is_ok());

        let long = "a".repeat(DEFAULT_MAX_CONTENT_LENGTH + 1);
        let err = publisher.publish(&long, None).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::Validation(ValidationError::TooLong { len: 201, max: 200 })
        ));
        assert_eq!(boundary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_recipient_rejected() {
        let boundary = Arc::new(RecordingBoundary::default());
        let publisher = publisher(boundary.clone());

        let long = "x".repeat(MAX_RECIPIENT_ID_LENGTH + 1);
        for bad in ["", "has space", long.as_str()] {
            let err = publisher.publish("hi", Some(bad)).await.unwrap_err();
            assert!(matches!(
                err,
                PublishError::Validation(ValidationError::InvalidRecipient(_))
            ));
        }
        assert_eq!(boundary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_returns_server_id() {
        let boundary = Arc::new(RecordingBoundary::default());
        let publisher = publisher(boundary.clone());

        let id = publisher.publish("  hello  ", Some("99")).await.unwrap();
        assert_eq!(id, EventId::new("srv-0"));

        let sent = boundary.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.content, "hello");
        assert_eq!(sent.recipient_id.as_deref(), Some("99"));
        assert_eq!(sent.sender_id, "42");
        assert_eq!(sent.channel, "lobby");
    }

    #[tokio::test]
    async fn test_boundary_failure_is_not_retried() {
        let boundary = Arc::new(RecordingBoundary {
            fail: Some(connection_reset as fn() -> BoundaryError),
            ..Default::default()
        });
        let publisher = publisher(boundary.clone());

        let err = publisher.publish("hi", None).await.unwrap_err();
        assert!(matches!(err, PublishError::Transport(_)));
        assert_eq!(boundary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_boundary_unauthorized() {
        let boundary = Arc::new(RecordingBoundary {
            fail: Some(token_expired as fn() -> BoundaryError),
            ..Default::default()
        });
        let publisher = publisher(boundary);

        let err = publisher.publish("hi", None).await.unwrap_err();
        assert!(matches!(err, PublishError::Unauthorized(_)));
    }
}
