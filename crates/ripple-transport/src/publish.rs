//! HTTP publish boundary.

use async_trait::async_trait;
use reqwest::Client;
use ripple_core::{BoundaryError, PublishBoundary};
use ripple_protocol::{Event, PublishRequest};
use std::time::Duration;
use tracing::debug;

/// Default request timeout for publishing.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts publish requests as JSON and decodes the persisted event.
#[derive(Debug, Clone)]
pub struct HttpPublishBoundary {
    client: Client,
    url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpPublishBoundary {
    /// Create a boundary posting to `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            token: None,
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Send `token` as a bearer credential.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PublishBoundary for HttpPublishBoundary {
    async fn send(&self, request: PublishRequest) -> Result<Event, BoundaryError> {
        let mut builder = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BoundaryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(BoundaryError::Unauthorized(if body.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                body
            }));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BoundaryError::Transport(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let event = response
            .json::<Event>()
            .await
            .map_err(|e| BoundaryError::Transport(format!("invalid response: {e}")))?;
        debug!(event = %event.id, "Publish accepted");
        Ok(event)
    }
}
