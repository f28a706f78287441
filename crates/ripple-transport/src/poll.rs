//! HTTP polling transport.
//!
//! Each tick issues `GET <url>?since=&channel=&viewer=` and yields the
//! returned batch. A failed tick is logged and skipped; only an authorization
//! rejection ends the stream.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use ripple_protocol::Event;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::traits::{EventStream, StreamItem, TransportDriver, TransportError, TransportKind};

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Poll transport configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Poll endpoint.
    pub url: String,
    /// Channel to read.
    pub channel: String,
    /// Identity of the viewer.
    pub viewer_id: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Time between ticks. Also the per-request timeout.
    pub interval: Duration,
}

impl PollConfig {
    /// Create a configuration with the default interval.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        channel: impl Into<String>,
        viewer_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            channel: channel.into(),
            viewer_id: viewer_id.into(),
            token: None,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// HTTP poll driver.
pub struct PollDriver {
    client: Client,
    config: PollConfig,
}

impl PollDriver {
    /// Create a new poll driver.
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Create a poll driver sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: PollConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TransportDriver for PollDriver {
    async fn open(&self, since: Option<u64>) -> Result<Box<dyn EventStream>, TransportError> {
        if self.config.interval.is_zero() {
            return Err(TransportError::Other("poll interval must be non-zero".into()));
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            channel = %self.config.channel,
            since = ?since,
            interval = ?self.config.interval,
            "Starting poll loop"
        );

        Ok(Box::new(PollStream {
            client: self.client.clone(),
            config: self.config.clone(),
            ticker,
            since,
            closed: false,
        }))
    }

    fn name(&self) -> &'static str {
        "http-poll"
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Poll
    }
}

/// A running poll loop.
pub struct PollStream {
    client: Client,
    config: PollConfig,
    ticker: Interval,
    since: Option<u64>,
    closed: bool,
}

impl PollStream {
    /// Cursor sent with the next request.
    #[must_use]
    pub fn since(&self) -> Option<u64> {
        self.since
    }

    async fn fetch(&self) -> Result<Vec<Event>, TransportError> {
        let mut query = vec![
            ("channel", self.config.channel.clone()),
            ("viewer", self.config.viewer_id.clone()),
        ];
        if let Some(since) = self.since {
            query.push(("since", since.to_string()));
        }

        let mut request = self
            .client
            .get(&self.config.url)
            .query(&query)
            .timeout(self.config.interval);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), body));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        Ok(response.json::<Vec<Event>>().await?)
    }
}

#[async_trait]
impl EventStream for PollStream {
    async fn next(&mut self) -> Result<Option<StreamItem>, TransportError> {
        loop {
            if self.closed {
                return Ok(None);
            }
            self.ticker.tick().await;

            match self.fetch().await {
                Ok(events) => {
                    if let Some(newest) = events.iter().map(|e| e.created_at).max() {
                        self.since = Some(self.since.map_or(newest, |s| s.max(newest)));
                    }
                    trace!(count = events.len(), since = ?self.since, "Poll tick");
                    return Ok(Some(StreamItem::Events(events)));
                }
                Err(e @ TransportError::Unauthorized(_)) => {
                    warn!(error = %e, "Poll rejected");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "Poll tick failed, retrying next interval");
                }
            }
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_config_default() {
        let config = PollConfig::new("http://localhost/poll", "lobby", "42");
        assert_eq!(config.interval, DEFAULT_POLL_INTERVAL);
        assert!(config.token.is_none());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let mut config = PollConfig::new("http://localhost/poll", "lobby", "42");
        config.interval = Duration::ZERO;
        let driver = PollDriver::new(config);
        assert!(driver.open(None).await.is_err());
        assert_eq!(driver.kind(), TransportKind::Poll);
    }

    #[tokio::test]
    async fn test_closed_stream_ends() {
        let driver = PollDriver::new(PollConfig::new("http://localhost/poll", "lobby", "42"));
        let mut stream = driver.open(Some(7)).await.unwrap();
        stream.close().await;
        assert_eq!(stream.next().await.unwrap(), None);
    }
}
