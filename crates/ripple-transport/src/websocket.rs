//! WebSocket push transport.
//!
//! This module provides the push driver using tokio-tungstenite. The resume
//! cursor is sent once, as a query parameter of the connect request; after
//! that the server pushes `event` and `heartbeat` frames.

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use ripple_protocol::{codec, Frame, ProtocolError, ERROR_FORBIDDEN, ERROR_UNAUTHORIZED};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        Error as WsError, Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace, warn};

use crate::traits::{EventStream, StreamItem, TransportDriver, TransportError, TransportKind};

/// Consecutive malformed frames tolerated before the connection is dropped.
pub const PARSE_ERROR_BURST: usize = 5;

/// Liveness window multiplier applied to an advertised heartbeat interval.
pub const HEARTBEAT_MISS_FACTOR: u32 = 3;

/// Push transport configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// WebSocket endpoint, e.g. `ws://host/stream`.
    pub url: String,
    /// Channel to subscribe to.
    pub channel: String,
    /// Identity of the viewer.
    pub viewer_id: String,
    /// Bearer token sent with the upgrade request.
    pub token: Option<String>,
    /// Liveness window used until the server advertises a heartbeat interval.
    pub heartbeat_timeout: Duration,
    /// Time allowed for the connect handshake.
    pub connect_timeout: Duration,
    /// Maximum message size in bytes.
    pub max_message_size: usize,
}

impl PushConfig {
    /// Create a configuration with default timeouts.
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
            heartbeat_timeout: Duration::from_secs(45),
            connect_timeout: Duration::from_secs(10),
            max_message_size: 64 * 1024, // 64 KB
        }
    }
}

/// WebSocket push driver.
pub struct WebSocketDriver {
    config: PushConfig,
}

impl WebSocketDriver {
    /// Create a new push driver.
    #[must_use]
    pub fn new(config: PushConfig) -> Self {
        Self { config }
    }

    /// Build the connect URL carrying the resume cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is invalid.
    pub fn connect_url(&self, since: Option<u64>) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.config.url)
            .map_err(|e| TransportError::Connect(format!("invalid push url: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("channel", &self.config.channel)
                .append_pair("viewer", &self.config.viewer_id);
            if let Some(since) = since {
                query.append_pair("since", &since.to_string());
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl TransportDriver for WebSocketDriver {
    async fn open(&self, since: Option<u64>) -> Result<Box<dyn EventStream>, TransportError> {
        let url = self.connect_url(since)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if let Some(token) = &self.config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::Connect(format!("invalid token: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        debug!(channel = %self.config.channel, since = ?since, "Opening push connection");

        let (ws, _response) = match timeout(self.config.connect_timeout, connect_async(request))
            .await
        {
            Err(_) => return Err(TransportError::Timeout(self.config.connect_timeout)),
            Ok(Err(WsError::Http(response))) => {
                let status = response.status().as_u16();
                let body = response
                    .body()
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                return Err(TransportError::from_status(status, body));
            }
            Ok(Err(e)) => return Err(TransportError::Connect(e.to_string())),
            Ok(Ok(pair)) => pair,
        };

        info!(channel = %self.config.channel, since = ?since, "Push connection established");

        Ok(Box::new(WebSocketStreamReader::new(
            ws,
            self.config.heartbeat_timeout,
            self.config.max_message_size,
        )))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Push
    }
}

/// An open push connection.
pub struct WebSocketStreamReader {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    liveness: Duration,
    read_buffer: BytesMut,
    max_message_size: usize,
    parse_errors: usize,
    closed: bool,
}

impl WebSocketStreamReader {
    fn new(
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        liveness: Duration,
        max_message_size: usize,
    ) -> Self {
        Self {
            ws,
            liveness,
            read_buffer: BytesMut::with_capacity(4096),
            max_message_size,
            parse_errors: 0,
            closed: false,
        }
    }

    /// Turn a decoded frame into a stream item.
    ///
    /// Malformed frames are dropped until the burst threshold is exceeded.
    fn handle_decoded(
        &mut self,
        decoded: Result<Frame, ProtocolError>,
    ) -> Result<Option<StreamItem>, TransportError> {
        let frame = match decoded {
            Ok(frame) => frame,
            Err(e) => {
                self.parse_errors += 1;
                warn!(error = %e, consecutive = self.parse_errors, "Dropping malformed frame");
                if self.parse_errors > PARSE_ERROR_BURST {
                    return Err(TransportError::ParseBurst(self.parse_errors));
                }
                return Ok(None);
            }
        };
        self.parse_errors = 0;

        match frame {
            Frame::Event { event } => {
                trace!(event = %event.id, "Received event frame");
                Ok(Some(StreamItem::Events(vec![event])))
            }
            Frame::Heartbeat { interval_ms } => {
                if let Some(ms) = interval_ms.filter(|ms| *ms > 0) {
                    self.liveness = Duration::from_millis(ms) * HEARTBEAT_MISS_FACTOR;
                }
                trace!(liveness = ?self.liveness, "Received heartbeat");
                Ok(Some(StreamItem::Heartbeat))
            }
            Frame::Error { code, message } => {
                warn!(code, message = %message, "Server rejected subscription");
                if code == ERROR_UNAUTHORIZED || code == ERROR_FORBIDDEN {
                    Err(TransportError::Unauthorized(message))
                } else {
                    Err(TransportError::Rejected { code, message })
                }
            }
        }
    }

    /// Decode complete binary frames already buffered.
    fn drain_buffer(&mut self) -> Result<Option<StreamItem>, TransportError> {
        loop {
            match codec::decode_from(&mut self.read_buffer) {
                Ok(None) => return Ok(None),
                Ok(Some(frame)) => {
                    if let Some(item) = self.handle_decoded(Ok(frame))? {
                        return Ok(Some(item));
                    }
                }
                Err(e) => {
                    if let Some(item) = self.handle_decoded(Err(e))? {
                        return Ok(Some(item));
                    }
                }
            }
        }
    }

    fn check_size(&self, len: usize) -> Result<(), TransportError> {
        if len > self.max_message_size {
            warn!(
                "Message too large: {} bytes (max: {})",
                len, self.max_message_size
            );
            return Err(TransportError::Protocol(ProtocolError::FrameTooLarge(len)));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStream for WebSocketStreamReader {
    async fn next(&mut self) -> Result<Option<StreamItem>, TransportError> {
        if self.closed {
            return Ok(None);
        }

        loop {
            if let Some(item) = self.drain_buffer()? {
                return Ok(Some(item));
            }

            let message = match timeout(self.liveness, self.ws.next()).await {
                Err(_) => {
                    warn!(liveness = ?self.liveness, "Push connection went silent");
                    return Err(TransportError::Timeout(self.liveness));
                }
                Ok(None) => {
                    debug!("Push stream ended");
                    self.closed = true;
                    return Ok(None);
                }
                Ok(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => {
                    debug!("Push connection closed");
                    self.closed = true;
                    return Ok(None);
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Push connection error");
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Text(text) => {
                    self.check_size(text.len())?;
                    let decoded = codec::decode_text(&text);
                    if let Some(item) = self.handle_decoded(decoded)? {
                        return Ok(Some(item));
                    }
                }
                Message::Binary(data) => {
                    self.check_size(data.len())?;
                    self.read_buffer.extend_from_slice(&data);
                }
                Message::Ping(data) => {
                    if let Err(e) = self.ws.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {}", e);
                    }
                }
                Message::Pong(_) | Message::Frame(_) => {}
                Message::Close(_) => {
                    debug!("Received close frame");
                    self.closed = true;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match timeout(Duration::from_secs(1), self.ws.close(None)).await {
            Ok(Ok(())) => debug!("Push connection closed"),
            Ok(Err(e)) => debug!(error = %e, "Push close failed"),
            Err(_) => debug!("Push close timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_config_default() {
        let config = PushConfig::new("ws://localhost/stream", "lobby", "42");
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(45));
        assert_eq!(config.max_message_size, 64 * 1024);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_connect_url_carries_cursor() {
        let driver = WebSocketDriver::new(PushConfig::new(
            "ws://localhost:9000/stream?v=1",
            "room 1",
            "42",
        ));

        let url = driver.connect_url(Some(100)).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:9000/stream?v=1&channel=room+1&viewer=42&since=100"
        );

        let fresh = driver.connect_url(None).unwrap();
        assert!(!fresh.as_str().contains("since"));
    }

    #[test]
    fn test_invalid_url() {
        let driver = WebSocketDriver::new(PushConfig::new("not a url", "c", "v"));
        assert!(matches!(
            driver.connect_url(None),
            Err(TransportError::Connect(_))
        ));
    }
}
