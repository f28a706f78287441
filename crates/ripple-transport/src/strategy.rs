//! Transport selection.
//!
//! The delivery mechanism is chosen once, from configuration. There is no
//! runtime failover between push and poll.

use std::sync::Arc;
use std::time::Duration;

use crate::poll::{PollConfig, PollDriver};
use crate::traits::{TransportDriver, TransportError, TransportKind};

/// Everything needed to build either driver.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// WebSocket endpoint for push delivery.
    pub push_url: Option<String>,
    /// HTTP endpoint for poll delivery.
    pub poll_url: Option<String>,
    /// Channel to subscribe to.
    pub channel: String,
    /// Identity of the viewer.
    pub viewer_id: String,
    /// Bearer token passed through to the server.
    pub token: Option<String>,
    /// Poll interval.
    pub poll_interval: Duration,
    /// Push liveness window before a heartbeat advertises one.
    pub heartbeat_timeout: Duration,
}

/// Build the driver for `kind`.
///
/// # Errors
///
/// Returns an error if the endpoint for `kind` is not configured, or if push
/// delivery was requested but the `websocket` feature is disabled.
pub fn build_driver(
    kind: TransportKind,
    settings: &DriverSettings,
) -> Result<Arc<dyn TransportDriver>, TransportError> {
    match kind {
        TransportKind::Push => build_push(settings),
        TransportKind::Poll => {
            let url = settings
                .poll_url
                .clone()
                .ok_or_else(|| TransportError::Other("poll transport requires poll_url".into()))?;
            let mut config = PollConfig::new(url, &settings.channel, &settings.viewer_id);
            config.token = settings.token.clone();
            config.interval = settings.poll_interval;
            Ok(Arc::new(PollDriver::new(config)))
        }
    }
}

#[cfg(feature = "websocket")]
fn build_push(settings: &DriverSettings) -> Result<Arc<dyn TransportDriver>, TransportError> {
    use crate::websocket::{PushConfig, WebSocketDriver};

    let url = settings
        .push_url
        .clone()
        .ok_or_else(|| TransportError::Other("push transport requires push_url".into()))?;
    let mut config = PushConfig::new(url, &settings.channel, &settings.viewer_id);
    config.token = settings.token.clone();
    config.heartbeat_timeout = settings.heartbeat_timeout;
    Ok(Arc::new(WebSocketDriver::new(config)))
}

#[cfg(not(feature = "websocket"))]
fn build_push(_settings: &DriverSettings) -> Result<Arc<dyn TransportDriver>, TransportError> {
    Err(TransportError::Other(
        "push transport requires the websocket feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DriverSettings {
        DriverSettings {
            push_url: Some("ws://localhost/stream".into()),
            poll_url: None,
            channel: "lobby".into(),
            viewer_id: "42".into(),
            token: None,
            poll_interval: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(45),
        }
    }

    #[test]
    fn test_build_selected_driver() {
        let push = build_driver(TransportKind::Push, &settings()).unwrap();
        assert_eq!(push.kind(), TransportKind::Push);

        let mut poll_settings = settings();
        poll_settings.poll_url = Some("http://localhost/poll".into());
        let poll = build_driver(TransportKind::Poll, &poll_settings).unwrap();
        assert_eq!(poll.kind(), TransportKind::Poll);
        assert_eq!(poll.name(), "http-poll");
    }

    #[test]
    fn test_missing_endpoint() {
        assert!(build_driver(TransportKind::Poll, &settings()).is_err());
    }
}
