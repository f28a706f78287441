//! Frame types for the Ripple push protocol.
//!
//! The push endpoint emits named frames: `event` carries one [`Event`],
//! `heartbeat` is an empty keep-alive, and `error` rejects the subscription.

use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code the server uses for missing or expired credentials.
pub const ERROR_UNAUTHORIZED: u16 = 401;

/// Error code the server uses when the viewer may not read the channel.
pub const ERROR_FORBIDDEN: u16 = 403;

/// Frame type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Event,
    Heartbeat,
    Error,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameType::Event => "event",
            FrameType::Heartbeat => "heartbeat",
            FrameType::Error => "error",
        };
        f.write_str(s)
    }
}

/// A push protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// A single stream event.
    #[serde(rename = "event")]
    Event {
        /// The delivered event.
        event: Event,
    },

    /// Keep-alive frame, used only for liveness detection.
    #[serde(rename = "heartbeat")]
    Heartbeat {
        /// Advertised heartbeat interval in milliseconds.
        #[serde(
            rename = "intervalMs",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        interval_ms: Option<u64>,
    },

    /// Application-level rejection of the subscription.
    #[serde(rename = "error")]
    Error {
        /// Error code.
        code: u16,
        /// Human-readable error message.
        message: String,
    },
}

impl Frame {
    /// Get the frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Event { .. } => FrameType::Event,
            Frame::Heartbeat { .. } => FrameType::Heartbeat,
            Frame::Error { .. } => FrameType::Error,
        }
    }

    /// Create a new Event frame.
    #[must_use]
    pub fn event(event: Event) -> Self {
        Frame::Event { event }
    }

    /// Create a heartbeat frame without an advertised interval.
    #[must_use]
    pub fn heartbeat() -> Self {
        Frame::Heartbeat { interval_ms: None }
    }

    /// Create a heartbeat frame advertising its interval.
    #[must_use]
    pub fn heartbeat_every(interval_ms: u64) -> Self {
        Frame::Heartbeat {
            interval_ms: Some(interval_ms),
        }
    }

    /// Create a new Error frame.
    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Frame::Error {
            code,
            message: message.into(),
        }
    }
}

/// Body of an outbound publish request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Trimmed message content.
    pub content: String,
    /// Addressee for a direct message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    /// Identity of the sender.
    pub sender_id: String,
    /// Channel the message is published to.
    pub channel: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Role};

    #[test]
    fn test_frame_type() {
        let event = Event::new("1", EventKind::Message, Role::RegularUser, "42", 1);
        assert_eq!(Frame::event(event).frame_type(), FrameType::Event);
        assert_eq!(Frame::heartbeat().frame_type(), FrameType::Heartbeat);
        assert_eq!(Frame::error(401, "nope").frame_type(), FrameType::Error);
    }

    #[test]
    fn test_named_frames_from_json() {
        let hb: Frame = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(hb, Frame::heartbeat());

        let hb: Frame = serde_json::from_str(r#"{"type":"heartbeat","intervalMs":15000}"#).unwrap();
        assert_eq!(hb, Frame::heartbeat_every(15_000));

        let err: Frame =
            serde_json::from_str(r#"{"type":"error","code":401,"message":"expired"}"#).unwrap();
        assert_eq!(err, Frame::error(ERROR_UNAUTHORIZED, "expired"));
    }

    #[test]
    fn test_publish_request_omits_missing_recipient() {
        let req = PublishRequest {
            content: "hi".into(),
            recipient_id: None,
            sender_id: "42".into(),
            channel: "lobby".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("recipientId"));
        assert!(json.contains("\"senderId\":\"42\""));
    }
}
