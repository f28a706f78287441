//! Event types carried by every Ripple transport.
//!
//! Events are produced by an external server and are read-only on the client.
//! Each event is ordered by its [`Cursor`], the `(created_at, id)` pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned event identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Create a new event ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What an event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Message,
    SystemNotice,
    Tip,
    Presence,
}

/// Role of a participant, used both for event origins and for viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    System,
    Moderator,
    RegularUser,
}

impl Role {
    /// Whether this role may see traffic addressed to other participants.
    #[must_use]
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::System | Role::Moderator)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Message => "message",
            EventKind::SystemNotice => "system-notice",
            EventKind::Tip => "tip",
            EventKind::Presence => "presence",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::Moderator => "moderator",
            Role::RegularUser => "regular-user",
        };
        f.write_str(s)
    }
}

/// Total ordering key of an event.
///
/// Field order matters: the derived `Ord` compares `created_at` first and
/// breaks ties on `id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor {
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Event identifier.
    pub id: EventId,
}

impl Cursor {
    /// Create a new cursor.
    #[must_use]
    pub fn new(created_at: u64, id: impl Into<EventId>) -> Self {
        Self {
            created_at,
            id: id.into(),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.created_at)
    }
}

/// A single entry of the shared chat/notification stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Server-assigned identifier.
    pub id: EventId,
    /// Event kind.
    pub kind: EventKind,
    /// Role of the participant that produced the event.
    pub origin_role: Role,
    /// Identity of the participant that produced the event.
    pub origin_id: String,
    /// Addressee for direct events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    /// Application payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Whether the event should raise a native notification.
    #[serde(default)]
    pub notify: bool,
}

impl Event {
    /// Create a new event with an empty payload.
    #[must_use]
    pub fn new(
        id: impl Into<EventId>,
        kind: EventKind,
        origin_role: Role,
        origin_id: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            origin_role,
            origin_id: origin_id.into(),
            recipient_id: None,
            payload: serde_json::Value::Null,
            created_at,
            notify: false,
        }
    }

    /// Address the event to a single recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Mark the event as notify-worthy.
    #[must_use]
    pub fn notify_worthy(mut self) -> Self {
        self.notify = true;
        self
    }

    /// The ordering key of this event.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.created_at, self.id.clone())
    }

    /// Whether the event is addressed to a single recipient.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.recipient_id.is_some()
    }

    /// Text content of the payload, if it carries one.
    ///
    /// Accepts either a bare string payload or an object with a `content` field.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.payload {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map.get("content").and_then(|v| v.as_str()),
            _ => None,
        }
    }
}
