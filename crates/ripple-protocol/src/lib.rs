//! # ripple-protocol
//!
//! Wire protocol definitions for the Ripple event delivery client.
//!
//! This crate defines the values exchanged with a Ripple server: the stream
//! [`Event`], the push [`Frame`]s, the outbound [`PublishRequest`], and the
//! codecs for text and binary frames.
//!
//! ## Frame Types
//!
//! - `event` - One stream event
//! - `heartbeat` - Keep-alive, used only for liveness detection
//! - `error` - Application-level rejection of the subscription
//!
//! ## Example
//!
//! ```rust
//! use ripple_protocol::{codec, Event, EventKind, Frame, Role};
//!
//! let event = Event::new("evt-1", EventKind::Message, Role::RegularUser, "42", 100);
//! let frame = Frame::event(event);
//!
//! let text = codec::encode_text(&frame).unwrap();
//! let decoded = codec::decode_text(&text).unwrap();
//! assert_eq!(frame, decoded);
//! ```

pub mod codec;
pub mod event;
pub mod frames;

pub use codec::{decode, decode_text, encode, encode_text, ProtocolError};
pub use event::{Cursor, Event, EventId, EventKind, Role};
pub use frames::{Frame, FrameType, PublishRequest, ERROR_FORBIDDEN, ERROR_UNAUTHORIZED};
