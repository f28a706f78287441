//! # ripple-transport
//!
//! Transport drivers for the Ripple event delivery client.
//!
//! This crate provides a unified interface for the two delivery mechanisms:
//!
//! - **WebSocket push** - One long-lived connection, server-pushed frames
//! - **HTTP poll** - Fixed-interval requests carrying the resume cursor
//!
//! It also carries the HTTP [`PublishBoundary`](ripple_core::PublishBoundary)
//! used for outbound messages.
//!
//! ## Transport Abstraction
//!
//! Both drivers implement [`TransportDriver`] and [`EventStream`], so the
//! supervisor is mechanism-agnostic.
//!
//! ```rust,ignore
//! use ripple_transport::{EventStream, StreamItem, TransportDriver};
//!
//! async fn tail(driver: &dyn TransportDriver) -> Result<(), TransportError> {
//!     let mut stream = driver.open(Some(100)).await?;
//!     while let Some(item) = stream.next().await? {
//!         if let StreamItem::Events(events) = item {
//!             // Process events
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod poll;
pub mod publish;
pub mod strategy;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use poll::{PollConfig, PollDriver};
pub use publish::HttpPublishBoundary;
pub use strategy::{build_driver, DriverSettings};
pub use traits::{EventStream, StreamItem, TransportDriver, TransportError, TransportKind};

#[cfg(feature = "websocket")]
pub use websocket::{PushConfig, WebSocketDriver};
