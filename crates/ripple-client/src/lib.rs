//! # ripple-client
//!
//! Reconnecting event subscription client for Ripple.
//!
//! A [`Subscription`] runs one supervisor task per viewer:
//!
//! ```text
//! TransportDriver -> Supervisor -> CursorTracker -> EventBus -> subscribers
//!   (push | poll)    (backoff)      (dedup)         (visibility)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ripple_client::{Subscription, SubscriptionOptions};
//! use ripple_core::Viewer;
//! use ripple_transport::{build_driver, TransportKind};
//!
//! let driver = build_driver(TransportKind::Push, &settings)?;
//! let mut subscription = Subscription::new(driver, Viewer::regular("42"), SubscriptionOptions::default());
//! let _handle = subscription.on_event(|event| println!("{}", event.id));
//! subscription.connect();
//! ```

pub mod config;
pub mod metrics;
pub mod subscription;
pub mod supervisor;

pub use config::Config;
pub use subscription::{Subscription, SubscriptionOptions};
pub use supervisor::{ConnectionState, Status, StatusCallback};
