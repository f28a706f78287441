//! # ripple-core
//!
//! Transport-independent building blocks of the Ripple event delivery client.
//!
//! - **CursorTracker** - Watermark and duplicate suppression per subscription
//! - **Visibility** - Pure role-based projection of events onto viewers
//! - **EventBus** - In-process fan-out to subscriber callbacks
//! - **BackoffPolicy** - Reconnection delay schedule
//! - **Publisher** - Validated, non-retrying outbound messages
//! - **NotificationSink** - Best-effort native notifications
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │────▶│ CursorTracker │────▶│  EventBus   │────▶│ Subscribers │
//! └─────────────┘     └───────────────┘     └─────────────┘     └─────────────┘
//!                                                  │
//!                                                  ▼
//!                                           ┌─────────────┐
//!                                           │ Visibility  │
//!                                           └─────────────┘
//! ```

pub mod backoff;
pub mod bus;
pub mod cursor;
pub mod notify;
pub mod publisher;
pub mod visibility;

pub use backoff::BackoffPolicy;
pub use bus::{DispatchReport, EventBus, SubscriberHandle};
pub use cursor::{Admission, CursorTracker};
pub use notify::{LogNotifier, NotificationSink, Notifier, NotifyError};
pub use publisher::{
    BoundaryError, PublishBoundary, PublishError, Publisher, PublisherConfig, ValidationError,
};
pub use visibility::{visible, Viewer};
