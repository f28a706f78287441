//! In-process fan-out of projected events.
//!
//! The bus delivers each accepted event to every subscriber whose viewer may
//! see it. Visibility is computed once per distinct viewer per event.

use crate::visibility::{visible, Viewer};
use dashmap::DashMap;
use ripple_protocol::Event;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, trace};

/// Subscriber callback.
pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Identifier of a bus subscriber.
pub type SubscriberId = u64;

struct Subscriber {
    viewer: Viewer,
    callback: Callback,
}

struct BusInner {
    subscribers: DashMap<SubscriberId, Subscriber>,
    next_id: AtomicU64,
    dispatching: AtomicBool,
    pending: Mutex<VecDeque<Arc<Event>>>,
}

impl BusInner {
    fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = id, "Bus subscriber removed");
        }
        removed
    }

    fn push_pending(&self, event: Arc<Event>) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    fn pop_pending(&self) -> Option<Arc<Event>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn has_pending(&self) -> bool {
        !self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Clears the dispatching flag even if a callback panics.
struct DispatchGuard<'a>(&'a AtomicBool);

impl<'a> DispatchGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Summary of a [`EventBus::dispatch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks invoked.
    pub delivered: usize,
    /// Subscribers the event was hidden from.
    pub hidden: usize,
    /// Visibility evaluations performed.
    pub projections: usize,
    /// The event was queued behind a dispatch already in progress.
    pub queued: bool,
}

impl DispatchReport {
    fn absorb(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.hidden += other.hidden;
        self.projections += other.projections;
    }
}

/// Event bus shared by everything rendering one subscription.
///
/// Cloning the bus is cheap; clones share subscribers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                dispatching: AtomicBool::new(false),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Register `callback` to receive events visible to `viewer`.
    pub fn subscribe<F>(&self, viewer: Viewer, callback: F) -> SubscriberHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(subscriber = id, viewer = %viewer.identity, role = %viewer.role, "Bus subscriber added");
        self.inner.subscribers.insert(
            id,
            Subscriber {
                viewer,
                callback: Arc::new(callback),
            },
        );
        SubscriberHandle {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Get the number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Deliver an event to every subscriber allowed to see it.
    ///
    /// A dispatch issued from inside a callback is queued and delivered by
    /// the outer call once the current event has reached every subscriber.
    pub fn dispatch(&self, event: Event) -> DispatchReport {
        self.inner.push_pending(Arc::new(event));

        let mut report = DispatchReport::default();
        let mut first = true;
        loop {
            let Some(guard) = DispatchGuard::acquire(&self.inner.dispatching) else {
                if first {
                    trace!("Dispatch in progress, event queued");
                    report.queued = true;
                }
                break;
            };
            first = false;

            while let Some(event) = self.inner.pop_pending() {
                report.absorb(self.deliver(&event));
            }
            drop(guard);

            // Another thread may have queued after the drain but before release.
            if !self.inner.has_pending() {
                break;
            }
        }
        report
    }

    fn deliver(&self, event: &Event) -> DispatchReport {
        let mut snapshot: Vec<(SubscriberId, Viewer, Callback)> = self
            .inner
            .subscribers
            .iter()
            .map(|entry| {
                (
                    *entry.key(),
                    entry.value().viewer.clone(),
                    entry.value().callback.clone(),
                )
            })
            .collect();
        snapshot.sort_by_key(|(id, _, _)| *id);

        let mut report = DispatchReport::default();
        let mut cache: HashMap<Viewer, bool> = HashMap::new();

        for (id, viewer, callback) in snapshot {
            // Removed by an earlier callback of this dispatch.
            if !self.inner.subscribers.contains_key(&id) {
                continue;
            }

            let allowed = match cache.get(&viewer) {
                Some(allowed) => *allowed,
                None => {
                    report.projections += 1;
                    let allowed = visible(event, &viewer);
                    cache.insert(viewer, allowed);
                    allowed
                }
            };

            if allowed {
                callback(event);
                report.delivered += 1;
            } else {
                report.hidden += 1;
            }
        }

        trace!(
            event = %event.id,
            delivered = report.delivered,
            hidden = report.hidden,
            "Dispatched event"
        );
        report
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    bus: Weak<BusInner>,
}

impl SubscriberHandle {
    /// The subscriber id.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the subscriber.
    ///
    /// Idempotent, and safe to call from inside a callback. Returns `true` if
    /// this call removed it.
    pub fn unsubscribe(&self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.unsubscribe(self.id),
            None => false,
        }
    }
}
