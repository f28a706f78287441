//! Cursor tracking and duplicate suppression.
//!
//! A [`CursorTracker`] is owned by exactly one subscription. It keeps the
//! watermark of the newest accepted event, which is sent as `since` when the
//! transport is reopened, and drops events the transport delivers again.

use ripple_protocol::{Cursor, Event, EventId};
use std::collections::{HashSet, VecDeque};
use tracing::trace;

/// Default number of recently accepted ids remembered for deduplication.
pub const DEFAULT_RECENT_WINDOW: usize = 512;

/// Outcome of offering an event to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First delivery; forward to subscribers.
    New,
    /// The id was accepted before.
    Duplicate,
    /// Older than the watermark's timestamp.
    Stale,
}

impl Admission {
    /// Whether the event should reach subscribers.
    #[must_use]
    pub fn is_new(self) -> bool {
        matches!(self, Admission::New)
    }
}

/// Monotonic watermark plus a bounded window of recently accepted ids.
#[derive(Debug, Clone)]
pub struct CursorTracker {
    watermark: Option<Cursor>,
    recent: VecDeque<EventId>,
    recent_set: HashSet<EventId>,
    window: usize,
}

impl Default for CursorTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_RECENT_WINDOW)
    }

    /// Create an empty tracker remembering up to `window` recent ids.
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        Self {
            watermark: None,
            recent: VecDeque::with_capacity(window.min(4096)),
            recent_set: HashSet::new(),
            window: window.max(1),
        }
    }

    /// Create a tracker resuming from a previously delivered event.
    #[must_use]
    pub fn resume_from(cursor: Cursor) -> Self {
        Self::new().resumed(cursor)
    }

    /// Start this tracker from a previously delivered event.
    #[must_use]
    pub fn resumed(mut self, cursor: Cursor) -> Self {
        self.reset();
        self.remember(cursor.id.clone());
        self.watermark = Some(cursor);
        self
    }

    /// The cursor of the newest accepted event.
    #[must_use]
    pub fn watermark(&self) -> Option<&Cursor> {
        self.watermark.as_ref()
    }

    /// The `since` value to send when (re)opening a transport.
    #[must_use]
    pub fn since(&self) -> Option<u64> {
        self.watermark.as_ref().map(|c| c.created_at)
    }

    /// Offer an event to the tracker.
    ///
    /// The watermark only ever moves forward.
    pub fn accept(&mut self, event: &Event) -> Admission {
        if self.recent_set.contains(&event.id) {
            trace!(event = %event.id, "Dropping duplicate event");
            return Admission::Duplicate;
        }

        if let Some(watermark) = &self.watermark {
            if event.created_at < watermark.created_at {
                trace!(event = %event.id, watermark = %watermark, "Dropping stale event");
                return Admission::Stale;
            }
        }

        let cursor = event.cursor();
        match &self.watermark {
            Some(current) if *current >= cursor => {}
            _ => self.watermark = Some(cursor),
        }
        self.remember(event.id.clone());

        Admission::New
    }

    /// Offer a delivery batch, returning the new events in cursor order.
    pub fn accept_batch(&mut self, mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by_key(Event::cursor);
        events.retain(|event| self.accept(event).is_new());
        events
    }

    /// Forget everything, as on a full resubscribe.
    pub fn reset(&mut self) {
        self.watermark = None;
        self.recent.clear();
        self.recent_set.clear();
    }

    fn remember(&mut self, id: EventId) {
        if self.recent.len() == self.window {
            if let Some(evicted) = self.recent.pop_front() {
                self.recent_set.remove(&evicted);
            }
        }
        self.recent_set.insert(id.clone());
        self.recent.push_back(id);
    }
}
