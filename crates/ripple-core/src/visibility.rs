//! Role-based visibility projection.
//!
//! Every event is projected through [`visible`] before it reaches a
//! subscriber. The projection is pure: the same `(event, viewer)` pair always
//! yields the same answer.

use ripple_protocol::{Event, Role};
use serde::{Deserialize, Serialize};

/// The participant on whose behalf events are rendered.
///
/// A viewer is fixed for the lifetime of a subscription; a role change means
/// tearing the subscription down and creating a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewer {
    /// Role of the viewer.
    pub role: Role,
    /// Identity of the viewer, compared against origin and recipient ids.
    pub identity: String,
}

impl Viewer {
    /// Create a new viewer.
    #[must_use]
    pub fn new(role: Role, identity: impl Into<String>) -> Self {
        Self {
            role,
            identity: identity.into(),
        }
    }

    /// A regular user.
    #[must_use]
    pub fn regular(identity: impl Into<String>) -> Self {
        Self::new(Role::RegularUser, identity)
    }

    /// A moderator.
    #[must_use]
    pub fn moderator(identity: impl Into<String>) -> Self {
        Self::new(Role::Moderator, identity)
    }

    /// Whether this viewer may see `event`.
    #[must_use]
    pub fn can_see(&self, event: &Event) -> bool {
        visible(event, self)
    }
}

/// Decide whether `viewer` may see `event`.
#[must_use]
pub fn visible(event: &Event, viewer: &Viewer) -> bool {
    // Privileged viewers moderate every conversation.
    if viewer.role.is_privileged() {
        return true;
    }

    let own = viewer.identity == event.origin_id;
    match event.origin_role {
        Role::System => true,
        Role::Moderator => match &event.recipient_id {
            None => true,
            Some(recipient) => own || viewer.identity == *recipient,
        },
        Role::RegularUser => own,
    }
}
