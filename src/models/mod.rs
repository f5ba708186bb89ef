//! Types that are really the bedrock of the taxonomy.

use tag::UserId;

pub mod history;
pub mod relation;
pub mod tag;

/// An acting user, as answered by the external permission provider.
///
/// The core never decides who may do what - it only consumes the
/// capability bits the caller resolved elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Actor {
    pub id: UserId,

    pub can_create_tags: bool,
    pub can_edit_tags: bool,

    /// Elevated privilege: approving changes and deleting others' tags.
    pub can_approve_changes: bool,
}

impl Actor {
    /// A regular contributor: may create and edit, but not approve.
    pub fn contributor(id: UserId) -> Self {
        Self {
            id,
            can_create_tags: true,
            can_edit_tags: true,
            can_approve_changes: false,
        }
    }

    /// Holds every capability.
    pub fn admin(id: UserId) -> Self {
        Self {
            id,
            can_create_tags: true,
            can_edit_tags: true,
            can_approve_changes: true,
        }
    }

    /// Read-only actor with no capabilities at all.
    pub fn reader(id: UserId) -> Self {
        Self {
            id,
            can_create_tags: false,
            can_edit_tags: false,
            can_approve_changes: false,
        }
    }
}
