//! Change notification events.
//!
//! Writes made by any writer - this session, another tab, another device -
//! arrive as tagged events over the change feed. Delivery is at-least-once
//! and possibly duplicated, so every event must be safe to apply twice.

use crate::{Bookmark, BookmarkId};
use serde::{Deserialize, Serialize};

/// A row-level change made by some writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeEvent {
    /// A row was created; carries the full authoritative row.
    Insert(Bookmark),
    /// A row was modified; carries the full replacement row.
    Update(Bookmark),
    /// A row was removed; only the id is guaranteed to be present.
    Delete { id: BookmarkId },
}

impl ChangeEvent {
    /// The id of the bookmark this event targets.
    pub fn bookmark_id(&self) -> &BookmarkId {
        match self {
            ChangeEvent::Insert(row) => &row.id,
            ChangeEvent::Update(row) => &row.id,
            ChangeEvent::Delete { id } => id,
        }
    }
}
