//! The bookmark record type.

use crate::{BookmarkId, Timestamp};
use serde::{Deserialize, Serialize};

/// A saved link belonging to exactly one user.
///
/// The `id` is assigned by the remote data service at creation time and is
/// the de-duplication key for every merge operation. Ownership (`user_id`)
/// is enforced at the query/subscription boundary and is not held here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Opaque unique identifier, immutable once assigned
    pub id: BookmarkId,
    /// User-supplied display string, non-empty
    pub title: String,
    /// Absolute http/https URL, normalized before persistence
    pub url: String,
    /// Server-side creation time (milliseconds since epoch), never mutated
    pub created_at: Timestamp,
}

impl Bookmark {
    /// Create a new bookmark.
    pub fn new(
        id: impl Into<BookmarkId>,
        title: impl Into<String>,
        url: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            created_at,
        }
    }

    /// The lowercased text the search filter matches against.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.title, self.url).to_lowercase()
    }
}
