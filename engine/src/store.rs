//! Store - the canonical in-memory bookmark collection.
//!
//! The store merges three input paths - the initial bulk load, optimistic
//! local inserts, and delivered change notifications - into one sequence
//! that is unique by id. Insertion order is most-recently-known-inserted
//! first; it matters only for default display, never for correctness.
//!
//! Every mutation is keyed by id and idempotent:
//!
//! - an insert (optimistic or notified) for an id already present is ignored,
//! - an update for an unknown id is dropped (a notification may outrun the
//!   initial load; re-ordering or queueing it is deliberately not attempted),
//! - a delete for an unknown id is ignored.
//!
//! Idempotence makes the optimistic path and the notification path for the
//! same logical create commute, so the row is represented exactly once
//! regardless of arrival order.

use crate::{Bookmark, ChangeEvent};
use serde::{Deserialize, Serialize};

/// What a merge operation actually did, for callers that log or assert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyOutcome {
    /// A new row was added at the front
    Inserted,
    /// An existing row was replaced in place
    Updated,
    /// A row was removed
    Removed,
    /// The event did not change the collection
    Ignored,
}

/// A row taken out of the store, remembering where it sat.
///
/// Produced by [`BookmarkStore::take`] for optimistic deletes; hand it back
/// to [`BookmarkStore::restore`] if the remote delete fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedBookmark {
    /// The removed row
    pub bookmark: Bookmark,
    /// Index the row occupied at removal time
    pub index: usize,
}

/// The canonical bookmark collection for one active session.
///
/// Created empty at session start, populated by the bulk load, mutated by
/// every accepted optimistic operation and every delivered notification,
/// and discarded when the session ends. No other component holds a mutable
/// reference into the collection; readers go through [`BookmarkStore::view`]
/// or the slice accessor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkStore {
    canonical: Vec<Bookmark>,
}

impl BookmarkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            canonical: Vec::new(),
        }
    }

    /// Replace the collection wholesale with the bulk-load result.
    ///
    /// Rows are ordered by `created_at` descending and de-duplicated by
    /// first occurrence, so the uniqueness invariant holds even if the
    /// fetch layer misbehaves. Called once per session activation; any
    /// prior content is superseded.
    pub fn load_initial(&mut self, mut rows: Vec<Bookmark>) {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut deduped: Vec<Bookmark> = Vec::with_capacity(rows.len());
        for row in rows {
            if !deduped.iter().any(|b| b.id == row.id) {
                deduped.push(row);
            }
        }

        self.canonical = deduped;
    }

    /// Insert `row` at the front iff no element with that id exists.
    ///
    /// Used both for the user's own optimistic create (the server response
    /// row is applied before the notification round-trips) and for notified
    /// inserts, which is exactly why the two arrival orders commute.
    pub fn apply_optimistic_insert(&mut self, row: Bookmark) -> ApplyOutcome {
        if self.contains(&row.id) {
            return ApplyOutcome::Ignored;
        }
        self.canonical.insert(0, row);
        ApplyOutcome::Inserted
    }

    /// Merge one delivered change notification.
    pub fn apply_event(&mut self, event: ChangeEvent) -> ApplyOutcome {
        match event {
            ChangeEvent::Insert(row) => self.apply_optimistic_insert(row),
            ChangeEvent::Update(row) => match self.position(&row.id) {
                Some(index) => {
                    self.canonical[index] = row;
                    ApplyOutcome::Updated
                }
                // Row not locally known (e.g. the notification outran the
                // initial load, or a stale update trails a delete): drop it.
                None => ApplyOutcome::Ignored,
            },
            ChangeEvent::Delete { id } => match self.position(&id) {
                Some(index) => {
                    self.canonical.remove(index);
                    ApplyOutcome::Removed
                }
                None => ApplyOutcome::Ignored,
            },
        }
    }

    /// Remove the row with `id`, remembering its position for rollback.
    pub fn take(&mut self, id: &str) -> Option<RemovedBookmark> {
        let index = self.position(id)?;
        let bookmark = self.canonical.remove(index);
        Some(RemovedBookmark { bookmark, index })
    }

    /// Put a taken row back at its recorded position.
    ///
    /// The index is clamped to current bounds in case the collection shrank
    /// while the remote delete was in flight. No-op if the id reappeared in
    /// the meantime (a concurrent writer re-created it).
    pub fn restore(&mut self, removed: RemovedBookmark) -> ApplyOutcome {
        if self.contains(&removed.bookmark.id) {
            return ApplyOutcome::Ignored;
        }
        let index = removed.index.min(self.canonical.len());
        self.canonical.insert(index, removed.bookmark);
        ApplyOutcome::Inserted
    }

    /// Get a bookmark by id.
    pub fn get(&self, id: &str) -> Option<&Bookmark> {
        self.canonical.iter().find(|b| b.id == id)
    }

    /// Check whether a bookmark with `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.canonical.iter().any(|b| b.id == id)
    }

    /// The canonical sequence, front = most recently known-inserted.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.canonical
    }

    /// Count of bookmarks.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Filtered, sorted read view. See [`crate::view::filter_and_sort`].
    pub fn view(&self, query: &str, sort: crate::SortKey) -> Vec<&Bookmark> {
        crate::view::filter_and_sort(&self.canonical, query, sort)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.canonical.iter().position(|b| b.id == id)
    }
}
