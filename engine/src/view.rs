//! Derived read view: filter and sort without touching canonical state.
//!
//! The view is a pure function of the canonical slice, a case-insensitive
//! substring query, and a sort key. It is recomputed whenever any input
//! changes and never mutates element order or membership.

use crate::Bookmark;
use serde::{Deserialize, Serialize};

/// Sort order for the derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Descending `created_at` (default)
    #[default]
    Newest,
    /// Ascending `created_at`
    Oldest,
    /// Lexicographic ascending by title
    Title,
}

/// Filter by case-insensitive substring over `title ++ " " ++ url`, then
/// sort by `sort`. Ties keep their original relative order (stable sort),
/// so the default `Newest` view preserves the store's front-first ordering
/// for rows created in the same millisecond.
pub fn filter_and_sort<'a>(rows: &'a [Bookmark], query: &str, sort: SortKey) -> Vec<&'a Bookmark> {
    let needle = query.to_lowercase();

    let mut visible: Vec<&Bookmark> = rows
        .iter()
        .filter(|b| b.haystack().contains(&needle))
        .collect();

    match sort {
        SortKey::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => visible.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::Title => visible.sort_by(|a, b| a.title.cmp(&b.title)),
    }

    visible
}
