//! Mutation coordinator: user-initiated create/delete with optimistic
//! reflection and rollback.
//!
//! Creates never invent a speculative local id: the server's response row
//! (with authoritative `id` and `created_at`) is what gets applied to the
//! store, through the same idempotent insert path the notification feed
//! uses. That is why the optimistic path and the feed path compose without
//! duplicates no matter which fires first.
//!
//! Deletes remove the row immediately and re-insert it at its recorded
//! position (clamped) if the remote delete fails.

use std::sync::Arc;

use dashmap::DashMap;
use marque_engine::{Bookmark, BookmarkId, BookmarkStore};
use tokio::sync::Mutex;
use url::Url;

use crate::error::{Error, Result};
use crate::services::{DataService, IdentityProvider, NewBookmark, Notice, Notifier};

/// The canonical store shared between the coordinator and the feed listener.
pub type SharedStore = Arc<Mutex<BookmarkStore>>;

/// Per-invocation lifecycle of an optimistic mutation.
///
/// `Committed` and `RolledBack` are terminal; the coordinator keeps no
/// cross-invocation state beyond the in-flight pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// Tracks one mutation through `Idle -> Pending -> {Committed, RolledBack}`.
#[derive(Debug)]
pub(crate) struct MutationTicket {
    kind: &'static str,
    state: MutationState,
}

impl MutationTicket {
    pub(crate) fn begin(kind: &'static str) -> Self {
        let mut ticket = Self {
            kind,
            state: MutationState::Idle,
        };
        ticket.transition(MutationState::Pending);
        ticket
    }

    pub(crate) fn commit(mut self) -> MutationState {
        self.transition(MutationState::Committed);
        self.state
    }

    pub(crate) fn roll_back(mut self) -> MutationState {
        self.transition(MutationState::RolledBack);
        self.state
    }

    fn transition(&mut self, next: MutationState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (MutationState::Idle, MutationState::Pending)
                    | (MutationState::Pending, MutationState::Committed)
                    | (MutationState::Pending, MutationState::RolledBack)
            ),
            "illegal mutation transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(kind = self.kind, from = ?self.state, to = ?next, "mutation transition");
        self.state = next;
    }
}

/// Normalize user URL input: prepend `https://` when no scheme is present,
/// reject any explicit scheme other than http(s), then require an absolute
/// URL with a host.
///
/// Returns the normalized input string, not the parser's re-serialization,
/// so `example.com` becomes exactly `https://example.com`.
pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("url is required".to_string()));
    }

    let candidate = match explicit_scheme(trimmed) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            trimmed.to_string()
        }
        Some(scheme) => {
            return Err(Error::Validation(format!(
                "invalid url: unsupported scheme '{}'",
                scheme.to_ascii_lowercase()
            )))
        }
        None => format!("https://{trimmed}"),
    };

    let parsed =
        Url::parse(&candidate).map_err(|e| Error::Validation(format!("invalid url: {e}")))?;

    if !parsed.has_host() {
        return Err(Error::Validation("invalid url: missing host".to_string()));
    }

    Ok(candidate)
}

/// The explicit scheme of `input`, if it carries one.
///
/// Must run on the raw input: blindly prepending `https://` to something like
/// `ftp://example.com` yields `https://ftp://example.com`, which parses (host
/// `ftp`, empty port) instead of failing. A `host:port` shorthand such as
/// `localhost:3000/dash` is scheme-shaped too, so a colon followed by digits
/// up to the first `/` is treated as a port, not a scheme.
fn explicit_scheme(input: &str) -> Option<&str> {
    let colon = input.find(':')?;
    let (scheme, rest) = (&input[..colon], &input[colon + 1..]);

    let mut chars = scheme.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }

    if rest.starts_with("//") {
        return Some(scheme);
    }
    let port_like = rest.split('/').next().unwrap_or_default();
    if !port_like.is_empty() && port_like.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(scheme)
}

/// Issues create/delete requests against the data service and keeps the
/// shared store optimistically in step, rolling back on failure.
pub struct MutationCoordinator {
    store: SharedStore,
    data: Arc<dyn DataService>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    /// Ids with a delete currently in flight. At most one per id.
    pending_deletes: DashMap<BookmarkId, ()>,
}

impl MutationCoordinator {
    pub fn new(
        store: SharedStore,
        data: Arc<dyn DataService>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            data,
            identity,
            notifier,
            pending_deletes: DashMap::new(),
        }
    }

    /// Create a bookmark: validate, normalize, insert remotely, then apply
    /// the authoritative response row optimistically.
    ///
    /// On remote failure no store mutation occurs; the caller keeps the form
    /// input for retry.
    pub async fn create(&self, title: &str, raw_url: &str) -> Result<Bookmark> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation("title is required".to_string()));
        }
        let url = normalize_url(raw_url)?;

        let user_id = self.identity.current_user().await?;

        let ticket = MutationTicket::begin("create");
        let draft = NewBookmark {
            title: title.to_string(),
            url,
            user_id,
        };

        match self.data.insert(draft).await {
            Ok(row) => {
                let outcome = self.store.lock().await.apply_optimistic_insert(row.clone());
                ticket.commit();
                tracing::info!(id = %row.id, ?outcome, "bookmark created");
                self.notifier
                    .notify(Notice::success("Bookmark saved", "Your link is now synced."));
                Ok(row)
            }
            Err(e) => {
                // Nothing was applied locally, so there is nothing to undo.
                ticket.roll_back();
                tracing::warn!(error = %e, "remote insert failed");
                self.notifier
                    .notify(Notice::error("Could not save bookmark", e.to_string()));
                Err(e)
            }
        }
    }

    /// Delete a bookmark optimistically, restoring it at its recorded
    /// position if the remote delete fails.
    ///
    /// A second delete for an id already in flight is rejected with
    /// [`Error::AlreadyPending`] instead of being issued twice.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.pending_deletes.insert(id.to_string(), ()).is_some() {
            // The original in-flight delete still owns the entry.
            return Err(Error::AlreadyPending(id.to_string()));
        }

        let result = self.delete_inner(id).await;
        self.pending_deletes.remove(id);
        result
    }

    async fn delete_inner(&self, id: &str) -> Result<()> {
        let removed = self.store.lock().await.take(id);
        let Some(removed) = removed else {
            // Nothing is held locally for this id; there is nothing to
            // remove and nothing worth a network round-trip.
            tracing::debug!(id, "delete requested for unknown id");
            return Ok(());
        };

        let ticket = MutationTicket::begin("delete");

        match self.data.delete(id).await {
            Ok(()) => {
                ticket.commit();
                tracing::info!(id, "bookmark deleted");
                self.notifier
                    .notify(Notice::success("Bookmark deleted", "The link was removed."));
                Ok(())
            }
            Err(e) => {
                self.store.lock().await.restore(removed);
                ticket.roll_back();
                tracing::warn!(id, error = %e, "remote delete failed, rolled back");
                self.notifier
                    .notify(Notice::error("Delete failed", e.to_string()));
                Err(e)
            }
        }
    }

    /// Number of deletes currently in flight.
    pub fn pending_delete_count(&self) -> usize {
        self.pending_deletes.len()
    }
}
