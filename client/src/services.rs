//! Collaborator interfaces consumed by the client core.
//!
//! The identity provider, the remote data service, the change-notification
//! feed, and the user-facing notification surface are external systems; the
//! core only depends on these seams. Server-side scoping of rows to the
//! authenticated user is the data service's responsibility - the core passes
//! the user id through and trusts the boundary.

use async_trait::async_trait;
use marque_engine::{Bookmark, ChangeEvent, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// A message delivered on the change feed.
///
/// Delivery is at-least-once and possibly duplicated; the store's idempotent
/// merge is the defense, not the transport.
#[derive(Debug, Clone)]
pub enum FeedMessage {
    /// A row-level change made by some writer.
    Change(ChangeEvent),
    /// The channel reported a terminal error (e.g. disconnect). Surfaced as
    /// a degraded-sync warning; the session keeps its canonical state.
    Dropped(String),
}

/// Sender half handed to the feed on subscribe.
pub type EventSender = mpsc::UnboundedSender<FeedMessage>;

/// Receiver half owned by the session's listener task.
pub type EventReceiver = mpsc::UnboundedReceiver<FeedMessage>;

/// A bookmark awaiting creation; the service assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub user_id: UserId,
}

/// Identity/session provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user, or [`crate::Error::Session`] when there is none.
    async fn current_user(&self) -> Result<UserId>;
}

/// The remote data store, scoped server-side to the authenticated user.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Bulk-fetch every bookmark the user owns.
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<Bookmark>>;

    /// Create a row and return it with server-assigned `id`/`created_at`.
    async fn insert(&self, draft: NewBookmark) -> Result<Bookmark>;

    /// Delete a row by id.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// The change-notification channel.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Start delivering the user's change events into `sender`.
    async fn subscribe(&self, user_id: &str, sender: EventSender) -> Result<Box<dyn Subscription>>;
}

/// Handle to an established feed subscription.
pub trait Subscription: Send {
    /// Terminate delivery. Must be called before a new subscription for the
    /// same identity is established.
    fn close(&mut self);
}

/// How loud a user-facing notice is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast/alert payload. Fire-and-forget; the core consumes no return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: Option<String>,
    pub severity: Severity,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            severity: Severity::Success,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            severity: Severity::Warning,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            severity: Severity::Error,
        }
    }
}

/// User-facing notification surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
