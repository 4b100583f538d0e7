//! In-memory reference implementations of the collaborator seams.
//!
//! `MemoryBackend` plays both the remote data store and the change feed:
//! every accepted write is broadcast to all subscribers of the owning user,
//! including the session that issued it - exactly the echo that makes the
//! optimistic-insert/notification merge worth testing. Failure injection
//! hooks drive the rollback paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use marque_engine::{Bookmark, BookmarkId, ChangeEvent, UserId};

use crate::error::{Error, Result};
use crate::services::{
    ChangeFeed, DataService, EventSender, FeedMessage, IdentityProvider, NewBookmark, Notice,
    Notifier, Severity, Subscription,
};

struct OwnedRow {
    owner: UserId,
    bookmark: Bookmark,
}

struct Subscriber {
    user_id: UserId,
    sender: EventSender,
}

/// An in-memory data service plus change feed.
#[derive(Default)]
pub struct MemoryBackend {
    rows: DashMap<BookmarkId, OwnedRow>,
    subscribers: Arc<DashMap<String, Subscriber>>,
    fail_next_fetch: AtomicBool,
    fail_next_insert: AtomicBool,
    fail_next_delete: AtomicBool,
    fail_next_subscribe: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a row without broadcasting, as if it existed before the
    /// session started.
    pub fn seed(&self, owner: impl Into<UserId>, bookmark: Bookmark) {
        self.rows.insert(
            bookmark.id.clone(),
            OwnedRow {
                owner: owner.into(),
                bookmark,
            },
        );
    }

    /// Make the next `fetch_all` fail with a remote error.
    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    /// Make the next `insert` fail with a remote error.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Make the next `delete` fail with a remote error.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    /// Make the next `subscribe` fail with a subscription error.
    pub fn fail_next_subscribe(&self) {
        self.fail_next_subscribe.store(true, Ordering::SeqCst);
    }

    /// Report a terminal feed error to every subscriber, simulating a
    /// disconnect of the notification channel.
    pub fn drop_feed(&self, reason: &str) {
        for entry in self.subscribers.iter() {
            let _ = entry
                .value()
                .sender
                .send(FeedMessage::Dropped(reason.to_string()));
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of stored rows across all users.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn broadcast(&self, owner: &str, event: ChangeEvent) {
        let mut delivered = 0;
        for entry in self.subscribers.iter() {
            if entry.value().user_id == owner
                && entry
                    .value()
                    .sender
                    .send(FeedMessage::Change(event.clone()))
                    .is_ok()
            {
                delivered += 1;
            }
        }
        tracing::debug!(owner, delivered, "broadcast change event");
    }

    fn now_millis() -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

#[async_trait]
impl DataService for MemoryBackend {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(Error::Remote("injected fetch failure".to_string()));
        }

        let mut rows: Vec<Bookmark> = self
            .rows
            .iter()
            .filter(|entry| entry.value().owner == user_id)
            .map(|entry| entry.value().bookmark.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, draft: NewBookmark) -> Result<Bookmark> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(Error::Remote("injected insert failure".to_string()));
        }

        let row = Bookmark::new(
            uuid::Uuid::new_v4().to_string(),
            draft.title,
            draft.url,
            Self::now_millis(),
        );
        self.rows.insert(
            row.id.clone(),
            OwnedRow {
                owner: draft.user_id.clone(),
                bookmark: row.clone(),
            },
        );

        self.broadcast(&draft.user_id, ChangeEvent::Insert(row.clone()));
        Ok(row)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(Error::Remote("injected delete failure".to_string()));
        }

        if let Some((_, owned)) = self.rows.remove(id) {
            self.broadcast(
                &owned.owner,
                ChangeEvent::Delete { id: id.to_string() },
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for MemoryBackend {
    async fn subscribe(&self, user_id: &str, sender: EventSender) -> Result<Box<dyn Subscription>> {
        if self.fail_next_subscribe.swap(false, Ordering::SeqCst) {
            return Err(Error::Subscription(
                "injected subscribe failure".to_string(),
            ));
        }

        let sub_id = uuid::Uuid::new_v4().to_string();
        self.subscribers.insert(
            sub_id.clone(),
            Subscriber {
                user_id: user_id.to_string(),
                sender,
            },
        );
        tracing::info!(sub_id = %sub_id, user_id, "feed subscription registered");

        Ok(Box::new(MemorySubscription {
            id: sub_id,
            registry: Arc::clone(&self.subscribers),
        }))
    }
}

struct MemorySubscription {
    id: String,
    registry: Arc<DashMap<String, Subscriber>>,
}

impl Subscription for MemorySubscription {
    fn close(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            tracing::info!(sub_id = %self.id, "feed subscription closed");
        }
    }
}

/// Identity provider with a fixed answer.
pub struct StaticIdentity {
    user: Option<UserId>,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user: Some(user_id.into()),
        }
    }

    /// An identity provider with no signed-in user.
    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<UserId> {
        self.user
            .clone()
            .ok_or_else(|| Error::Session("please sign in again".to_string()))
    }
}

/// Notifier that forwards notices to the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let description = notice.description.as_deref().unwrap_or("");
        match notice.severity {
            Severity::Error => tracing::error!(title = %notice.title, description, "notice"),
            Severity::Warning => tracing::warn!(title = %notice.title, description, "notice"),
            Severity::Info | Severity::Success => {
                tracing::info!(title = %notice.title, description, "notice")
            }
        }
    }
}

/// Notifier that records notices for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}
