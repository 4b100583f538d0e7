//! Session lifecycle: one canonical store bound to the active user identity.
//!
//! A session is an explicitly owned resource: [`Session::activate`]
//! initializes it for a user identity, [`Session::deactivate`] tears it
//! down, and re-activating for another identity replaces both the
//! subscription and the canonical content wholesale. At most one feed
//! subscription is live per identity at a time - a leaked duplicate would
//! deliver every event twice, and while the store's idempotent merge would
//! mask that, masking is not the defense.

use std::sync::Arc;

use marque_engine::{Bookmark, BookmarkStore, SortKey, UserId};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::coordinator::{MutationCoordinator, SharedStore};
use crate::error::Result;
use crate::services::{
    ChangeFeed, DataService, EventReceiver, FeedMessage, IdentityProvider, Notice, Notifier,
    Subscription,
};

struct ActiveFeed {
    user_id: UserId,
    subscription: Box<dyn Subscription>,
    listener: JoinHandle<()>,
}

/// A user's live bookmark session.
///
/// Owns the shared store exclusively: other components read the derived
/// view or submit mutations through the coordinator; nothing else holds a
/// mutable path into the canonical collection.
pub struct Session {
    store: SharedStore,
    coordinator: MutationCoordinator,
    data: Arc<dyn DataService>,
    feed: Arc<dyn ChangeFeed>,
    notifier: Arc<dyn Notifier>,
    active: Option<ActiveFeed>,
}

impl Session {
    pub fn new(
        data: Arc<dyn DataService>,
        identity: Arc<dyn IdentityProvider>,
        feed: Arc<dyn ChangeFeed>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store: SharedStore = Arc::new(Mutex::new(BookmarkStore::new()));
        let coordinator = MutationCoordinator::new(
            store.clone(),
            data.clone(),
            identity,
            notifier.clone(),
        );

        Self {
            store,
            coordinator,
            data,
            feed,
            notifier,
            active: None,
        }
    }

    /// Activate the session for `user_id`: tear down any prior subscription,
    /// bulk-load the canonical collection, then subscribe and start merging
    /// feed events.
    ///
    /// A failed bulk fetch is recoverable: the store is left empty rather
    /// than showing stale rows as current, the failure is surfaced through
    /// the notifier and the returned error, and the subscription is still
    /// established so the session degrades to "optimistic local changes
    /// until data arrives".
    pub async fn activate(&mut self, user_id: &str) -> Result<()> {
        self.deactivate();
        tracing::info!(user_id, "activating session");

        let fetch_error = match self.data.fetch_all(user_id).await {
            Ok(rows) => {
                tracing::debug!(count = rows.len(), "initial load complete");
                self.store.lock().await.load_initial(rows);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "initial load failed");
                self.store.lock().await.load_initial(Vec::new());
                self.notifier
                    .notify(Notice::error("Could not load bookmarks", e.to_string()));
                Some(e)
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.feed.subscribe(user_id, tx).await?;
        let listener = spawn_listener(rx, self.store.clone(), self.notifier.clone());

        self.active = Some(ActiveFeed {
            user_id: user_id.to_string(),
            subscription,
            listener,
        });

        match fetch_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Tear down the feed subscription and the listener task. Idempotent;
    /// also runs on drop.
    pub fn deactivate(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.subscription.close();
            active.listener.abort();
            tracing::info!(user_id = %active.user_id, "session deactivated");
        }
    }

    /// Whether a subscription is currently established.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The identity this session is activated for, if any.
    pub fn active_user(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.user_id.as_str())
    }

    /// Submit mutations through this.
    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// The shared canonical store, for readers that want raw access.
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Clone the filtered/sorted view out of the lock.
    pub async fn view(&self, query: &str, sort: SortKey) -> Vec<Bookmark> {
        self.store
            .lock()
            .await
            .view(query, sort)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Merge feed messages into the store until the channel closes.
///
/// Store mutations happen in short non-awaiting critical sections, so each
/// delivered event is applied as one discrete reaction, in arrival order.
fn spawn_listener(
    mut rx: EventReceiver,
    store: SharedStore,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                FeedMessage::Change(event) => {
                    let id = event.bookmark_id().clone();
                    let outcome = store.lock().await.apply_event(event);
                    tracing::debug!(%id, ?outcome, "merged change event");
                }
                FeedMessage::Dropped(reason) => {
                    // Non-fatal: canonical state stays; data shown is "as of
                    // initial load plus optimistic changes" until the feed
                    // resumes.
                    tracing::warn!(%reason, "change feed dropped");
                    notifier.notify(Notice::warning(
                        "Realtime disconnected",
                        "Bookmark sync is temporarily unavailable.",
                    ));
                }
            }
        }
        tracing::debug!("feed listener stopped");
    })
}
