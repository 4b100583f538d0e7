//! Integration tests for the session lifecycle and mutation flow.
//!
//! Everything runs against the in-memory backend; the feed echo for a
//! session's own writes is what exercises the de-duplicating merge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use marque_client::memory::{MemoryBackend, RecordingNotifier, StaticIdentity};
use marque_client::{
    DataService, Error, MutationCoordinator, NewBookmark, Session, Severity,
};
use marque_engine::{Bookmark, BookmarkStore, SortKey};
use tokio::sync::{Mutex, Notify};

fn test_session(
    backend: &Arc<MemoryBackend>,
    user: &str,
) -> (Session, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let session = Session::new(
        backend.clone(),
        Arc::new(StaticIdentity::new(user)),
        backend.clone(),
        notifier.clone(),
    );
    (session, notifier)
}

/// Give the feed listener task a chance to drain its channel.
async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}

#[tokio::test]
async fn end_to_end_create_echo_delete_rollback() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut session, _notifier) = test_session(&backend, "u-1");

    // Initial load of an empty collection.
    session.activate("u-1").await.unwrap();
    assert!(session.view("", SortKey::Newest).await.is_empty());

    // Create normalizes the url and applies the authoritative row.
    let row = session
        .coordinator()
        .create("Docs", "example.com")
        .await
        .unwrap();
    assert_eq!(row.title, "Docs");
    assert_eq!(row.url, "https://example.com");

    // The feed echoes our own insert; the merge must not duplicate it.
    settle().await;
    let view = session.view("", SortKey::Newest).await;
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].id, row.id);

    // Delete with an injected remote failure: optimistically removed, then
    // restored at its original position.
    backend.fail_next_delete();
    let err = session.coordinator().delete(&row.id).await.unwrap_err();
    assert!(matches!(err, Error::Remote(_)));

    settle().await;
    let view = session.view("", SortKey::Newest).await;
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].id, row.id);

    // The retry succeeds and the echo delete is a no-op on the empty store.
    session.coordinator().delete(&row.id).await.unwrap();
    settle().await;
    assert!(session.view("", SortKey::Newest).await.is_empty());
}

#[tokio::test]
async fn writes_propagate_to_the_users_other_sessions() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut tab_a, _) = test_session(&backend, "u-1");
    let (mut tab_b, _) = test_session(&backend, "u-1");

    tab_a.activate("u-1").await.unwrap();
    tab_b.activate("u-1").await.unwrap();

    let row = tab_a
        .coordinator()
        .create("Shared", "example.com")
        .await
        .unwrap();
    settle().await;

    let view_b = tab_b.view("", SortKey::Newest).await;
    assert_eq!(view_b.len(), 1);
    assert_eq!(view_b[0].id, row.id);

    tab_b.coordinator().delete(&row.id).await.unwrap();
    settle().await;

    assert!(tab_a.view("", SortKey::Newest).await.is_empty());
    assert!(tab_b.view("", SortKey::Newest).await.is_empty());
}

#[tokio::test]
async fn reactivation_replaces_the_subscription_and_content() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed("u-1", Bookmark::new("b-1", "Mine", "https://a.example.com", 1000));
    backend.seed("u-2", Bookmark::new("b-2", "Theirs", "https://b.example.com", 2000));

    let (mut session, _) = test_session(&backend, "u-1");

    session.activate("u-1").await.unwrap();
    assert_eq!(backend.subscriber_count(), 1);
    assert_eq!(session.active_user(), Some("u-1"));

    // Re-activating for the same identity must not leak a second channel.
    session.activate("u-1").await.unwrap();
    assert_eq!(backend.subscriber_count(), 1);

    // Identity change swaps the canonical content wholesale.
    session.activate("u-2").await.unwrap();
    assert_eq!(backend.subscriber_count(), 1);
    let view = session.view("", SortKey::Newest).await;
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].id, "b-2");

    session.deactivate();
    assert_eq!(backend.subscriber_count(), 0);
    assert!(!session.is_active());
}

#[tokio::test]
async fn deactivated_session_stops_merging() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut session, _) = test_session(&backend, "u-1");

    session.activate("u-1").await.unwrap();
    session.deactivate();

    // Another writer creates a row after teardown.
    backend
        .insert(NewBookmark {
            title: "Late".into(),
            url: "https://example.com".into(),
            user_id: "u-1".into(),
        })
        .await
        .unwrap();
    settle().await;

    assert!(session.view("", SortKey::Newest).await.is_empty());
}

#[tokio::test]
async fn failed_initial_load_degrades_without_stale_rows() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed("u-1", Bookmark::new("b-1", "Mine", "https://a.example.com", 1000));

    let (mut session, notifier) = test_session(&backend, "u-1");

    backend.fail_next_fetch();
    let err = session.activate("u-1").await.unwrap_err();
    assert!(matches!(err, Error::Remote(_)));

    // Empty, not stale - and the failure was surfaced.
    assert!(session.view("", SortKey::Newest).await.is_empty());
    let notices = notifier.take();
    assert!(notices
        .iter()
        .any(|n| n.severity == Severity::Error && n.title == "Could not load bookmarks"));

    // The subscription is still live: optimistic changes keep flowing.
    assert!(session.is_active());
    session
        .coordinator()
        .create("Fresh", "example.com")
        .await
        .unwrap();
    settle().await;
    assert_eq!(session.view("", SortKey::Newest).await.len(), 1);
}

#[tokio::test]
async fn failed_subscribe_leaves_the_session_inactive() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut session, _) = test_session(&backend, "u-1");

    backend.fail_next_subscribe();
    let err = session.activate("u-1").await.unwrap_err();
    assert!(matches!(err, Error::Subscription(_)));

    assert!(!session.is_active());
    assert_eq!(backend.subscriber_count(), 0);

    // A retry establishes the channel normally.
    session.activate("u-1").await.unwrap();
    assert!(session.is_active());
    assert_eq!(backend.subscriber_count(), 1);
}

#[tokio::test]
async fn feed_drop_warns_but_keeps_canonical_state() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed("u-1", Bookmark::new("b-1", "Mine", "https://a.example.com", 1000));

    let (mut session, notifier) = test_session(&backend, "u-1");
    session.activate("u-1").await.unwrap();
    notifier.take();

    backend.drop_feed("connection lost");
    settle().await;

    let notices = notifier.take();
    assert!(notices
        .iter()
        .any(|n| n.severity == Severity::Warning && n.title == "Realtime disconnected"));

    // Canonical state survives; the session is degraded, not dead.
    assert_eq!(session.view("", SortKey::Newest).await.len(), 1);
    assert!(session.is_active());
}

#[tokio::test]
async fn validation_and_session_errors_are_pre_network() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, _) = test_session(&backend, "u-1");

    let err = session
        .coordinator()
        .create("", "example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = session
        .coordinator()
        .create("Docs", "ftp://example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(backend.row_count(), 0);

    // No signed-in user: the mutation is rejected before any insert.
    let signed_out = Session::new(
        backend.clone(),
        Arc::new(StaticIdentity::signed_out()),
        backend.clone(),
        Arc::new(RecordingNotifier::new()),
    );
    let err = signed_out
        .coordinator()
        .create("Docs", "example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Session(_)));
    assert_eq!(backend.row_count(), 0);
}

#[tokio::test]
async fn failed_create_leaves_the_store_untouched() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut session, notifier) = test_session(&backend, "u-1");
    session.activate("u-1").await.unwrap();
    notifier.take();

    backend.fail_next_insert();
    let err = session
        .coordinator()
        .create("Docs", "example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote(_)));

    assert!(session.view("", SortKey::Newest).await.is_empty());
    let notices = notifier.take();
    assert!(notices
        .iter()
        .any(|n| n.severity == Severity::Error && n.title == "Could not save bookmark"));
}

/// Data service whose deletes block until released, to overlap mutations.
struct StallingService {
    inner: Arc<MemoryBackend>,
    stall_deletes: AtomicBool,
    release: Notify,
}

#[async_trait]
impl DataService for StallingService {
    async fn fetch_all(&self, user_id: &str) -> marque_client::Result<Vec<Bookmark>> {
        self.inner.fetch_all(user_id).await
    }

    async fn insert(&self, draft: NewBookmark) -> marque_client::Result<Bookmark> {
        self.inner.insert(draft).await
    }

    async fn delete(&self, id: &str) -> marque_client::Result<()> {
        if self.stall_deletes.swap(false, Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn second_delete_for_a_pending_id_is_rejected() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed("u-1", Bookmark::new("b-1", "Mine", "https://a.example.com", 1000));

    let service = Arc::new(StallingService {
        inner: backend.clone(),
        stall_deletes: AtomicBool::new(true),
        release: Notify::new(),
    });

    let store = Arc::new(Mutex::new(BookmarkStore::new()));
    store
        .lock()
        .await
        .load_initial(backend.fetch_all("u-1").await.unwrap());

    let coordinator = Arc::new(MutationCoordinator::new(
        store,
        service.clone(),
        Arc::new(StaticIdentity::new("u-1")),
        Arc::new(RecordingNotifier::new()),
    ));

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.delete("b-1").await })
    };
    settle().await;
    assert_eq!(coordinator.pending_delete_count(), 1);

    // Second delete for the same id: rejected locally, never issued.
    let err = coordinator.delete("b-1").await.unwrap_err();
    assert!(matches!(err, Error::AlreadyPending(_)));

    service.release.notify_one();
    first.await.unwrap().unwrap();

    assert_eq!(coordinator.pending_delete_count(), 0);
    assert_eq!(backend.row_count(), 0);
}
