//! # Marque Engine
//!
//! The reconciliation core for Marque, a private bookmark manager with live
//! cross-session sync.
//!
//! This crate owns the canonical in-memory bookmark collection for one user
//! session and merges three competing update paths into it:
//!
//! - a bulk load fetched once when the session activates,
//! - optimistic local mutations applied before server confirmation,
//! - an asynchronous stream of change notifications describing writes made
//!   by any writer, including the user's other tabs and devices.
//!
//! Every mutation is keyed by bookmark id and idempotent, so the final state
//! does not depend on whether an optimistic insert or its corresponding
//! notification arrives first. That commutativity is what keeps duplicate
//! rows - the most visible bug class in multi-writer realtime sync - out of
//! the collection.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of network, auth, or platform
//! - **Deterministic**: the same event sequence always produces the same state
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Bookmarks
//!
//! A [`Bookmark`] carries a server-assigned opaque `id` (the identity key
//! for all merges), a display `title`, a normalized `url`, and the server
//! creation timestamp used only for ordering.
//!
//! ### Change events
//!
//! Remote writes arrive as tagged [`ChangeEvent`]s: `Insert`, `Update`, or
//! `Delete`. Delivery is assumed at-least-once and possibly duplicated; the
//! idempotent merge in [`BookmarkStore`] is the defense.
//!
//! ### Derived view
//!
//! [`BookmarkStore::view`] filters and sorts without touching canonical
//! membership or order. See [`SortKey`].
//!
//! ## Quick Start
//!
//! ```rust
//! use marque_engine::{Bookmark, BookmarkStore, ChangeEvent, SortKey};
//!
//! let mut store = BookmarkStore::new();
//! store.load_initial(vec![
//!     Bookmark::new("b1", "Rust book", "https://doc.rust-lang.org/book", 1000),
//! ]);
//!
//! // A notification for a row we already hold is a no-op.
//! let row = Bookmark::new("b1", "Rust book", "https://doc.rust-lang.org/book", 1000);
//! store.apply_event(ChangeEvent::Insert(row));
//! assert_eq!(store.len(), 1);
//!
//! let view = store.view("rust", SortKey::Title);
//! assert_eq!(view.len(), 1);
//! ```

pub mod bookmark;
pub mod event;
pub mod store;
pub mod view;

// Re-export main types at crate root
pub use bookmark::Bookmark;
pub use event::ChangeEvent;
pub use store::{ApplyOutcome, BookmarkStore, RemovedBookmark};
pub use view::{filter_and_sort, SortKey};

/// Type aliases for clarity
pub type BookmarkId = String;
pub type UserId = String;
pub type Timestamp = u64;
