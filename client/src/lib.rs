//! # Marque Client
//!
//! The session and mutation layer over [`marque_engine`]: it wires the
//! reconciliation store to the external identity provider, data service,
//! and change-notification feed, and performs optimistic create/delete with
//! rollback.
//!
//! The external systems appear only as traits ([`services`]); an in-memory
//! reference backend ([`memory`]) backs the integration tests and the smoke
//! binary.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use marque_client::memory::{MemoryBackend, StaticIdentity, TracingNotifier};
//! use marque_client::Session;
//! use marque_engine::SortKey;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> marque_client::Result<()> {
//! let backend = Arc::new(MemoryBackend::new());
//! let mut session = Session::new(
//!     backend.clone(),
//!     Arc::new(StaticIdentity::new("u-1")),
//!     backend,
//!     Arc::new(TracingNotifier),
//! );
//!
//! session.activate("u-1").await?;
//! let row = session.coordinator().create("Docs", "example.com").await?;
//! assert_eq!(row.url, "https://example.com");
//!
//! let view = session.view("docs", SortKey::Newest).await;
//! assert_eq!(view.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod memory;
pub mod services;
pub mod session;

// Re-export main types at crate root
pub use coordinator::{normalize_url, MutationCoordinator, MutationState, SharedStore};
pub use error::{Error, Result};
pub use services::{
    ChangeFeed, DataService, EventReceiver, EventSender, FeedMessage, IdentityProvider,
    NewBookmark, Notice, Notifier, Severity, Subscription,
};
pub use session::Session;
