//! Unified error handling for the client layer.
//!
//! Every failure here is recoverable: errors are translated into a
//! caller-visible result (and usually a [`crate::services::Notice`]) at the
//! coordinator/session boundary and never propagate as a fault. A failed
//! delete is rolled back; a failed create leaves the store untouched.

use marque_engine::BookmarkId;

/// All possible errors from the Marque client.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Local, pre-network input rejection. Never retried automatically.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No valid session at mutation time; the caller prompts re-auth.
    #[error("no active session: {0}")]
    Session(String),

    /// The remote data service rejected or failed a request.
    #[error("remote request failed: {0}")]
    Remote(String),

    /// A delete for this id is already in flight; no second request is issued.
    #[error("delete already pending for bookmark {0}")]
    AlreadyPending(BookmarkId),

    /// Establishing the change feed subscription failed; the session stays
    /// inactive. (A feed that drops after a successful subscribe is reported
    /// in-band instead and degrades the session without killing it.)
    #[error("change feed error: {0}")]
    Subscription(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
