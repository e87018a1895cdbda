//! Error types for the servant evictor.
//!
//! ## Key Components
//!
//! - [`StoreError`]: A persistent store could not answer a lookup.
//! - [`LocateError`]: The only failure `locate` surfaces. "Not found" is not an
//!   error at this level; it is `Ok(None)`.
//! - [`DispatchError`]: What the dispatcher reports to a request's originator.
//! - [`InvariantError`]: Returned by `check_invariants` when internal
//!   bookkeeping is inconsistent.
//! - [`ConfigError`]: Returned when configuration values are rejected.
//!
//! Races between concurrent `locate` calls for the same identity are resolved
//! inside the evictor and have no error variant.
//!
//! ## Example Usage
//!
//! ```
//! use servant_evictor::error::{LocateError, StoreError};
//! use servant_evictor::Identity;
//!
//! let err = LocateError::StoreUnavailable {
//!     identity: Identity::new("alice"),
//!     source: StoreError::Unavailable("connection refused".into()),
//! };
//! assert!(err.to_string().contains("alice"));
//! ```

use thiserror::Error;

use crate::identity::Identity;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure reported by a [`PersistentStore`](crate::store::PersistentStore).
///
/// `Clone` so that a single failed fetch can be reported to every dispatch
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or timed out. Usually retryable.
    #[error("persistent store unavailable: {0}")]
    Unavailable(String),
    /// The store answered with an error (corrupt record, decode failure, ...).
    #[error("persistent store backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// LocateError
// ---------------------------------------------------------------------------

/// Failure of [`Evictor::locate`](crate::evictor::Evictor::locate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// The store failed while materializing `identity`. No retry was attempted.
    #[error("cannot locate '{identity}': {source}")]
    StoreUnavailable {
        identity: Identity,
        #[source]
        source: StoreError,
    },
}

impl LocateError {
    /// Identity whose lookup failed.
    pub fn identity(&self) -> &Identity {
        match self {
            LocateError::StoreUnavailable { identity, .. } => identity,
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Failure of a dispatched request, as seen by its originator.
///
/// A [`UserException`](crate::servant::UserException) raised by a servant is
/// an ordinary completion and is not represented here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No servant exists for the identity.
    #[error("object does not exist: '{identity}'")]
    ObjectNotExist { identity: Identity },
    /// The servant could not be loaded because the store failed.
    #[error("object '{identity}' temporarily unavailable: {source}")]
    StoreUnavailable {
        identity: Identity,
        #[source]
        source: StoreError,
    },
    /// The servant panicked while handling the operation.
    #[error("unknown exception in '{identity}' operation '{operation}': {message}")]
    UnknownException {
        identity: Identity,
        operation: String,
        message: String,
    },
}

impl DispatchError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::StoreUnavailable {
                source: StoreError::Unavailable(_),
                ..
            }
        )
    }
}

impl From<LocateError> for DispatchError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::StoreUnavailable { identity, source } => {
                DispatchError::StoreUnavailable { identity, source }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal evictor invariants are violated.
///
/// Produced by [`Evictor::check_invariants`](crate::evictor::Evictor::check_invariants).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration values are invalid.
///
/// Capacity is never rejected: `0` is a legal (non-caching) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
