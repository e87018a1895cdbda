//! Servants and servant factories.
//!
//! A [`Servant`] is the in-process object that implements the operations of
//! one identity. Servants are shared as `Arc<dyn Servant>`: the evictor owns
//! the canonical reference and each in-flight dispatch borrows a clone for the
//! duration of one request.
//!
//! The persistent store hands back *state*, not servants. A [`ServantFactory`]
//! turns `(identity, state)` into a live servant; this is the point where a
//! servant learns which identity it incarnates.

use std::fmt;
use std::sync::Arc;

use crate::identity::Identity;

/// Request context passed to a servant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Current {
    /// Name of the serving scope (object adapter) that dispatched the request.
    pub adapter: Arc<str>,
    pub identity: Identity,
    pub operation: String,
}

/// Application-level failure raised by a servant.
///
/// From the dispatch protocol's point of view this is a normal completion: the
/// servant is released exactly as after a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserException {
    pub kind: String,
    pub message: String,
}

impl UserException {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for UserException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for UserException {}

/// In-process handler for the operations of one identity.
pub trait Servant: Send + Sync {
    /// Handles one operation. `payload` carries the already-decoded arguments.
    fn dispatch(&self, current: &Current, payload: &[u8]) -> Result<Vec<u8>, UserException>;
}

/// Shared handle to a servant.
pub type ServantHandle = Arc<dyn Servant>;

/// Builds a live servant from the state loaded out of a persistent store.
pub trait ServantFactory<S>: Send + Sync {
    fn create(&self, identity: &Identity, state: S) -> ServantHandle;
}

impl<S, F> ServantFactory<S> for F
where
    F: Fn(&Identity, S) -> ServantHandle + Send + Sync,
{
    fn create(&self, identity: &Identity, state: S) -> ServantHandle {
        self(identity, state)
    }
}
