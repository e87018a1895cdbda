//! Store traits consumed by the evictor.

use std::sync::Arc;

use crate::error::StoreError;
use crate::identity::Identity;

/// Snapshot of store-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub gets: u64,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub removes: u64,
}

/// Durable identity → state mapping.
///
/// `get` answers `Ok(None)` for an identity the store has no record of.
/// Transport or backend failures must come back as `Err`, never as `Ok(None)`:
/// the evictor reports them to the dispatcher as a distinct, retryable
/// condition rather than as "no such object".
///
/// Implementations may block; the evictor calls `get` outside its lock.
pub trait PersistentStore: Send + Sync {
    /// State the store keeps for one object.
    type State;

    /// Looks up the state recorded for `identity`.
    fn get(&self, identity: &Identity) -> Result<Option<Self::State>, StoreError>;

    /// Snapshot of the store's counters, if it keeps any.
    fn metrics(&self) -> StoreMetrics {
        StoreMetrics::default()
    }
}

impl<T: PersistentStore + ?Sized> PersistentStore for Arc<T> {
    type State = T::State;

    fn get(&self, identity: &Identity) -> Result<Option<Self::State>, StoreError> {
        (**self).get(identity)
    }

    fn metrics(&self) -> StoreMetrics {
        (**self).metrics()
    }
}

impl<T: PersistentStore + ?Sized> PersistentStore for &T {
    type State = T::State;

    fn get(&self, identity: &Identity) -> Result<Option<Self::State>, StoreError> {
        (**self).get(identity)
    }

    fn metrics(&self) -> StoreMetrics {
        (**self).metrics()
    }
}
