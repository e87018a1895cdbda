//! In-memory persistent store.
//!
//! ## Architecture
//! - Records live in an `FxHashMap<Identity, S>` behind a `parking_lot::RwLock`.
//! - `get` clones the stored state; the evictor owns whatever the factory
//!   builds from it, so later `put`s never mutate a live servant.
//! - Counters are atomics so `get` only needs the read lock.
//!
//! ## When to Use
//! - Tests, demos and single-process deployments where durability is provided
//!   elsewhere (or not needed).
//!
//! ## Example Usage
//! ```rust
//! use servant_evictor::store::{MemoryStore, PersistentStore};
//! use servant_evictor::Identity;
//!
//! let store = MemoryStore::new();
//! store.put("alice", 1u32);
//! assert_eq!(store.get(&Identity::new("alice")).unwrap(), Some(1));
//! assert_eq!(store.get(&Identity::new("bob")).unwrap(), None);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::StoreError;
use crate::identity::Identity;
use crate::store::traits::{PersistentStore, StoreMetrics};

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    removes: AtomicU64,
}

/// Thread-safe map-backed store.
#[derive(Debug)]
pub struct MemoryStore<S> {
    records: RwLock<FxHashMap<Identity, S>>,
    counters: Counters,
}

impl<S> MemoryStore<S> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(FxHashMap::default()),
            counters: Counters::default(),
        }
    }

    /// Creates a store pre-populated from `records`.
    pub fn from_records<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<Identity>,
    {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for (identity, state) in records {
                map.insert(identity.into(), state);
            }
        }
        store
    }

    /// Records `state` for `identity`, returning the previous state.
    pub fn put(&self, identity: impl Into<Identity>, state: S) -> Option<S> {
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        self.records.write().insert(identity.into(), state)
    }

    /// Deletes the record for `identity`.
    pub fn remove(&self, identity: &str) -> Option<S> {
        let removed = self.records.write().remove(identity);
        if removed.is_some() {
            self.counters.removes.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.records.read().contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// All identities currently recorded, in no particular order.
    pub fn identities(&self) -> Vec<Identity> {
        self.records.read().keys().cloned().collect()
    }
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> PersistentStore for MemoryStore<S>
where
    S: Clone + Send + Sync,
{
    type State = S;

    fn get(&self, identity: &Identity) -> Result<Option<S>, StoreError> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        let state = self.records.read().get(identity.as_str()).cloned();
        match state {
            Some(_) => self.counters.hits.fetch_add(1, Ordering::Relaxed),
            None => self.counters.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(state)
    }

    fn metrics(&self) -> StoreMetrics {
        StoreMetrics {
            gets: self.counters.gets.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            removes: self.counters.removes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_clone_of_record() {
        let store = MemoryStore::from_records([("alice", String::from("S1"))]);
        let state = store.get(&Identity::new("alice")).unwrap();
        assert_eq!(state.as_deref(), Some("S1"));
        assert!(store.contains("alice"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_identity_is_none_not_error() {
        let store: MemoryStore<u8> = MemoryStore::new();
        assert_eq!(store.get(&Identity::new("ghost")), Ok(None));
        assert!(store.is_empty());
    }

    #[test]
    fn put_and_remove_update_counters() {
        let store = MemoryStore::new();
        assert_eq!(store.put("a", 1), None);
        assert_eq!(store.put("a", 2), Some(1));
        assert_eq!(store.remove("a"), Some(2));
        assert_eq!(store.remove("a"), None);
        let _ = store.get(&Identity::new("a"));

        let metrics = store.metrics();
        assert_eq!(metrics.puts, 2);
        assert_eq!(metrics.removes, 1);
        assert_eq!(metrics.gets, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 0);
    }

    #[test]
    fn identities_lists_every_record() {
        let store = MemoryStore::from_records([("x", 1), ("y", 2)]);
        let mut ids: Vec<_> = store.identities().into_iter().map(|i| i.to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["x", "y"]);
    }
}
