//! # Servant Evictor
//!
//! A bounded, thread-safe map from [`Identity`] to live servant, backed by a
//! [`PersistentStore`] and consulted by the dispatcher through the two-phase
//! `locate` / `finished` protocol.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         Evictor<P, F>                                │
//!   │                                                                      │
//!   │   ┌──────────────────────────────────────┐    ┌──────────────────┐   │
//!   │   │   Mutex<EvictorCore>                 │    │  store: P        │   │
//!   │   │   index + recency list + pins        │    │  (queried with   │   │
//!   │   │   detached entries + load tickets    │    │   lock released) │   │
//!   │   └──────────────────────────────────────┘    └──────────────────┘   │
//!   │                                               ┌──────────────────┐   │
//!   │                                               │  factory: F      │   │
//!   │                                               │  state → servant │   │
//!   │                                               └──────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locate Flow
//!
//! ```text
//!   locate(X)
//!     lock
//!       X resident/detached ──► move to MRU, pin, unlock, return       (hit)
//!       X being fetched     ──► join, unlock, wait for loader's outcome
//!       otherwise           ──► register fetch, unlock
//!     store.get(X)                                   (no lock held)
//!     factory.create(X, state)                       (no lock held)
//!     lock
//!       X invalidated meanwhile ──► unlock, fetch again
//!       X already live          ──► reuse it (racing insert), pin
//!       otherwise               ──► evict LRU unpinned entry if full, insert at MRU, pin
//!     unlock, wake joiners
//! ```
//!
//! ## Eviction and Pinning
//!
//! Every `locate` that returns a servant pins it; the matching `finished`
//! unpins it. Eviction picks the least recently used *unpinned* entry. When
//! every resident entry is pinned (always the case with capacity 0) the new
//! servant is admitted *detached*: shared by concurrent dispatches of the same
//! identity but not resident, and dropped when its last pin is released.
//! The resident count therefore never exceeds `capacity`, and a servant is
//! never evicted while a dispatch still uses it.
//!
//! ## Errors
//!
//! | Condition                        | `locate` returns                     |
//! |----------------------------------|--------------------------------------|
//! | store has no record              | `Ok(None)`                           |
//! | store failed                     | `Err(LocateError::StoreUnavailable)` |
//! | concurrent fetch / insert race   | absorbed, never surfaced             |
//!
//! The evictor never retries a failed store call.
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use servant_evictor::prelude::*;
//!
//! struct Greeter(String);
//!
//! impl Servant for Greeter {
//!     fn dispatch(&self, _: &Current, _: &[u8]) -> Result<Vec<u8>, UserException> {
//!         Ok(format!("hello from {}", self.0).into_bytes())
//!     }
//! }
//!
//! let store = MemoryStore::from_records([("alice", "Alice".to_string())]);
//! let evictor = Evictor::new(16, store, |_: &Identity, name: String| -> ServantHandle {
//!     Arc::new(Greeter(name))
//! });
//!
//! let alice = Identity::new("alice");
//! let located = evictor.locate(&alice).unwrap().expect("alice exists");
//! evictor.finished(&alice, located.cookie);
//!
//! assert!(evictor.locate(&Identity::new("nobody")).unwrap().is_none());
//! assert_eq!(evictor.len(), 1);
//! ```

pub mod core;
pub(crate) mod load;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

pub use self::core::{Cookie, EvictorCore, Located, Release};
use self::core::{Completion, Lookup};
use self::load::LoadGuard;
use crate::error::{InvariantError, LocateError};
use crate::identity::Identity;
#[cfg(feature = "metrics")]
use crate::metrics::{EvictorMetricsSnapshot, MetricsSnapshotProvider};
use crate::servant::ServantFactory;
use crate::store::PersistentStore;

/// Default name of the serving scope an evictor belongs to.
pub const DEFAULT_ADAPTER: &str = "default";

/// Thread-safe servant evictor.
pub struct Evictor<P, F> {
    core: Mutex<EvictorCore>,
    store: P,
    factory: F,
    adapter: Arc<str>,
}

impl<P, F> Evictor<P, F>
where
    P: PersistentStore,
    F: ServantFactory<P::State>,
{
    /// Creates an evictor holding at most `capacity` resident servants.
    pub fn new(capacity: usize, store: P, factory: F) -> Self {
        Self::with_adapter(DEFAULT_ADAPTER, capacity, store, factory)
    }

    /// Creates an evictor for the named serving scope.
    pub fn with_adapter(adapter: impl AsRef<str>, capacity: usize, store: P, factory: F) -> Self {
        Self {
            core: Mutex::new(EvictorCore::new(capacity)),
            store,
            factory,
            adapter: Arc::from(adapter.as_ref()),
        }
    }

    /// Returns a pinned servant for `identity`, loading it on a miss.
    ///
    /// `Ok(None)` means the store has no such object; nothing is cached and no
    /// `finished` call is expected. Every `Ok(Some(_))` must be paired with
    /// exactly one [`finished`](Self::finished).
    pub fn locate(&self, identity: &Identity) -> Result<Option<Located>, LocateError> {
        let lookup = self.core.lock().begin_locate(identity);
        let pending = match lookup {
            Lookup::Hit(located) => return Ok(Some(located)),
            Lookup::Join(pending) => return pending.wait().into_result(identity),
            Lookup::Load(pending) => pending,
        };

        let guard = LoadGuard::new(&self.core, identity.clone(), pending);
        loop {
            let fetched = self
                .store
                .get(identity)
                .map(|state| state.map(|state| self.factory.create(identity, state)));
            if let Err(err) = &fetched {
                warn!(adapter = %self.adapter, identity = %identity, error = %err, "store lookup failed");
            }

            let completion = self.core.lock().complete_load(identity, fetched);
            match completion {
                Completion::Retry => continue,
                Completion::Done(outcome) => {
                    guard.complete(outcome.clone());
                    return outcome.into_result(identity);
                },
            }
        }
    }

    /// Ends one dispatch against `identity`, releasing the pin taken by the
    /// `locate` that returned `cookie`. Unknown identities or cookies are
    /// ignored.
    pub fn finished(&self, identity: &Identity, cookie: Cookie) -> Release {
        let release = self.core.lock().release(identity, cookie);
        if release == Release::Unknown {
            debug!(adapter = %self.adapter, identity = %identity, "finished for a servant no longer live");
        }
        release
    }

    /// Removes `identity` because the application destroyed the object.
    ///
    /// Safe to call for identities that are not resident. A later `locate`
    /// queries the store again. Returns `true` if a live servant was dropped.
    pub fn invalidate(&self, identity: &Identity) -> bool {
        self.core.lock().invalidate(identity)
    }

    /// Drops every cached servant.
    pub fn clear(&self) {
        self.core.lock().clear();
    }
}

impl<P, F> Evictor<P, F> {
    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    pub fn capacity(&self) -> usize {
        self.core.lock().capacity()
    }

    /// Number of resident servants.
    pub fn len(&self) -> usize {
        self.core.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.lock().is_empty()
    }

    /// Number of pinned servants admitted while every resident entry was pinned.
    pub fn detached_len(&self) -> usize {
        self.core.lock().detached_len()
    }

    /// Returns `true` if `identity` is resident.
    pub fn contains(&self, identity: &str) -> bool {
        self.core.lock().contains(identity)
    }

    /// Number of in-flight dispatches holding the live servant for `identity`.
    pub fn pin_count(&self, identity: &str) -> Option<usize> {
        self.core.lock().pin_count(identity)
    }

    /// Resident identities from most to least recently used.
    pub fn resident_identities(&self) -> Vec<Identity> {
        self.core.lock().resident_identities()
    }

    /// The backing store.
    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.core.lock().check_invariants()
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> EvictorMetricsSnapshot {
        self.core.lock().metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<P, F> MetricsSnapshotProvider<EvictorMetricsSnapshot> for Evictor<P, F> {
    fn snapshot(&self) -> EvictorMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<P, F> fmt::Debug for Evictor<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evictor")
            .field("adapter", &self.adapter)
            .field("core", &*self.core.lock())
            .finish()
    }
}
