//! Single-threaded evictor core.
//!
//! `EvictorCore` owns every piece of bookkeeping the evictor mutates: the
//! resident index, the recency order, per-entry pin counts, detached entries
//! and the tickets of fetches that are currently in flight. It performs no I/O
//! and is always used behind the [`Evictor`](super::Evictor)'s mutex.
//!
//! ## Layout
//!
//! ```text
//!   index: FxHashMap<Identity, Entry>          lru: RecencyList<Identity>
//!   ┌──────────┬──────────────────────────┐
//!   │ "alice"  │ servant, pins, pos ──────┼──►  head ─► [alice] ◄──► [bob] ◄── tail
//!   │ "bob"    │ servant, pins, pos ──────┼──────────────────────────┘
//!   └──────────┴──────────────────────────┘
//!
//!   detached: FxHashMap<Identity, Entry>       (pinned, not resident, no pos)
//!   loading:  FxHashMap<Identity, LoadTicket>  (fetch in flight, waiter count)
//! ```
//!
//! ## Invariants
//! - `index.keys() == set(lru)`, and each entry's `position` names the node
//!   holding its own identity.
//! - `index.len() <= capacity` after every public operation.
//! - A pinned entry is never chosen as an eviction victim.
//! - Detached entries always have at least one pin, and an identity is never
//!   both resident and detached.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::ds::recency_list::{NodeId, RecencyList};
use crate::error::{InvariantError, StoreError};
use crate::evictor::load::{LoadOutcome, PendingLoad};
use crate::identity::Identity;
#[cfg(feature = "metrics")]
use crate::metrics::{EvictorMetrics, EvictorMetricsRecorder, EvictorMetricsSnapshot};
use crate::servant::ServantHandle;

/// Identifies one materialization of a servant.
///
/// Returned by `locate` and handed back to `finished`, so that releasing a
/// servant that has since been invalidated never unpins a newer servant that
/// was loaded for the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cookie(u64);

impl Cookie {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A servant handed out by `locate`, pinned until the matching `finished`.
#[derive(Clone)]
pub struct Located {
    pub servant: ServantHandle,
    pub cookie: Cookie,
}

impl fmt::Debug for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Located")
            .field("servant", &Arc::as_ptr(&self.servant))
            .field("cookie", &self.cookie)
            .finish()
    }
}

struct Entry {
    identity: Identity,
    servant: ServantHandle,
    cookie: Cookie,
    pins: usize,
    // `None` while detached.
    position: Option<NodeId>,
}

impl Entry {
    fn located(&self) -> Located {
        Located {
            servant: Arc::clone(&self.servant),
            cookie: self.cookie,
        }
    }
}

struct LoadTicket {
    pending: Arc<PendingLoad>,
    waiters: usize,
    stale: bool,
}

/// What `begin_locate` decided.
pub(crate) enum Lookup {
    /// Resident or detached; already pinned for the caller.
    Hit(Located),
    /// Another dispatch is fetching this identity; wait for its outcome.
    Join(Arc<PendingLoad>),
    /// The caller must fetch from the store and call `complete_load`.
    Load(Arc<PendingLoad>),
}

/// What `complete_load` decided.
pub(crate) enum Completion {
    /// The identity was invalidated during the fetch; fetch again.
    Retry,
    /// Publish `outcome` to the dispatches that joined the fetch.
    Done(LoadOutcome),
}

/// Result of releasing one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The pin was released; other dispatches still hold the entry.
    Pinned,
    /// The last pin was released; the entry is resident.
    Unpinned,
    /// The last pin of a detached entry was released and it was dropped.
    Dropped,
    /// The last pin of a detached entry was released and it became resident.
    Promoted,
    /// No live entry matched the identity and cookie.
    Unknown,
}

pub struct EvictorCore {
    index: FxHashMap<Identity, Entry>,
    lru: RecencyList<Identity>,
    detached: FxHashMap<Identity, Entry>,
    loading: FxHashMap<Identity, LoadTicket>,
    capacity: usize,
    next_cookie: u64,
    #[cfg(feature = "metrics")]
    metrics: EvictorMetrics,
}

impl EvictorCore {
    /// Creates an empty core. A capacity of 0 keeps nothing resident.
    pub fn new(capacity: usize) -> Self {
        Self {
            index: FxHashMap::default(),
            lru: RecencyList::with_capacity(capacity),
            detached: FxHashMap::default(),
            loading: FxHashMap::default(),
            capacity,
            next_cookie: 0,
            #[cfg(feature = "metrics")]
            metrics: EvictorMetrics::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of pinned servants that are alive but not resident.
    pub fn detached_len(&self) -> usize {
        self.detached.len()
    }

    /// Number of identities with a fetch in flight.
    pub fn pending_loads(&self) -> usize {
        self.loading.len()
    }

    /// Returns `true` if `identity` is resident.
    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    /// Pin count of the live servant for `identity`, resident or detached.
    pub fn pin_count(&self, identity: &str) -> Option<usize> {
        self.index
            .get(identity)
            .or_else(|| self.detached.get(identity))
            .map(|entry| entry.pins)
    }

    /// Resident identities from most to least recently used.
    pub fn resident_identities(&self) -> Vec<Identity> {
        self.lru.iter().cloned().collect()
    }

    /// Looks `identity` up and pins it, or registers/joins a fetch for it.
    pub(crate) fn begin_locate(&mut self, identity: &Identity) -> Lookup {
        if let Some(located) = self.pin_live(identity) {
            #[cfg(feature = "metrics")]
            self.metrics.record_hit();
            trace!(identity = %identity, cookie = located.cookie.0, "evictor hit");
            return Lookup::Hit(located);
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_miss();

        if let Some(ticket) = self.loading.get_mut(identity) {
            ticket.waiters += 1;
            #[cfg(feature = "metrics")]
            self.metrics.record_coalesced_wait();
            debug!(identity = %identity, waiters = ticket.waiters, "joining in-flight fetch");
            return Lookup::Join(Arc::clone(&ticket.pending));
        }

        let pending = Arc::new(PendingLoad::new());
        self.loading.insert(
            identity.clone(),
            LoadTicket {
                pending: Arc::clone(&pending),
                waiters: 0,
                stale: false,
            },
        );
        #[cfg(feature = "metrics")]
        self.metrics.record_store_fetch();
        debug!(identity = %identity, "evictor miss, fetching from store");
        Lookup::Load(pending)
    }

    /// Reconciles a finished fetch with whatever happened while it ran.
    ///
    /// `fetched` is the store's answer, already turned into a servant. On
    /// success the servant is pinned once for the loader and once per waiter.
    pub(crate) fn complete_load(
        &mut self,
        identity: &Identity,
        fetched: Result<Option<ServantHandle>, StoreError>,
    ) -> Completion {
        let Some(mut ticket) = self.loading.remove(identity) else {
            // The loader's ticket is gone only if it was aborted meanwhile;
            // settle for the loader alone and let `settle` reuse any racing insert.
            return Completion::Done(self.settle(identity, fetched, 1));
        };

        if ticket.stale {
            ticket.stale = false;
            self.loading.insert(identity.clone(), ticket);
            #[cfg(feature = "metrics")]
            {
                self.metrics.record_stale_reload();
                self.metrics.record_store_fetch();
            }
            debug!(identity = %identity, "identity invalidated during fetch, refetching");
            return Completion::Retry;
        }

        Completion::Done(self.settle(identity, fetched, 1 + ticket.waiters))
    }

    /// Drops the fetch ticket for `identity` if it still belongs to `pending`.
    pub(crate) fn abort_load(&mut self, identity: &Identity, pending: &Arc<PendingLoad>) {
        let owned = self
            .loading
            .get(identity)
            .is_some_and(|ticket| Arc::ptr_eq(&ticket.pending, pending));
        if owned {
            self.loading.remove(identity);
        }
    }

    /// Releases one pin taken by `locate`.
    pub fn release(&mut self, identity: &Identity, cookie: Cookie) -> Release {
        if let Some(entry) = self.index.get_mut(identity.as_str()) {
            if entry.cookie != cookie || entry.pins == 0 {
                return Release::Unknown;
            }
            entry.pins -= 1;
            trace!(identity = %identity, pins = entry.pins, "released resident servant");
            return if entry.pins == 0 {
                Release::Unpinned
            } else {
                Release::Pinned
            };
        }

        let Some(entry) = self.detached.get_mut(identity.as_str()) else {
            return Release::Unknown;
        };
        if entry.cookie != cookie || entry.pins == 0 {
            return Release::Unknown;
        }
        entry.pins -= 1;
        if entry.pins > 0 {
            return Release::Pinned;
        }

        let Some(mut entry) = self.detached.remove(identity.as_str()) else {
            return Release::Unknown;
        };
        if self.index.len() < self.capacity {
            entry.position = Some(self.lru.push_front(entry.identity.clone()));
            self.index.insert(entry.identity.clone(), entry);
            #[cfg(feature = "metrics")]
            self.metrics.record_admission();
            debug!(identity = %identity, "detached servant promoted to resident");
            Release::Promoted
        } else {
            debug!(identity = %identity, "detached servant dropped after last release");
            Release::Dropped
        }
    }

    /// Removes `identity` from the evictor. Returns `true` if a servant was live.
    ///
    /// Dispatches that still hold the servant keep it alive until they finish;
    /// their `finished` calls become no-ops. A fetch in flight for `identity`
    /// is marked stale and will query the store again.
    pub fn invalidate(&mut self, identity: &Identity) -> bool {
        if let Some(ticket) = self.loading.get_mut(identity.as_str()) {
            ticket.stale = true;
        }

        let removed = match self.index.remove(identity.as_str()) {
            Some(entry) => {
                if let Some(position) = entry.position {
                    self.lru.remove(position);
                }
                true
            },
            None => self.detached.remove(identity.as_str()).is_some(),
        };

        if removed {
            #[cfg(feature = "metrics")]
            self.metrics.record_invalidation();
            debug!(identity = %identity, "servant invalidated");
        }
        removed
    }

    /// Drops every resident and detached servant.
    ///
    /// In-flight fetches are left alone and admit their servant when they
    /// complete.
    pub fn clear(&mut self) {
        self.index.clear();
        self.detached.clear();
        self.lru.clear();
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> EvictorMetricsSnapshot {
        let m = &self.metrics;
        EvictorMetricsSnapshot {
            hits: m.hits,
            misses: m.misses,
            coalesced_waits: m.coalesced_waits,
            store_fetches: m.store_fetches,
            not_found: m.not_found,
            store_failures: m.store_failures,
            stale_reloads: m.stale_reloads,
            admissions: m.admissions,
            detached_admissions: m.detached_admissions,
            races_reconciled: m.races_reconciled,
            evictions: m.evictions,
            invalidations: m.invalidations,
            resident: self.index.len(),
            detached: self.detached.len(),
            pending_loads: self.loading.len(),
            capacity: self.capacity,
        }
    }

    /// Verifies the structural invariants listed in the module docs.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.lru.len() {
            return Err(InvariantError::new(format!(
                "index has {} entries but recency list has {}",
                self.index.len(),
                self.lru.len()
            )));
        }
        if self.index.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "{} resident entries exceed capacity {}",
                self.index.len(),
                self.capacity
            )));
        }
        for (key, entry) in &self.index {
            if *key != entry.identity {
                return Err(InvariantError::new(format!(
                    "entry for '{}' records identity '{}'",
                    key, entry.identity
                )));
            }
            let Some(position) = entry.position else {
                return Err(InvariantError::new(format!(
                    "resident entry '{}' has no list position",
                    key
                )));
            };
            if self.lru.get(position) != Some(key) {
                return Err(InvariantError::new(format!(
                    "list position of '{}' does not point back to it",
                    key
                )));
            }
            if self.detached.contains_key(key) {
                return Err(InvariantError::new(format!(
                    "'{}' is both resident and detached",
                    key
                )));
            }
        }
        for (key, entry) in &self.detached {
            if entry.pins == 0 {
                return Err(InvariantError::new(format!(
                    "detached entry '{}' has no pins",
                    key
                )));
            }
            if entry.position.is_some() {
                return Err(InvariantError::new(format!(
                    "detached entry '{}' still has a list position",
                    key
                )));
            }
        }
        Ok(())
    }

    fn pin_live(&mut self, identity: &Identity) -> Option<Located> {
        if let Some(entry) = self.index.get_mut(identity.as_str()) {
            if let Some(position) = entry.position {
                self.lru.move_to_front(position);
            }
            entry.pins += 1;
            return Some(entry.located());
        }
        let entry = self.detached.get_mut(identity.as_str())?;
        entry.pins += 1;
        Some(entry.located())
    }

    fn settle(
        &mut self,
        identity: &Identity,
        fetched: Result<Option<ServantHandle>, StoreError>,
        pins: usize,
    ) -> LoadOutcome {
        match fetched {
            Ok(Some(servant)) => {
                // A racing insert may have landed while the lock was released.
                if let Some(existing) = self.pin_live_by(identity, pins) {
                    #[cfg(feature = "metrics")]
                    self.metrics.record_race_reconciled();
                    debug!(identity = %identity, "reusing servant inserted by a racing locate");
                    return LoadOutcome::Loaded(existing);
                }
                LoadOutcome::Loaded(self.admit(identity.clone(), servant, pins))
            },
            Ok(None) => {
                #[cfg(feature = "metrics")]
                self.metrics.record_not_found();
                debug!(identity = %identity, "no such object in store");
                LoadOutcome::NotFound
            },
            Err(err) => {
                #[cfg(feature = "metrics")]
                self.metrics.record_store_failure();
                LoadOutcome::Failed(err)
            },
        }
    }

    fn pin_live_by(&mut self, identity: &Identity, pins: usize) -> Option<Located> {
        let located = self.pin_live(identity)?;
        if let Some(entry) = self
            .index
            .get_mut(identity.as_str())
            .or_else(|| self.detached.get_mut(identity.as_str()))
        {
            entry.pins += pins - 1;
        }
        Some(located)
    }

    /// Inserts a freshly loaded servant with `pins` pins, evicting the least
    /// recently used unpinned entry if the evictor is full.
    fn admit(&mut self, identity: Identity, servant: ServantHandle, pins: usize) -> Located {
        let cookie = Cookie(self.next_cookie);
        self.next_cookie += 1;

        let has_room = self.index.len() < self.capacity || self.evict_one();
        let mut entry = Entry {
            identity: identity.clone(),
            servant,
            cookie,
            pins,
            position: None,
        };
        let located = entry.located();

        if has_room {
            entry.position = Some(self.lru.push_front(identity.clone()));
            self.index.insert(identity, entry);
            #[cfg(feature = "metrics")]
            self.metrics.record_admission();
            debug!(resident = self.index.len(), cookie = cookie.0, "servant admitted");
        } else {
            self.detached.insert(identity, entry);
            #[cfg(feature = "metrics")]
            self.metrics.record_detached_admission();
            debug!(
                capacity = self.capacity,
                cookie = cookie.0,
                "no evictable entry, servant admitted detached"
            );
        }
        located
    }

    /// Evicts the least recently used unpinned entry. Returns `false` when
    /// every resident entry is pinned (or nothing is resident).
    fn evict_one(&mut self) -> bool {
        let victim = self.lru.iter_from_back().find_map(|(position, identity)| {
            let unpinned = self.index.get(identity).is_some_and(|entry| entry.pins == 0);
            unpinned.then_some(position)
        });
        let Some(position) = victim else {
            return false;
        };
        let Some(identity) = self.lru.remove(position) else {
            return false;
        };
        self.index.remove(&identity);
        #[cfg(feature = "metrics")]
        self.metrics.record_eviction();
        debug!(identity = %identity, "evicted least recently used servant");
        true
    }
}

impl fmt::Debug for EvictorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictorCore")
            .field("capacity", &self.capacity)
            .field("resident", &self.resident_identities())
            .field("detached", &self.detached.len())
            .field("pending_loads", &self.loading.len())
            .finish()
    }
}
