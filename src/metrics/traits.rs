//! # Metrics Traits
//!
//! ```text
//!   ┌──────────────────────────────┐      ┌──────────────────────────────┐
//!   │  EvictorMetricsRecorder      │      │ MetricsSnapshotProvider<S>   │
//!   │  (written under the lock)    │      │ (read by tests / monitoring) │
//!   └──────────────────────────────┘      └──────────────────────────────┘
//! ```
//!
//! Recorders only write counters; providers only read them.

/// Counters the evictor core updates while it holds its lock.
pub trait EvictorMetricsRecorder {
    fn record_hit(&mut self);
    fn record_miss(&mut self);
    /// A dispatch joined a fetch already in flight instead of querying the store.
    fn record_coalesced_wait(&mut self);
    fn record_store_fetch(&mut self);
    fn record_not_found(&mut self);
    fn record_store_failure(&mut self);
    /// A fetch was discarded because the identity was invalidated meanwhile.
    fn record_stale_reload(&mut self);
    fn record_admission(&mut self);
    /// Every resident entry was pinned, so the servant was admitted detached.
    fn record_detached_admission(&mut self);
    /// A racing insert was found on re-acquisition and reused.
    fn record_race_reconciled(&mut self);
    fn record_eviction(&mut self);
    fn record_invalidation(&mut self);
}

/// Produces a point-in-time snapshot of metrics.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}
