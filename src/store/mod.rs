//! Persistent stores that back the evictor.
//!
//! The evictor treats its store as an opaque, already-durable key/value
//! service keyed by [`Identity`](crate::identity::Identity). It is queried
//! only on a cache miss and never while the evictor's lock is held.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{PersistentStore, StoreMetrics};
