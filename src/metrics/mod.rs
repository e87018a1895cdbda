//! Evictor metrics.
//!
//! Recording, snapshotting and consumption are split the same way as the
//! cache itself: the evictor core writes counters through
//! [`EvictorMetricsRecorder`] while holding its lock, and callers read a
//! [`EvictorMetricsSnapshot`] through [`MetricsSnapshotProvider`].

pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use metrics_impl::EvictorMetrics;
pub use snapshot::EvictorMetricsSnapshot;
pub use traits::{EvictorMetricsRecorder, MetricsSnapshotProvider};
