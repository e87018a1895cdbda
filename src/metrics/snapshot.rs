#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvictorMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub coalesced_waits: u64,
    pub store_fetches: u64,
    pub not_found: u64,
    pub store_failures: u64,
    pub stale_reloads: u64,
    pub admissions: u64,
    pub detached_admissions: u64,
    pub races_reconciled: u64,
    pub evictions: u64,
    pub invalidations: u64,

    // gauges captured at snapshot time
    pub resident: usize,
    pub detached: usize,
    pub pending_loads: usize,
    pub capacity: usize,
}

impl EvictorMetricsSnapshot {
    /// Fraction of `locate` calls served without a store round trip.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
