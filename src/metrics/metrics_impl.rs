use crate::metrics::traits::EvictorMetricsRecorder;

/// Plain counters; synchronization is provided by the evictor's lock.
#[derive(Debug, Default, Clone)]
pub struct EvictorMetrics {
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
}

impl EvictorMetricsRecorder for EvictorMetrics {
    #[inline]
    fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    fn record_miss(&mut self) {
        self.misses += 1;
    }

    #[inline]
    fn record_coalesced_wait(&mut self) {
        self.coalesced_waits += 1;
    }

    #[inline]
    fn record_store_fetch(&mut self) {
        self.store_fetches += 1;
    }

    #[inline]
    fn record_not_found(&mut self) {
        self.not_found += 1;
    }

    #[inline]
    fn record_store_failure(&mut self) {
        self.store_failures += 1;
    }

    #[inline]
    fn record_stale_reload(&mut self) {
        self.stale_reloads += 1;
    }

    #[inline]
    fn record_admission(&mut self) {
        self.admissions += 1;
    }

    #[inline]
    fn record_detached_admission(&mut self) {
        self.detached_admissions += 1;
    }

    #[inline]
    fn record_race_reconciled(&mut self) {
        self.races_reconciled += 1;
    }

    #[inline]
    fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    #[inline]
    fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_increments_each_counter() {
        let mut m = EvictorMetrics::default();
        m.record_hit();
        m.record_hit();
        m.record_miss();
        m.record_store_fetch();
        m.record_eviction();
        m.record_invalidation();
        assert_eq!(m.hits, 2);
        assert_eq!(m.misses, 1);
        assert_eq!(m.store_fetches, 1);
        assert_eq!(m.evictions, 1);
        assert_eq!(m.invalidations, 1);
        assert_eq!(m.not_found, 0);
    }
}
