//! # Cache Statistics
//!
//! Atomic counters for the cache's operational history plus a point-in-time
//! fragmentation report. Counters are incremented while holding the cache
//! lock but read without it, so a snapshot is eventually consistent: it may
//! straddle an in-flight operation, never tear an individual counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic operation counters. `reset` is the only writer that moves a
/// counter backward.
#[derive(Debug, Default)]
pub struct CacheStats {
    total_requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    adds: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    coalesces: AtomicU64,
    defragmentations: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_add(&self) {
        self.adds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `merges` free-block merges (one release can merge with both
    /// neighbors). No-op when a release touched nothing.
    pub fn record_coalesces(&self, merges: u32) {
        if merges > 0 {
            self.coalesces.fetch_add(merges as u64, Ordering::Relaxed);
        }
    }

    pub fn record_defragmentation(&self) {
        self.defragmentations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.hits.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.adds.store(0, Ordering::Relaxed);
        self.updates.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.coalesces.store(0, Ordering::Relaxed);
        self.defragmentations.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            adds: self.adds.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            coalesces: self.coalesces.load(Ordering::Relaxed),
            defragmentations: self.defragmentations.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub adds: u64,
    pub updates: u64,
    pub deletes: u64,
    pub coalesces: u64,
    pub defragmentations: u64,
}

impl StatsSnapshot {
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.hits as f64 / self.total_requests as f64
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} hits={} misses={} hit_ratio={:.2} adds={} updates={} deletes={} \
             evictions={} coalesces={} defragmentations={}",
            self.total_requests,
            self.hits,
            self.misses,
            self.hit_ratio(),
            self.adds,
            self.updates,
            self.deletes,
            self.evictions,
            self.coalesces,
            self.defragmentations,
        )
    }
}

/// Fragmentation snapshot of the free list.
///
/// `frag_ratio` is `1 − largest_free / total_free`: 0 means all free space
/// is one contiguous run, approaching 1 means it is maximally scattered.
/// Defined as 0 when there is no free space at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragReport {
    pub total_free: u32,
    pub largest_free: u32,
    pub num_blocks: usize,
    pub frag_ratio: f64,
}

impl FragReport {
    pub fn new(total_free: u32, largest_free: u32, num_blocks: usize) -> Self {
        let frag_ratio = if total_free == 0 {
            0.0
        } else {
            1.0 - largest_free as f64 / total_free as f64
        };
        Self {
            total_free,
            largest_free,
            num_blocks,
            frag_ratio,
        }
    }
}

impl fmt::Display for FragReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "free_pages={} largest_block={} free_blocks={} frag_ratio={:.2}",
            self.total_free, self.largest_free, self.num_blocks, self.frag_ratio,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = CacheStats::new();

        stats.record_request();
        stats.record_request();
        stats.record_hit();
        stats.record_miss();
        stats.record_coalesces(2);

        let snap = stats.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.coalesces, 2);
    }

    #[test]
    fn zero_merges_do_not_count() {
        let stats = CacheStats::new();

        stats.record_coalesces(0);

        assert_eq!(stats.snapshot().coalesces, 0);
    }

    #[test]
    fn hit_ratio_handles_zero_requests() {
        let stats = CacheStats::new();

        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let stats = CacheStats::new();
        stats.record_request();
        stats.record_add();
        stats.record_defragmentation();

        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot {
            total_requests: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            adds: 0,
            updates: 0,
            deletes: 0,
            coalesces: 0,
            defragmentations: 0,
        });
    }

    #[test]
    fn frag_ratio_is_zero_for_one_block() {
        let report = FragReport::new(50, 50, 1);

        assert_eq!(report.frag_ratio, 0.0);
    }

    #[test]
    fn frag_ratio_grows_with_scatter() {
        let report = FragReport::new(50, 10, 5);

        assert!((report.frag_ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    fn frag_ratio_is_zero_when_full() {
        let report = FragReport::new(0, 0, 0);

        assert_eq!(report.frag_ratio, 0.0);
    }
}
