//! # Cache Facade
//!
//! The public face of the allocator. All cache state (page store, free
//! list, entry table, policy structures) is one `CacheCore` value behind
//! a single `parking_lot::Mutex`; the facade methods lock, delegate, and
//! unlock. Statistics counters are atomics shared outside the lock, so
//! `stats()` and `fragmentation()` readers never contend with writers
//! beyond the snapshot itself.
//!
//! ## Ordering Guarantees
//!
//! Operations on the same key from the same client serialize on the lock;
//! across clients and keys the only order is arrival order at the lock.
//! Compaction and eviction run inside the same critical section as the
//! operation that triggered them, so they observe a quiescent state, which
//! is what makes the in-place byte moves during compaction safe.
//!
//! ## Module Organization
//!
//! - `core`: decision tree, compaction, invariant checking
//! - `entries`: key → location table

mod core;
mod entries;

pub use entries::Entry;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::eviction::{Evictor, PolicyKind};
use crate::stats::{CacheStats, FragReport, StatsSnapshot};
use crate::storage::{AllocStrategy, FreeBlock, PageStore};

use self::core::CacheCore;

pub struct Cache {
    core: Mutex<CacheCore>,
    stats: Arc<CacheStats>,
    page_size: usize,
    page_count: u32,
    policy: PolicyKind,
    strategy: AllocStrategy,
}

impl Cache {
    /// Builds a cache from the given configuration. The backing store
    /// starts as one free block spanning all pages.
    pub fn new(config: &CacheConfig) -> eyre::Result<Self> {
        config.validate()?;

        let pages = PageStore::new(config.page_size, config.num_pages)?;
        let stats = Arc::new(CacheStats::new());
        let core = CacheCore::new(
            pages,
            Evictor::new(config.policy),
            config.strategy,
            Arc::clone(&stats),
        );

        Ok(Self {
            core: Mutex::new(core),
            stats,
            page_size: config.page_size,
            page_count: config.num_pages,
            policy: config.policy,
            strategy: config.strategy,
        })
    }

    /// Stores a new key. Fails with `KeyExists` if the key is present;
    /// `update` is the explicit modification path.
    pub fn insert(&self, key: &str, value: &[u8], client_id: &str) -> Result<()> {
        self.stats.record_request();
        self.core.lock().insert(key, value, client_id)
    }

    /// Replaces an existing key's value, in place when the new value fits
    /// the entry's current page range, otherwise by reallocation.
    pub fn update(&self, key: &str, value: &[u8], client_id: &str) -> Result<()> {
        self.stats.record_request();
        self.core.lock().update(key, value, client_id)
    }

    /// Reads a key's value and refreshes its policy state.
    pub fn get(&self, key: &str, _client_id: &str) -> Result<Vec<u8>> {
        self.stats.record_request();
        self.core.lock().get(key)
    }

    /// Removes a key, returning its pages to the free list.
    pub fn delete(&self, key: &str, _client_id: &str) -> Result<()> {
        self.stats.record_request();
        self.core.lock().delete(key)
    }

    /// Forces a compaction pass. The allocator also compacts on demand when
    /// a fragmented free list blocks an otherwise satisfiable allocation.
    pub fn compact(&self) {
        self.core.lock().compact();
    }

    pub fn fragmentation(&self) -> FragReport {
        self.core.lock().fragmentation()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Location metadata for a stored key, if present.
    pub fn entry(&self, key: &str) -> Option<Entry> {
        self.core.lock().entry(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.core.lock().contains(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.core.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The free list's runs in increasing start order.
    pub fn free_blocks(&self) -> Vec<FreeBlock> {
        self.core.lock().free_blocks()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn capacity_bytes(&self) -> usize {
        self.page_size * self.page_count as usize
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    pub fn strategy(&self) -> AllocStrategy {
        self.strategy
    }

    /// Panics if any structural invariant is violated. Used by the test
    /// suites after every mutation.
    pub fn check_invariants(&self) {
        self.core.lock().check_invariants();
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("page_size", &self.page_size)
            .field("page_count", &self.page_count)
            .field("policy", &self.policy)
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache() -> Cache {
        Cache::new(&CacheConfig {
            page_size: 10,
            num_pages: 100,
            ..CacheConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn facade_round_trips_a_value() {
        let cache = small_cache();

        cache.insert("k", b"value", "c1").unwrap();

        assert_eq!(cache.get("k", "c1").unwrap(), b"value");
        assert_eq!(cache.len(), 1);
        cache.check_invariants();
    }

    #[test]
    fn counters_track_operations() {
        let cache = small_cache();

        cache.insert("k", b"value", "c1").unwrap();
        cache.get("k", "c1").unwrap();
        let _ = cache.get("missing", "c1");
        cache.delete("k", "c1").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.adds, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.deletes, 1);
    }

    #[test]
    fn fragmentation_reflects_free_list() {
        let cache = small_cache();
        cache.insert("a", &[0u8; 100], "c1").unwrap();
        cache.insert("b", &[0u8; 100], "c1").unwrap();
        cache.insert("c", &[0u8; 100], "c1").unwrap();
        cache.delete("b", "c1").unwrap();

        let frag = cache.fragmentation();

        assert_eq!(frag.total_free, 80);
        assert_eq!(frag.largest_free, 70);
        assert_eq!(frag.num_blocks, 2);
        assert!(frag.frag_ratio > 0.0);
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(small_cache());
        let mut handles = Vec::new();

        for t in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                let key = format!("key-{t}");
                cache.insert(&key, &[t as u8; 50], "c1").unwrap();
                assert_eq!(cache.get(&key, "c1").unwrap(), vec![t as u8; 50]);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 4);
        cache.check_invariants();
    }
}
