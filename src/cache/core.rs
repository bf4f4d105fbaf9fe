//! # Allocator Core
//!
//! The single-threaded heart of the cache: page store, free list, entry
//! table, and eviction policy, orchestrated by the allocation decision tree.
//! The facade wraps one `CacheCore` in a mutex; everything here assumes
//! exclusive access.
//!
//! ## Allocation Decision Tree
//!
//! For a write needing `n` contiguous pages:
//!
//! 1. In-place overwrite if the key exists and its current range holds `n`
//!    pages (the range is never split; the tail is logically truncated).
//! 2. Otherwise free the old range first, then:
//! 3. Fit lookup (best-fit or first-fit per configuration).
//! 4. If the fit fails but enough *total* free pages exist, compact and
//!    retry: compaction is cheaper than destroying live entries.
//! 5. Otherwise evict one victim at a time, re-checking the fit (and the
//!    compaction opportunity) after each, until the request fits or the
//!    table is empty.
//! 6. Out of space.
//!
//! ## Compaction
//!
//! Entries are relocated in ascending start-page order with a cursor
//! sweeping from page 0. Destinations are always ≤ sources, and
//! `PageStore::move_pages` tolerates overlap regardless, so the sweep needs
//! no scratch space. The free list is rebuilt as a single trailing run.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::eviction::Evictor;
use crate::stats::{CacheStats, FragReport};
use crate::storage::{AllocStrategy, FreeList, PageStore};

use super::entries::{Entry, EntryTable};

pub(crate) struct CacheCore {
    pages: PageStore,
    free: FreeList,
    entries: EntryTable,
    policy: Evictor,
    strategy: AllocStrategy,
    stats: Arc<CacheStats>,
}

impl CacheCore {
    pub fn new(
        pages: PageStore,
        policy: Evictor,
        strategy: AllocStrategy,
        stats: Arc<CacheStats>,
    ) -> Self {
        let free = FreeList::new(pages.page_count());
        Self {
            pages,
            free,
            entries: EntryTable::new(),
            policy,
            strategy,
            stats,
        }
    }

    pub fn insert(&mut self, key: &str, value: &[u8], client_id: &str) -> Result<()> {
        if self.entries.contains(key) {
            return Err(Error::KeyExists(key.to_string()));
        }

        let num_pages = self.pages.pages_for(value.len());
        let start_page = self.allocate(num_pages)?;
        self.pages
            .write(start_page, value)
            .expect("allocated range must lie inside the store");

        self.entries.insert(
            key.to_string(),
            Entry {
                start_page,
                num_pages,
                data_size: value.len(),
                owner: client_id.to_string(),
            },
        );
        self.policy.on_insert(key);
        self.stats.record_add();
        Ok(())
    }

    pub fn update(&mut self, key: &str, value: &[u8], client_id: &str) -> Result<()> {
        let num_pages = self.pages.pages_for(value.len());

        let Some(entry) = self.entries.get(key) else {
            return Err(Error::NotFound(key.to_string()));
        };

        if num_pages <= entry.num_pages {
            // The new value fits the existing range: overwrite in place.
            // Allocation is page-granular, so a shrinking value only
            // truncates the range logically; no pages are returned.
            let start_page = entry.start_page;
            self.pages
                .write(start_page, value)
                .expect("existing entry range must lie inside the store");

            let entry = self.entries.get_mut(key).expect("entry checked above");
            entry.data_size = value.len();
            entry.owner = client_id.to_string();

            // An in-place update is an access, not an insertion: FIFO order
            // is preserved.
            self.policy.on_access(key);
        } else {
            // Grown past its range: delete-then-insert. The old pages are
            // released (and may merge) before the new fit runs, so the
            // allocator can reuse them. A reallocation assigns a new FIFO
            // sequence.
            self.remove_entry(key);
            let start_page = self.allocate(num_pages)?;
            self.pages
                .write(start_page, value)
                .expect("allocated range must lie inside the store");

            self.entries.insert(
                key.to_string(),
                Entry {
                    start_page,
                    num_pages,
                    data_size: value.len(),
                    owner: client_id.to_string(),
                },
            );
            self.policy.on_insert(key);
        }

        self.stats.record_update();
        Ok(())
    }

    pub fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return Err(Error::NotFound(key.to_string()));
        };

        let bytes = self
            .pages
            .read(entry.start_page, entry.data_size)
            .expect("entry range must lie inside the store")
            .to_vec();

        self.policy.on_access(key);
        self.stats.record_hit();
        Ok(bytes)
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        if !self.entries.contains(key) {
            return Err(Error::NotFound(key.to_string()));
        }

        self.remove_entry(key);
        self.stats.record_delete();
        Ok(())
    }

    /// Relocates every live entry so their ranges pack against page 0,
    /// leaving at most one trailing free block. Only `start_page` changes;
    /// keys, sizes, and policy state are untouched.
    pub fn compact(&mut self) {
        self.stats.record_defragmentation();

        let mut plan: SmallVec<[(String, u32, u32); 32]> = self
            .entries
            .iter()
            .map(|(key, e)| (key.clone(), e.start_page, e.num_pages))
            .collect();
        plan.sort_unstable_by_key(|&(_, start, _)| start);

        let mut cursor = 0u32;
        for (key, start, num_pages) in plan {
            if start != cursor {
                // Entries are processed in ascending start order and the
                // cursor never passes the next source, so dst <= src; the
                // copy tolerates overlap either way.
                self.pages
                    .move_pages(start, cursor, num_pages)
                    .expect("compaction ranges must lie inside the store");
                self.entries
                    .get_mut(&key)
                    .expect("snapshot key must still exist")
                    .start_page = cursor;
            }
            cursor += num_pages;
        }

        self.free.rebuild_tail(cursor, self.pages.page_count());
    }

    pub fn fragmentation(&self) -> FragReport {
        FragReport::new(
            self.free.total_free(),
            self.free.largest_free(),
            self.free.num_blocks(),
        )
    }

    pub fn entry(&self, key: &str) -> Option<Entry> {
        self.entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn free_blocks(&self) -> Vec<crate::storage::FreeBlock> {
        self.free.blocks().collect()
    }

    /// Finds `n` contiguous pages, compacting and evicting as needed.
    fn allocate(&mut self, n: u32) -> Result<u32> {
        let total_pages = self.pages.page_count();
        if n > total_pages {
            // No amount of compaction or eviction can help; refuse before
            // sacrificing live entries.
            return Err(Error::OutOfSpace {
                requested_pages: n,
                total_pages,
            });
        }

        loop {
            if let Some(block) = self.free.find(self.strategy, n) {
                return Ok(self.free.take(block, n));
            }

            if self.free.total_free() >= n {
                self.compact();
                let block = self
                    .free
                    .find(self.strategy, n)
                    .expect("compaction left enough pages in one block");
                return Ok(self.free.take(block, n));
            }

            let Some(victim) = self.policy.pick_victim() else {
                return Err(Error::OutOfSpace {
                    requested_pages: n,
                    total_pages,
                });
            };
            self.remove_entry(&victim);
            self.stats.record_eviction();
        }
    }

    /// Frees an entry's pages (coalescing into the free list) and drops its
    /// policy state. The entry must exist; policy/table drift is fatal.
    fn remove_entry(&mut self, key: &str) {
        let entry = self
            .entries
            .remove(key)
            .unwrap_or_else(|| panic!("entry '{key}' missing from table"));

        let merges = self.free.release(entry.start_page, entry.num_pages);
        self.stats.record_coalesces(merges);
        self.policy.on_remove(key);
    }

    /// Verifies the allocator's structural invariants, panicking with a
    /// description of the first violation. Exercised by the test suites
    /// after every mutation; cheap enough for debugging sessions too.
    pub fn check_invariants(&self) {
        let total_pages = self.pages.page_count() as u64;
        let page_size = self.pages.page_size();

        // Coverage: free + allocated = total.
        let free_pages = self.free.total_free() as u64;
        let allocated = self.entries.allocated_pages();
        assert!(
            free_pages + allocated == total_pages,
            "coverage violated: {free_pages} free + {allocated} allocated != {total_pages}"
        );

        // Free list: sorted, disjoint, coalesced, in bounds.
        let mut prev_end: Option<u64> = None;
        for block in self.free.blocks() {
            assert!(block.len >= 1, "free run ({}, {}) is empty", block.start, block.len);
            let start = block.start as u64;
            let end = start + block.len as u64;
            assert!(
                end <= total_pages,
                "free run ({}, {}) exceeds store of {total_pages} pages",
                block.start,
                block.len
            );
            if let Some(prev) = prev_end {
                assert!(
                    prev < start,
                    "free runs touch or overlap at page {start}"
                );
            }
            prev_end = Some(end);
        }

        // Entries: in bounds, sized to their range, disjoint from each
        // other and from free runs.
        let mut ranges: Vec<(u64, u64, bool)> = self
            .free
            .blocks()
            .map(|b| (b.start as u64, b.len as u64, true))
            .collect();
        for (key, entry) in self.entries.iter() {
            assert!(entry.num_pages >= 1, "entry '{key}' holds no pages");
            let end = entry.start_page as u64 + entry.num_pages as u64;
            assert!(
                end <= total_pages,
                "entry '{key}' range exceeds store of {total_pages} pages"
            );
            // The lower bound only holds for ranges sized by the allocator;
            // an in-place shrinking update keeps its original range.
            assert!(
                entry.data_size <= entry.num_pages as usize * page_size,
                "entry '{key}' data_size {} exceeds its {} pages",
                entry.data_size,
                entry.num_pages
            );
            ranges.push((entry.start_page as u64, entry.num_pages as u64, false));
        }

        ranges.sort_unstable_by_key(|&(start, _, _)| start);
        for pair in ranges.windows(2) {
            let (a_start, a_len, _) = pair[0];
            let (b_start, _, _) = pair[1];
            assert!(
                a_start + a_len <= b_start,
                "ranges overlap: ({a_start}, {a_len}) and ({b_start}, ..)"
            );
        }

        // Policy mirror: same key set on both sides.
        assert!(
            self.policy.len() == self.entries.len(),
            "policy tracks {} keys but table holds {}",
            self.policy.len(),
            self.entries.len()
        );
        for (key, _) in self.entries.iter() {
            assert!(
                self.policy.contains(key),
                "entry '{key}' missing from policy state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::PolicyKind;

    fn core(page_size: usize, page_count: u32) -> CacheCore {
        CacheCore::new(
            PageStore::new(page_size, page_count).unwrap(),
            Evictor::new(PolicyKind::Lru),
            AllocStrategy::BestFit,
            Arc::new(CacheStats::new()),
        )
    }

    #[test]
    fn insert_consumes_pages_from_front() {
        let mut core = core(10, 100);

        core.insert("a", &[1u8; 25], "c1").unwrap();

        let entry = core.entry("a").unwrap();
        assert_eq!(entry.start_page, 0);
        assert_eq!(entry.num_pages, 3);
        assert_eq!(entry.data_size, 25);
        assert_eq!(core.free_blocks().len(), 1);
        core.check_invariants();
    }

    #[test]
    fn insert_existing_key_is_rejected() {
        let mut core = core(10, 100);
        core.insert("a", b"one", "c1").unwrap();

        let result = core.insert("a", b"two", "c1");

        assert_eq!(result, Err(Error::KeyExists("a".to_string())));
    }

    #[test]
    fn get_returns_exact_bytes() {
        let mut core = core(10, 100);
        core.insert("a", b"hello pages", "c1").unwrap();

        assert_eq!(core.get("a").unwrap(), b"hello pages");
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let mut core = core(10, 100);

        assert_eq!(core.get("a"), Err(Error::NotFound("a".to_string())));
    }

    #[test]
    fn delete_releases_pages() {
        let mut core = core(10, 100);
        core.insert("a", &[1u8; 50], "c1").unwrap();

        core.delete("a").unwrap();

        assert_eq!(core.len(), 0);
        let blocks = core.free_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start, blocks[0].len), (0, 100));
        core.check_invariants();
    }

    #[test]
    fn update_missing_key_is_not_found() {
        let mut core = core(10, 100);

        let result = core.update("a", b"x", "c1");

        assert_eq!(result, Err(Error::NotFound("a".to_string())));
    }

    #[test]
    fn oversized_insert_is_out_of_space() {
        let mut core = core(10, 100);
        core.insert("a", &[1u8; 10], "c1").unwrap();

        let result = core.insert("big", &[0u8; 1001], "c1");

        assert_eq!(
            result,
            Err(Error::OutOfSpace {
                requested_pages: 101,
                total_pages: 100,
            })
        );
        // the refusal must not have evicted anything
        assert!(core.contains("a"));
        core.check_invariants();
    }

    #[test]
    fn compact_packs_entries_leftward() {
        let mut core = core(10, 100);
        core.insert("a", &[1u8; 100], "c1").unwrap();
        core.insert("b", &[2u8; 100], "c1").unwrap();
        core.insert("c", &[3u8; 100], "c1").unwrap();
        core.delete("b").unwrap();

        core.compact();

        assert_eq!(core.entry("a").unwrap().start_page, 0);
        assert_eq!(core.entry("c").unwrap().start_page, 10);
        let blocks = core.free_blocks();
        assert_eq!((blocks[0].start, blocks[0].len), (20, 80));
        assert_eq!(core.get("c").unwrap(), vec![3u8; 100]);
        core.check_invariants();
    }
}
