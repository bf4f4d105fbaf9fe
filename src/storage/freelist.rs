//! # Coalescing Free List
//!
//! Tracks the free page runs of the backing store. Each run is a maximal
//! contiguous range of unallocated pages; runs are kept in a `BTreeMap`
//! keyed by start page, which gives sorted order for free and turns
//! neighbor inspection during coalescing into a predecessor/successor query.
//!
//! ## Invariants
//!
//! 1. Every run has length ≥ 1 and fits inside the store.
//! 2. No two runs overlap or touch; touching runs are merged on release.
//! 3. Runs are traversed in strictly increasing start order (map order).
//!
//! Because the runs are sorted and disjoint, a released range can merge with
//! at most one neighbor on each side, so coalescing is O(log n) per release.
//!
//! ## Failure Model
//!
//! `take` from a run that cannot satisfy the request and `release` of a
//! range overlapping an existing run are invariant violations: the allocator
//! state is corrupt and the process panics rather than continuing. Callers
//! gate `take` on `best_fit`/`first_fit`.

use std::collections::BTreeMap;
use std::str::FromStr;

/// Free-block selection strategy for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocStrategy {
    /// Smallest run that satisfies the request; ties go to the lowest start
    /// page. Minimizes the shard left behind by the split.
    BestFit,
    /// Lowest-addressed run that satisfies the request.
    FirstFit,
}

impl AllocStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AllocStrategy::BestFit => "best-fit",
            AllocStrategy::FirstFit => "first-fit",
        }
    }
}

impl FromStr for AllocStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "best-fit" | "best_fit" | "best" => Ok(AllocStrategy::BestFit),
            "first-fit" | "first_fit" | "first" => Ok(AllocStrategy::FirstFit),
            other => Err(format!("unknown allocation strategy '{other}'")),
        }
    }
}

/// A contiguous run of free pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    pub start: u32,
    pub len: u32,
}

#[derive(Debug)]
pub struct FreeList {
    /// start page → run length, disjoint and non-touching.
    runs: BTreeMap<u32, u32>,
    total_free: u32,
}

impl FreeList {
    /// A free list covering the whole store: one run spanning all pages.
    pub fn new(total_pages: u32) -> Self {
        let mut runs = BTreeMap::new();
        if total_pages > 0 {
            runs.insert(0, total_pages);
        }
        Self {
            runs,
            total_free: total_pages,
        }
    }

    pub fn total_free(&self) -> u32 {
        self.total_free
    }

    pub fn num_blocks(&self) -> usize {
        self.runs.len()
    }

    pub fn largest_free(&self) -> u32 {
        self.runs.values().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// All runs in increasing start order.
    pub fn blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
        self.runs
            .iter()
            .map(|(&start, &len)| FreeBlock { start, len })
    }

    /// The run of smallest length ≥ `n`; ties break toward the lowest start
    /// page. Returns `None` if no run is large enough.
    pub fn best_fit(&self, n: u32) -> Option<FreeBlock> {
        let mut best: Option<FreeBlock> = None;
        for (&start, &len) in &self.runs {
            if len >= n && best.map_or(true, |b| len < b.len) {
                best = Some(FreeBlock { start, len });
                if len == n {
                    break;
                }
            }
        }
        best
    }

    /// The lowest-addressed run with length ≥ `n`.
    pub fn first_fit(&self, n: u32) -> Option<FreeBlock> {
        self.runs
            .iter()
            .find(|(_, &len)| len >= n)
            .map(|(&start, &len)| FreeBlock { start, len })
    }

    pub fn find(&self, strategy: AllocStrategy, n: u32) -> Option<FreeBlock> {
        match strategy {
            AllocStrategy::BestFit => self.best_fit(n),
            AllocStrategy::FirstFit => self.first_fit(n),
        }
    }

    /// Consumes `n` pages from the front of `block`, returning the start
    /// page taken. If the block is an exact fit it is removed; otherwise its
    /// front is trimmed.
    pub fn take(&mut self, block: FreeBlock, n: u32) -> u32 {
        let len = self
            .runs
            .remove(&block.start)
            .unwrap_or_else(|| panic!("take: no free run starts at page {}", block.start));
        assert!(
            len == block.len && len >= n && n >= 1,
            "take: run ({}, {len}) cannot satisfy {n} pages",
            block.start
        );

        if len > n {
            self.runs.insert(block.start + n, len - n);
        }
        self.total_free -= n;
        block.start
    }

    /// Inserts the run `(start, n)` at its sorted position and merges it
    /// with any touching neighbor. Returns the number of merges performed
    /// (0, 1, or 2); releasing a range that overlaps an existing run panics.
    pub fn release(&mut self, start: u32, n: u32) -> u32 {
        assert!(n >= 1, "release: run length must be at least 1");

        let mut merged_start = start;
        let mut merged_len = n;
        let mut merges = 0;

        if let Some((&prev_start, &prev_len)) = self.runs.range(..start).next_back() {
            assert!(
                prev_start + prev_len <= start,
                "release: ({start}, {n}) overlaps free run ({prev_start}, {prev_len})"
            );
            if prev_start + prev_len == start {
                self.runs.remove(&prev_start);
                merged_start = prev_start;
                merged_len += prev_len;
                merges += 1;
            }
        }

        if let Some((&next_start, &next_len)) = self.runs.range(start..).next() {
            assert!(
                next_start >= start + n,
                "release: ({start}, {n}) overlaps free run ({next_start}, {next_len})"
            );
            if next_start == start + n {
                self.runs.remove(&next_start);
                merged_len += next_len;
                merges += 1;
            }
        }

        self.runs.insert(merged_start, merged_len);
        self.total_free += n;
        merges
    }

    /// Discards all runs and installs the single trailing run
    /// `(first_free, total_pages − first_free)`, or nothing if the store is
    /// full. This is the compaction rebuild.
    pub fn rebuild_tail(&mut self, first_free: u32, total_pages: u32) {
        self.runs.clear();
        if first_free < total_pages {
            self.runs.insert(first_free, total_pages - first_free);
            self.total_free = total_pages - first_free;
        } else {
            self.total_free = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(list: &FreeList) -> Vec<(u32, u32)> {
        list.blocks().map(|b| (b.start, b.len)).collect()
    }

    #[test]
    fn new_list_is_one_spanning_run() {
        let list = FreeList::new(100);

        assert_eq!(blocks(&list), vec![(0, 100)]);
        assert_eq!(list.total_free(), 100);
        assert_eq!(list.largest_free(), 100);
    }

    #[test]
    fn take_exact_fit_removes_run() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();

        let start = list.take(block, 100);

        assert_eq!(start, 0);
        assert!(list.is_empty());
        assert_eq!(list.total_free(), 0);
    }

    #[test]
    fn take_partial_trims_front() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(30).unwrap();

        let start = list.take(block, 30);

        assert_eq!(start, 0);
        assert_eq!(blocks(&list), vec![(30, 70)]);
        assert_eq!(list.total_free(), 70);
    }

    #[test]
    fn best_fit_picks_smallest_sufficient_run() {
        let mut list = FreeList::new(100);
        // carve out [(0,30), (50,50)] by allocating 0..50 then freeing 0..30
        let block = list.best_fit(50).unwrap();
        list.take(block, 50);
        list.release(0, 30);

        let found = list.best_fit(25).unwrap();

        assert_eq!(found, FreeBlock { start: 0, len: 30 });
    }

    #[test]
    fn best_fit_ties_break_to_lowest_start() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(10, 20);
        list.release(60, 20);

        let found = list.best_fit(20).unwrap();

        assert_eq!(found.start, 10);
    }

    #[test]
    fn first_fit_picks_lowest_start() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(10, 30);
        list.release(60, 20);

        // best-fit would pick (60, 20); first-fit must pick (10, 30)
        let found = list.first_fit(20).unwrap();

        assert_eq!(found.start, 10);
    }

    #[test]
    fn fit_returns_none_when_no_run_large_enough() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(0, 10);
        list.release(50, 10);

        assert_eq!(list.best_fit(11), None);
        assert_eq!(list.first_fit(11), None);
        assert_eq!(list.total_free(), 20);
    }

    #[test]
    fn release_coalesces_left() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(0, 10);

        let merges = list.release(10, 10);

        assert_eq!(merges, 1);
        assert_eq!(blocks(&list), vec![(0, 20)]);
    }

    #[test]
    fn release_coalesces_right() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(20, 10);

        let merges = list.release(10, 10);

        assert_eq!(merges, 1);
        assert_eq!(blocks(&list), vec![(10, 20)]);
    }

    #[test]
    fn release_coalesces_both_sides() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(0, 10);
        list.release(20, 10);

        let merges = list.release(10, 10);

        assert_eq!(merges, 2);
        assert_eq!(blocks(&list), vec![(0, 30)]);
        assert_eq!(list.total_free(), 30);
    }

    #[test]
    fn release_without_neighbors_merges_nothing() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);

        let merges = list.release(40, 5);

        assert_eq!(merges, 0);
        assert_eq!(blocks(&list), vec![(40, 5)]);
    }

    #[test]
    #[should_panic(expected = "overlaps free run")]
    fn release_overlapping_left_panics() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(0, 20);

        list.release(10, 5);
    }

    #[test]
    #[should_panic(expected = "overlaps free run")]
    fn release_overlapping_right_panics() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(20, 20);

        list.release(10, 15);
    }

    #[test]
    #[should_panic(expected = "cannot satisfy")]
    fn take_more_than_run_panics() {
        let mut list = FreeList::new(10);
        let block = list.best_fit(10).unwrap();

        list.take(block, 11);
    }

    #[test]
    fn rebuild_tail_installs_single_run() {
        let mut list = FreeList::new(100);
        let block = list.best_fit(100).unwrap();
        list.take(block, 100);
        list.release(0, 10);
        list.release(30, 10);
        list.release(60, 10);

        list.rebuild_tail(50, 100);

        assert_eq!(blocks(&list), vec![(50, 50)]);
        assert_eq!(list.total_free(), 50);
    }

    #[test]
    fn rebuild_tail_of_full_store_is_empty() {
        let mut list = FreeList::new(100);

        list.rebuild_tail(100, 100);

        assert!(list.is_empty());
        assert_eq!(list.total_free(), 0);
    }
}
