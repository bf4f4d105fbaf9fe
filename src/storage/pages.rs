//! # Page Store
//!
//! A fixed-size backing store addressed in page units. The store is one
//! anonymous memory map created at startup; it is never grown or remapped,
//! and it carries no allocation state of its own. Which ranges are live is
//! the free list's and entry table's business.
//!
//! ## Design Notes
//!
//! An anonymous map rather than a `Vec<u8>` keeps the (potentially large)
//! backing region out of the allocator's hands and lets the OS lazily fault
//! pages in: a 100 MiB cache costs address space, not resident memory, until
//! values are actually written.
//!
//! `move_pages` is the compaction primitive. It uses `copy_within`, which
//! copies correctly for overlapping ranges in both directions, so the
//! compaction sweep does not need to reason about overlap at all.

use eyre::WrapErr;
use memmap2::MmapMut;

use crate::error::{Error, Result};

pub struct PageStore {
    map: MmapMut,
    page_size: usize,
    page_count: u32,
}

impl PageStore {
    /// Creates a zeroed backing store of `page_count` pages of `page_size`
    /// bytes each.
    pub fn new(page_size: usize, page_count: u32) -> eyre::Result<Self> {
        eyre::ensure!(page_size > 0, "page size must be at least 1 byte");
        eyre::ensure!(page_count > 0, "page count must be at least 1");

        let len = page_size * page_count as usize;
        let map = MmapMut::map_anon(len)
            .wrap_err_with(|| format!("failed to map {len} bytes of anonymous memory"))?;

        Ok(Self {
            map,
            page_size,
            page_count,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of pages needed to hold `data_size` bytes. Zero-length values
    /// still occupy one page; allocation is page-granular.
    pub fn pages_for(&self, data_size: usize) -> u32 {
        (data_size.div_ceil(self.page_size).max(1)) as u32
    }

    /// Copies `bytes` into the pages starting at `start`.
    pub fn write(&mut self, start: u32, bytes: &[u8]) -> Result<()> {
        let pages = self.pages_for(bytes.len());
        self.check_range(start, pages)?;

        let offset = start as usize * self.page_size;
        self.map[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Returns `length` bytes beginning at page `start`, borrowed directly
    /// from the backing map.
    pub fn read(&self, start: u32, length: usize) -> Result<&[u8]> {
        let pages = self.pages_for(length);
        self.check_range(start, pages)?;

        let offset = start as usize * self.page_size;
        Ok(&self.map[offset..offset + length])
    }

    /// Relocates `n` pages worth of bytes from `src` to `dst`. Overlapping
    /// ranges are copied correctly in either direction.
    pub fn move_pages(&mut self, src: u32, dst: u32, n: u32) -> Result<()> {
        self.check_range(src, n)?;
        self.check_range(dst, n)?;

        let len = n as usize * self.page_size;
        let src_off = src as usize * self.page_size;
        let dst_off = dst as usize * self.page_size;
        self.map.copy_within(src_off..src_off + len, dst_off);
        Ok(())
    }

    fn check_range(&self, start: u32, pages: u32) -> Result<()> {
        if start as u64 + pages as u64 > self.page_count as u64 {
            return Err(Error::PageRange {
                start_page: start,
                num_pages: pages,
                total_pages: self.page_count,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for PageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStore")
            .field("page_size", &self.page_size)
            .field("page_count", &self.page_count)
            .finish()
    }
}
