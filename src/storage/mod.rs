//! # Storage Module
//!
//! The foundational layer of embercache: a page-granular backing store and
//! the free-list bookkeeping that tracks which page runs are available.
//!
//! ## Architecture Overview
//!
//! The backing store is a single anonymous memory map of
//! `num_pages × page_size` bytes. Pages are addressed by `u32` index and the
//! store knows nothing about allocation state; it is a passive byte array
//! addressed in page units. Reads return slices directly into the map, so a
//! `get` costs one bounds check and one copy into the response.
//!
//! Allocation state lives entirely in the [`FreeList`]: an ordered map of
//! disjoint free runs keyed by start page. Keeping the runs sorted makes
//! coalescing a pair of predecessor/successor lookups, and makes the
//! disjointness invariant cheap to verify.
//!
//! ## Safety Model
//!
//! The map is created once at startup and never remapped, so slices borrowed
//! from [`PageStore::read`] stay valid for the borrow's lifetime by ordinary
//! borrow-checker rules. `move_pages` takes `&mut self` and uses
//! `copy_within`, which handles overlapping source and destination ranges in
//! either direction.
//!
//! ## Module Organization
//!
//! - `pages`: the anonymous-mmap page store (`PageStore`)
//! - `freelist`: ordered, coalescing free-run tracking (`FreeList`)

mod freelist;
mod pages;

pub use freelist::{AllocStrategy, FreeBlock, FreeList};
pub use pages::PageStore;
