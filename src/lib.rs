//! # embercache - Networked Page Cache with Defragmentation
//!
//! embercache is an in-memory key/value cache that stores variable-sized
//! values in a fixed-size, page-granular backing store. Every value occupies
//! a contiguous run of pages, which makes reads a single slice copy but
//! exposes the cache to external fragmentation: interleaved inserts and
//! deletes scatter the free space until a request for N contiguous pages
//! fails even though N free pages exist.
//!
//! The interesting machinery lives in the allocator:
//!
//! - **Coalescing free list**: disjoint free runs kept in an ordered map,
//!   merged with their neighbors on every release
//! - **Allocation decision tree**: best-fit (or first-fit) lookup, then
//!   compaction when enough total space exists, then eviction as the last
//!   resort
//! - **Compaction**: live entries are relocated toward page 0, collapsing
//!   all free space into one trailing block
//! - **Pluggable eviction**: LRU, FIFO, SIEVE, and CLOCK victim selection
//!   behind a single interface
//!
//! ## Quick Start
//!
//! ```ignore
//! use embercache::{Cache, CacheConfig};
//!
//! let cache = Cache::new(&CacheConfig::default())?;
//!
//! cache.insert("user:1", b"alice", "client-1")?;
//! let value = cache.get("user:1", "client-1")?;
//! cache.delete("user:1", "client-1")?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │    TCP Server (accept + workers)     │
//! ├──────────────────────────────────────┤
//! │      Command Protocol (lines)        │
//! ├──────────────────────────────────────┤
//! │   Cache Facade (single exclusive     │
//! │   lock, atomic statistics)           │
//! ├────────────┬─────────────────────────┤
//! │ Entry Table│  Eviction Policies      │
//! ├────────────┴─────────────────────────┤
//! │   Free List (ordered, coalescing)    │
//! ├──────────────────────────────────────┤
//! │   Page Store (anonymous memory map)  │
//! └──────────────────────────────────────┘
//! ```
//!
//! The server layer is deliberately thin: the accept loop hands raw lines to
//! a fixed worker pool, and every worker funnels into the same cache facade.
//! All cache state (page store, free list, entry table, policy structures)
//! lives behind one exclusive lock; statistics are atomics and can be read
//! without it.
//!
//! ## Module Overview
//!
//! - [`storage`]: page-granular backing store and the coalescing free list
//! - [`cache`]: entry table, allocation decision tree, compaction, facade
//! - [`eviction`]: LRU / FIFO / SIEVE / CLOCK victim selection
//! - [`stats`]: atomic counters and fragmentation reporting
//! - [`server`]: TCP accept loop, worker pool, line protocol
//! - [`config`]: geometry and runtime configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod server;
pub mod stats;
pub mod storage;

pub use cache::{Cache, Entry};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use eviction::PolicyKind;
pub use server::CacheServer;
pub use stats::{CacheStats, FragReport, StatsSnapshot};
pub use storage::{AllocStrategy, FreeBlock};
