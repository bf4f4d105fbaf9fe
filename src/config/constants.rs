//! # Configuration Constants
//!
//! Default geometry and server settings. Interdependent values are
//! co-located and checked with compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_PAGE_SIZE (40 KiB)
//!       │
//!       └─> DEFAULT_CACHE_BYTES (derived: page_size × page_count)
//!             The default geometry is 2560 pages × 40 KiB = 100 MiB.
//!             Values are stored in whole pages, so the worst-case waste
//!             per entry is page_size − 1 bytes.
//!
//! DEFAULT_WORKER_COUNT (4)
//!       │
//!       └─> Workers contend on the single cache lock; more workers only
//!           help while requests are being parsed and responses written.
//! ```

// ============================================================================
// PAGE GEOMETRY
// These define the backing store shape; both are runtime-overridable
// ============================================================================

/// Default size of each cache page in bytes (40 KiB).
pub const DEFAULT_PAGE_SIZE: usize = 40 * 1024;

/// Default number of pages in the backing store.
pub const DEFAULT_PAGE_COUNT: u32 = 2560;

/// Default total capacity in bytes, derived from the page geometry.
pub const DEFAULT_CACHE_BYTES: usize = DEFAULT_PAGE_SIZE * DEFAULT_PAGE_COUNT as usize;

const _: () = assert!(
    DEFAULT_CACHE_BYTES == 100 * 1024 * 1024,
    "default geometry must multiply out to 100 MiB"
);

// ============================================================================
// SERVER SETTINGS
// ============================================================================

/// Default number of worker threads draining the work queue.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default TCP port for the cache server.
pub const DEFAULT_PORT: u16 = 7171;

/// Maximum accepted length of a single protocol line in bytes. Lines longer
/// than this are rejected before parsing.
pub const MAX_LINE_BYTES: usize = 4096;

const _: () = assert!(DEFAULT_WORKER_COUNT >= 1, "at least one worker is required");
