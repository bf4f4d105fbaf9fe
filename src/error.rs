//! # Cache Errors
//!
//! Typed errors surfaced through the public cache facade. The server maps
//! these onto protocol status strings; they never crash the process.
//!
//! Invariant violations (overlapping free ranges, policy/table drift,
//! eviction of an unknown victim) are deliberately *not* represented here:
//! continuing with corrupted allocator state would be worse than stopping,
//! so those panic instead.

use std::fmt::Display;

/// Errors returned by cache operations and protocol parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Insert was called for a key that is already stored. Update is the
    /// explicit modification path.
    KeyExists(String),
    /// The operation referenced a key that is not in the cache.
    NotFound(String),
    /// No combination of compaction and eviction can satisfy the request.
    OutOfSpace {
        requested_pages: u32,
        total_pages: u32,
    },
    /// A page-store access ran past the end of the backing store.
    PageRange {
        start_page: u32,
        num_pages: u32,
        total_pages: u32,
    },
    /// A protocol line could not be parsed into a command.
    InvalidCommand(String),
    /// A configuration constraint was violated at startup.
    InvalidConfig(String),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::KeyExists(key) => write!(f, "key '{key}' already exists"),
            Error::NotFound(key) => write!(f, "key '{key}' not found"),
            Error::OutOfSpace {
                requested_pages,
                total_pages,
            } => write!(
                f,
                "out of space: {requested_pages} contiguous pages requested, store holds {total_pages}"
            ),
            Error::PageRange {
                start_page,
                num_pages,
                total_pages,
            } => write!(
                f,
                "page range {start_page}..{} exceeds store of {total_pages} pages",
                start_page + num_pages
            ),
            Error::InvalidCommand(msg) => write!(f, "invalid command: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

/// Crate-wide result type returning [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_key() {
        let err = Error::NotFound("user:1".to_string());

        assert_eq!(err.to_string(), "key 'user:1' not found");
    }

    #[test]
    fn display_out_of_space_shows_request() {
        let err = Error::OutOfSpace {
            requested_pages: 30,
            total_pages: 100,
        };

        let text = err.to_string();
        assert!(text.contains("30"));
        assert!(text.contains("100"));
    }

    #[test]
    fn display_page_range_shows_end() {
        let err = Error::PageRange {
            start_page: 90,
            num_pages: 20,
            total_pages: 100,
        };

        assert!(err.to_string().contains("90..110"));
    }
}
