//! Resource bounds applied while decoding from a byte source that may not be trusted.
//!
//! Mirrors the teacher crate's `de::Config`: a [Reader](crate::reader::Reader) constructed with a
//! `Config` refuses to recurse or allocate past the configured limits, turning what would
//! otherwise be unbounded stack growth or memory allocation into an [crate::error::ErrorKind::Range]
//! error (spec §9 "Recursion on large collections").

/// Resource bounds for decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum nesting depth of complex values (collections/arrays/maps/user types). Exceeding
    /// this aborts decoding rather than growing the call stack without bound.
    pub max_nesting_depth: usize,
    /// Maximum element count accepted for any single collection/array/map header.
    pub max_collection_len: u32,
    /// Maximum byte length accepted for any single string or binary payload.
    pub max_string_len: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
            max_collection_len: 16 * 1024 * 1024,
            max_string_len: 64 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_max_collection_len(mut self, len: u32) -> Self {
        self.max_collection_len = len;
        self
    }

    pub fn with_max_string_len(mut self, len: u32) -> Self {
        self.max_string_len = len;
        self
    }
}
