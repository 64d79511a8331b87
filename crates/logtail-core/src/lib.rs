//! logtail core - incremental tailing of remote append-only logs
//!
//! Pure building blocks for reading a growing log over HTTP range
//! requests:
//! - `Range` / `Content-Range` header codec
//! - Chunk merging into a contiguous, line-aligned buffer
//! - Next-range resolution (forward growth, load previous, skip to end)
//! - Immutable [`TailState`] snapshots
//! - Port traits for the fetcher, the scroll viewport and the URL query
//! - The deployment log index model
//!
//! # Example
//!
//! ```rust
//! use logtail_core::{merge, next_range, Chunk, RangeRequest, TailState};
//!
//! let state = TailState::new();
//! assert_eq!(next_range(&state, None, 100), RangeRequest::suffix(100));
//!
//! let state = merge(&state, &Chunk::new(37, b"...ial\nFULL LINE\n".to_vec(), 54));
//! assert_eq!(state.text(), "FULL LINE\n");
//! assert_eq!(state.str_offset, Some(44));
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod config;
pub mod directive;
pub mod error;
pub mod fetch;
pub mod index;
pub mod merge;
pub mod query;
pub mod range;
pub mod state;
pub mod viewport;

// Re-exports for convenience
pub use config::TailConfig;
pub use directive::{next_range, Directive};
pub use error::{ConfigError, ContentRangeError, ErrorKind, FetchError, IndexError};
pub use fetch::{Chunk, RangeFetcher};
pub use index::{
    filtered, parse_index, role_deployments, DeploymentTrail, IndexRecord, LogPointer, Marker,
    RoleFilter,
};
pub use merge::{line_start, merge, TextView};
pub use query::QueryStore;
pub use range::{ContentRange, RangeRequest};
pub use state::{LastError, TailState};
pub use viewport::{ScrollNotifier, ScrollSubscription, Viewport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with logtail core
    pub use crate::{
        merge, next_range, Chunk, Directive, FetchError, RangeFetcher, RangeRequest, TailConfig,
        TailState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Render an optional value, `?` when missing
///
/// Used for status lines such as `offset ?/total`.
#[must_use]
pub fn display_or_unknown<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn unknown_values_render_as_question_mark() {
        assert_eq!(display_or_unknown::<u64>(None), "?");
        assert_eq!(display_or_unknown(Some(42u64)), "42");
    }

    #[test]
    fn tail_growth_cycle() {
        let chunk_size = 8;
        let file = b"one\ntwo\nthree\nfour\n";
        let total = file.len() as u64;

        let state = TailState::new();
        let range = next_range(&state, None, chunk_size);
        assert_eq!(range, RangeRequest::suffix(8));

        let start = total - chunk_size;
        let state = merge(&state, &Chunk::new(start, file[start as usize..].to_vec(), total));
        assert_eq!(state.text(), "four\n");

        let prev = Directive::load_previous(&state, chunk_size).unwrap();
        let range = next_range(&state, Some(prev), chunk_size);
        assert_eq!(range, RangeRequest::span(3, 10));

        let state = merge(&state, &Chunk::new(3, file[3..11].to_vec(), total));
        assert_eq!(state.byte_offset, Some(3));
        assert_eq!(state.text(), "two\nthree\nfour\n");
    }
}
