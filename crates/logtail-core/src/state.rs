//! Tail state
//!
//! [`TailState`] is an immutable snapshot of the buffered window of a
//! remote log. Every transition builds a new value; observers receive
//! the whole snapshot.

use crate::error::{ErrorKind, FetchError};
use crate::range::RangeRequest;
use std::ops::Range;
use std::time::Duration;

/// Details of the last failed fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Failure classification
    pub kind: ErrorKind,
    /// HTTP status, when a response arrived
    pub status: Option<u16>,
    /// Human-readable cause
    pub message: String,
    /// Range that was requested
    pub request: RangeRequest,
    /// Time from request to failure
    pub latency: Duration,
}

impl LastError {
    /// Capture a fetch failure
    #[must_use]
    pub fn new(error: &FetchError, request: RangeRequest, latency: Duration) -> Self {
        Self {
            kind: error.kind(),
            status: error.status(),
            message: error.to_string(),
            request,
            latency,
        }
    }
}

/// Snapshot of a tailed log
///
/// Invariants:
/// - `bytes` is exactly the span `[byte_offset, byte_offset + bytes.len())`
/// - `byte_offset <= str_offset`, and `str_offset == 0` when `byte_offset == 0`
/// - `string` is the text of `bytes` from `str_offset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailState {
    /// Absolute offset of the first buffered byte; `None` until loaded
    pub byte_offset: Option<u64>,
    /// Absolute offset of the first byte of `string`
    pub str_offset: Option<u64>,
    /// Buffered contiguous window
    pub bytes: Vec<u8>,
    /// Decoded text from the first full line
    pub string: Option<String>,
    /// Last known file length
    pub total: u64,
    /// True until the first chunk (or empty-file report) lands
    pub loading: bool,
    /// Whether the controller keeps polling for new data
    pub follow: bool,
    /// Last failure, cleared on the next success
    pub error: Option<LastError>,
    /// Buffer holds bytes that are not valid UTF-8
    pub decode_error: bool,
}

impl TailState {
    /// Create empty state (nothing loaded yet)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            byte_offset: None,
            str_offset: None,
            bytes: Vec::new(),
            string: None,
            total: 0,
            loading: true,
            follow: false,
            error: None,
            decode_error: false,
        }
    }

    /// Whether a buffer is held
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.byte_offset.is_some()
    }

    /// Absolute offset one past the last buffered byte
    #[inline]
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.byte_offset.map(|start| start + self.bytes.len() as u64)
    }

    /// Buffered absolute span
    #[inline]
    #[must_use]
    pub fn span(&self) -> Option<Range<u64>> {
        self.byte_offset.zip(self.end()).map(|(start, end)| start..end)
    }

    /// The `error` flag: a failure is currently annotated
    #[inline]
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Decoded text, or empty if there is none
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        self.string.as_deref().unwrap_or("")
    }

    /// Whether the buffer reaches the last known end of file
    #[inline]
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.end().is_some_and(|end| end >= self.total)
    }

    /// Copy with follow mode changed; buffer untouched
    #[inline]
    #[must_use]
    pub fn with_follow(&self, follow: bool) -> Self {
        Self {
            follow,
            ..self.clone()
        }
    }

    /// Copy annotated with a failure; buffer and `loading` untouched
    #[inline]
    #[must_use]
    pub fn with_error(&self, error: LastError) -> Self {
        Self {
            error: Some(error),
            ..self.clone()
        }
    }

    /// Reset to an empty buffer after the server reported `bytes */<total>`
    ///
    /// Not an error: the error annotation is cleared.
    #[must_use]
    pub fn emptied(&self, total: u64) -> Self {
        Self {
            total,
            loading: false,
            follow: self.follow,
            ..Self::new()
        }
    }
}

impl Default for TailState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_unloaded() {
        let state = TailState::new();
        assert!(state.loading);
        assert!(!state.is_loaded());
        assert_eq!(state.end(), None);
        assert_eq!(state.span(), None);
        assert_eq!(state.text(), "");
        assert!(!state.has_error());
    }

    #[test]
    fn span_follows_buffer() {
        let state = TailState {
            byte_offset: Some(100),
            bytes: vec![0; 50],
            total: 150,
            ..TailState::new()
        };
        assert_eq!(state.span(), Some(100..150));
        assert!(state.at_end());
    }

    #[test]
    fn emptied_keeps_follow_and_clears_error() {
        let err = LastError::new(
            &FetchError::Status(500),
            RangeRequest::suffix(10),
            Duration::from_millis(3),
        );
        let state = TailState {
            byte_offset: Some(10),
            bytes: b"abc".to_vec(),
            follow: true,
            ..TailState::new()
        }
        .with_error(err);

        let emptied = state.emptied(0);
        assert!(emptied.follow);
        assert!(!emptied.has_error());
        assert!(!emptied.loading);
        assert!(emptied.bytes.is_empty());
        assert_eq!(emptied.byte_offset, None);
    }

    #[test]
    fn failed_first_load_keeps_loading() {
        let err = LastError::new(
            &FetchError::transport("refused"),
            RangeRequest::suffix(10),
            Duration::ZERO,
        );
        let state = TailState::new().with_error(err);
        assert!(state.loading);
        assert!(state.has_error());
        assert!(!state.is_loaded());
    }

    #[test]
    fn last_error_captures_status() {
        let err = LastError::new(
            &FetchError::Status(404),
            RangeRequest::span(0, 10),
            Duration::from_millis(12),
        );
        assert_eq!(err.kind, ErrorKind::Protocol);
        assert_eq!(err.status, Some(404));
        assert_eq!(err.request, RangeRequest::span(0, 10));
    }
}
