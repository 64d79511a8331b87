//! Error types for logtail core
//!
//! Provides error handling for:
//! - `Content-Range` header parsing
//! - Range fetches (transport, protocol, empty file)
//! - Configuration loading
//! - Deployment index parsing

use std::path::PathBuf;

/// Errors while parsing a `Content-Range` response header
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentRangeError {
    /// Header absent from a partial-content response
    #[error("missing content-range header")]
    Missing,

    /// Header value is not visible ASCII
    #[error("content-range header is not valid ascii")]
    NotAscii,

    /// Range unit other than `bytes`
    #[error("unsupported range unit in '{0}'")]
    UnsupportedUnit(String),

    /// Structurally invalid header
    #[error("malformed content-range '{0}'")]
    Malformed(String),

    /// Complete length reported as `*`
    #[error("content-range total length is unknown")]
    UnknownTotal,

    /// Span is reversed or reaches past the reported total
    #[error("invalid span {start}-{end}/{total}")]
    InvalidSpan { start: u64, end: u64, total: u64 },
}

/// Errors produced by a single range fetch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network failure before a response was available
    #[error("transport error: {0}")]
    Transport(String),

    /// Request was aborted before completion
    ///
    /// Only fetchers that observe cancellation themselves return this.
    /// The controller cancels by dropping the fetch future, so
    /// `HttpRangeFetcher` never produces it.
    #[error("request aborted")]
    Aborted,

    /// Response status other than 206 Partial Content
    #[error("unexpected status {0}, expected 206 partial content")]
    Status(u16),

    /// Missing or malformed `Content-Range`
    #[error("bad content-range: {0}")]
    ContentRange(#[from] ContentRangeError),

    /// Server reported `bytes */<total>`: nothing to serve for the range
    #[error("empty file (total {total})")]
    EmptyFile { total: u64 },
}

/// Coarse classification of a fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network failure or abort
    Transport,
    /// Unexpected status or bad headers
    Protocol,
    /// Empty (or truncated) file; a normal state, not an error badge
    EmptyFile,
}

impl FetchError {
    /// Create transport error from any displayable cause
    #[inline]
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }

    /// Classify this error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Aborted => ErrorKind::Transport,
            Self::Status(_) | Self::ContentRange(_) => ErrorKind::Protocol,
            Self::EmptyFile { .. } => ErrorKind::EmptyFile,
        }
    }

    /// Whether this is a state transition rather than a failure
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyFile { .. })
    }

    /// HTTP status associated with the failure, if any
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error while reading a config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid value
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors for a single deployment index line
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Line is not valid JSON
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON does not have the expected record shape
    #[error("unexpected record shape: {0}")]
    Shape(String),
}

impl IndexError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::Shape(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_kinds() {
        assert_eq!(FetchError::transport("reset").kind(), ErrorKind::Transport);
        assert_eq!(FetchError::Aborted.kind(), ErrorKind::Transport);
        assert_eq!(FetchError::Status(404).kind(), ErrorKind::Protocol);
        assert_eq!(
            FetchError::from(ContentRangeError::Missing).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(FetchError::EmptyFile { total: 0 }.kind(), ErrorKind::EmptyFile);
    }

    #[test]
    fn only_empty_file_is_recoverable() {
        assert!(FetchError::EmptyFile { total: 0 }.is_recoverable());
        assert!(!FetchError::Status(500).is_recoverable());
        assert!(!FetchError::Aborted.is_recoverable());
    }

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Status(200);
        assert_eq!(
            err.to_string(),
            "unexpected status 200, expected 206 partial content"
        );
        assert_eq!(err.status(), Some(200));

        let err = FetchError::from(ContentRangeError::Malformed("bytes x".into()));
        assert!(err.to_string().contains("malformed content-range"));
        assert_eq!(err.status(), None);
    }
}
