//! HTTP byte-range codec
//!
//! Builds `Range` request header values and parses `Content-Range`
//! response headers of the forms `bytes <start>-<end>/<total>` and
//! `bytes */<total>`.

use crate::error::ContentRangeError;
use std::fmt;
use std::str::FromStr;

/// A byte range to request from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRequest {
    /// Inclusive absolute span; the server clamps `end` to the file size
    Span {
        /// First byte
        start: u64,
        /// Last byte (inclusive)
        end: u64,
    },
    /// Trailing `len` bytes of the file
    Suffix {
        /// Number of bytes from the end
        len: u64,
    },
}

impl RangeRequest {
    /// Create inclusive span request
    #[inline]
    #[must_use]
    pub fn span(start: u64, end: u64) -> Self {
        Self::Span { start, end }
    }

    /// Create suffix request (`bytes=-len`)
    #[inline]
    #[must_use]
    pub fn suffix(len: u64) -> Self {
        Self::Suffix { len }
    }

    /// Absolute start, if known before the response
    #[inline]
    #[must_use]
    pub fn start(&self) -> Option<u64> {
        match self {
            Self::Span { start, .. } => Some(*start),
            Self::Suffix { .. } => None,
        }
    }

    /// Value for the `Range` request header
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={self}")
    }
}

impl fmt::Display for RangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Span { start, end } => write!(f, "{start}-{end}"),
            Self::Suffix { len } => write!(f, "-{len}"),
        }
    }
}

/// Parsed `Content-Range` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRange {
    /// `bytes <start>-<end>/<total>`
    Partial {
        /// First byte served
        start: u64,
        /// Last byte served (inclusive)
        end: u64,
        /// Complete file length
        total: u64,
    },
    /// `bytes */<total>`: nothing could be served
    Unsatisfied {
        /// Complete file length
        total: u64,
    },
}

impl ContentRange {
    /// Complete file length reported by the server
    #[inline]
    #[must_use]
    pub fn total(&self) -> u64 {
        match self {
            Self::Partial { total, .. } | Self::Unsatisfied { total } => *total,
        }
    }

    /// Number of bytes covered by the span
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Partial { start, end, .. } => end - start + 1,
            Self::Unsatisfied { .. } => 0,
        }
    }

    /// Whether the header describes no bytes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for ContentRange {
    type Err = ContentRangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || ContentRangeError::Malformed(value.to_string());

        let value_trimmed = value.trim();
        let (unit, rest) = value_trimmed.split_once(' ').ok_or_else(malformed)?;
        if !unit.eq_ignore_ascii_case("bytes") {
            return Err(ContentRangeError::UnsupportedUnit(value.to_string()));
        }
        let (span, total) = rest.trim().split_once('/').ok_or_else(malformed)?;

        let total = match total.trim() {
            "*" => return Err(ContentRangeError::UnknownTotal),
            t => t.parse::<u64>().map_err(|_| malformed())?,
        };

        let span = span.trim();
        if span == "*" {
            return Ok(Self::Unsatisfied { total });
        }

        let (start, end) = span.split_once('-').ok_or_else(malformed)?;
        let start = start.trim().parse::<u64>().map_err(|_| malformed())?;
        let end = end.trim().parse::<u64>().map_err(|_| malformed())?;
        if end < start || end >= total {
            return Err(ContentRangeError::InvalidSpan { start, end, total });
        }

        Ok(Self::Partial { start, end, total })
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial { start, end, total } => write!(f, "bytes {start}-{end}/{total}"),
            Self::Unsatisfied { total } => write!(f, "bytes */{total}"),
        }
    }
}
