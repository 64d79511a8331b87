//! Range fetch seam
//!
//! A [`RangeFetcher`] issues exactly one range request and reports the
//! chunk it got back. Retry and polling policy live in the controller.

use crate::error::FetchError;
use crate::range::RangeRequest;

/// One range response: raw bytes at an absolute offset plus the file
/// size at response time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Absolute offset of `bytes[0]`
    pub offset: u64,
    /// Raw bytes served
    pub bytes: Vec<u8>,
    /// Complete file length reported by the server
    pub total: u64,
}

impl Chunk {
    /// Create new chunk
    #[inline]
    #[must_use]
    pub fn new(offset: u64, bytes: impl Into<Vec<u8>>, total: u64) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
            total,
        }
    }

    /// Number of bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the chunk carries no bytes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Absolute offset one past the last byte
    #[inline]
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }
}

/// Issues a single range request against a URL
///
/// Implementations must not retry. Dropping the returned future must
/// abort the request.
#[async_trait::async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Fetch `range` from `url`
    ///
    /// # Errors
    /// - `FetchError::Transport` on network failure
    /// - `FetchError::Status` on a non-206 response
    /// - `FetchError::ContentRange` on a missing or malformed header
    /// - `FetchError::EmptyFile` when the server reports `bytes */<total>`
    async fn fetch(&self, url: &str, range: RangeRequest) -> Result<Chunk, FetchError>;
}
