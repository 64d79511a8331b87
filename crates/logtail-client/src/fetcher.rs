//! HTTP range fetcher
//!
//! Issues `GET` with a `Range` header and accepts only `206 Partial
//! Content`. A `416` carrying `bytes */<total>` is reported as an empty
//! file. No retries.

use logtail_core::error::{ContentRangeError, FetchError};
use logtail_core::{Chunk, ContentRange, RangeFetcher, RangeRequest, TailConfig};
use reqwest::header::{HeaderMap, CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, trace};

/// reqwest-backed [`RangeFetcher`]
#[derive(Debug, Clone)]
pub struct HttpRangeFetcher {
    client: reqwest::Client,
}

impl HttpRangeFetcher {
    /// Create fetcher with an optional per-request timeout
    ///
    /// # Errors
    /// `FetchError::Transport` if the HTTP client cannot be built
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::transport)?;
        Ok(Self { client })
    }

    /// Create fetcher using the configured request timeout
    ///
    /// # Errors
    /// As [`HttpRangeFetcher::new`]
    pub fn from_config(config: &TailConfig) -> Result<Self, FetchError> {
        Self::new(config.request_timeout())
    }

    /// Wrap an existing client
    #[inline]
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn content_range(headers: &HeaderMap) -> Result<ContentRange, ContentRangeError> {
    headers
        .get(CONTENT_RANGE)
        .ok_or(ContentRangeError::Missing)?
        .to_str()
        .map_err(|_| ContentRangeError::NotAscii)?
        .parse()
}

#[async_trait::async_trait]
impl RangeFetcher for HttpRangeFetcher {
    async fn fetch(&self, url: &str, range: RangeRequest) -> Result<Chunk, FetchError> {
        let response = self
            .client
            .get(url)
            .header(RANGE, range.header_value())
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = response.status();
        trace!(%url, %range, %status, "range response");

        match status {
            StatusCode::PARTIAL_CONTENT => match content_range(response.headers())? {
                ContentRange::Partial { start, end, total } => {
                    let body = response.bytes().await.map_err(FetchError::transport)?;
                    let expected = end - start + 1;
                    if body.len() as u64 != expected {
                        debug!(
                            %url,
                            expected,
                            actual = body.len(),
                            "body length differs from content-range"
                        );
                    }
                    Ok(Chunk::new(start, body.to_vec(), total))
                }
                ContentRange::Unsatisfied { total } => Err(FetchError::EmptyFile { total }),
            },
            StatusCode::RANGE_NOT_SATISFIABLE => match content_range(response.headers()) {
                Ok(ContentRange::Unsatisfied { total }) => Err(FetchError::EmptyFile { total }),
                _ => Err(FetchError::Status(status.as_u16())),
            },
            other => Err(FetchError::Status(other.as_u16())),
        }
    }
}
