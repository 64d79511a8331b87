//! Tailing configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default bytes per range request
pub const DEFAULT_CHUNK_SIZE: u64 = 16_384;
/// Default follow-mode poll delay
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
/// Default auto-scroll batching delay (one animation frame)
pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 16;
/// Default HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default query parameter mirrored by the offset binder
pub const DEFAULT_OFFSET_PARAM: &str = "offset";

/// Tail controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// Bytes per range request
    pub chunk_size: u64,
    /// Delay between polls while following
    pub poll_interval_ms: u64,
    /// Delay before auto-scrolling after new data
    pub scroll_settle_ms: u64,
    /// HTTP request timeout; 0 disables it
    pub request_timeout_ms: u64,
    /// Start in follow mode
    pub follow: bool,
    /// Query parameter holding the read offset
    pub offset_param: String,
}

impl TailConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With chunk size
    #[inline]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// With poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self
    }

    /// With scroll settle delay
    #[inline]
    #[must_use]
    pub fn with_scroll_settle(mut self, delay: Duration) -> Self {
        self.scroll_settle_ms = duration_ms(delay);
        self
    }

    /// With initial follow mode
    #[inline]
    #[must_use]
    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    /// Poll interval as a duration
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Scroll settle delay as a duration
    #[inline]
    #[must_use]
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    /// Request timeout, if enabled
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` for a zero chunk size or empty offset param
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        if self.offset_param.is_empty() {
            return Err(ConfigError::Invalid("offset_param must not be empty".into()));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `ConfigError::Parse` or `ConfigError::Invalid`
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`TailConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            scroll_settle_ms: DEFAULT_SCROLL_SETTLE_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            follow: false,
            offset_param: DEFAULT_OFFSET_PARAM.to_string(),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
