//! Offset query binding
//!
//! Mirrors the read position into a query parameter so a reload resumes
//! near the same place.

use logtail_core::{QueryStore, TailState};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Reads and writes the offset query parameter
#[derive(Clone)]
pub struct OffsetQueryBinder {
    store: Arc<dyn QueryStore>,
    param: String,
}

impl OffsetQueryBinder {
    /// Bind `param` in `store`
    #[must_use]
    pub fn new(store: Arc<dyn QueryStore>, param: impl Into<String>) -> Self {
        Self {
            store,
            param: param.into(),
        }
    }

    /// Parameter name
    #[inline]
    #[must_use]
    pub fn param(&self) -> &str {
        &self.param
    }

    /// Offset stored in the query, if present and numeric
    #[must_use]
    pub fn initial_offset(&self) -> Option<u64> {
        let raw = self.store.get(&self.param)?;
        match raw.trim().parse() {
            Ok(offset) => Some(offset),
            Err(_) => {
                debug!(param = %self.param, value = %raw, "ignoring non-numeric offset");
                None
            }
        }
    }

    /// Write the buffer start of `state`
    ///
    /// Written on every call; the store may have been changed by someone
    /// else in between.
    pub fn record(&self, state: &TailState) {
        if let Some(offset) = state.byte_offset {
            self.store.set(&self.param, &offset.to_string());
        }
    }

    /// Remove the parameter
    pub fn clear(&self) {
        self.store.remove(&self.param);
    }
}

impl std::fmt::Debug for OffsetQueryBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetQueryBinder")
            .field("param", &self.param)
            .finish_non_exhaustive()
    }
}

/// Query store held in memory
#[derive(Debug, Default)]
pub struct MemoryQueryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryQueryStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one pair
    #[must_use]
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.set(key, value);
        store
    }
}

impl QueryStore for MemoryQueryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

/// Query store backed by the query string of a URL
#[derive(Debug)]
pub struct UrlQueryStore {
    url: Mutex<Url>,
}

impl UrlQueryStore {
    /// Wrap `url`
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
        }
    }

    /// Current URL
    #[must_use]
    pub fn url(&self) -> Url {
        self.url.lock().clone()
    }

    fn rewrite(&self, key: &str, value: Option<&str>) {
        let mut url = self.url.lock();
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if let Some(value) = value {
            pairs.push((key.to_owned(), value.to_owned()));
        }
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }
}

impl QueryStore for UrlQueryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.url
            .lock()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn set(&self, key: &str, value: &str) {
        self.rewrite(key, Some(value));
    }

    fn remove(&self, key: &str) {
        self.rewrite(key, None);
    }
}
