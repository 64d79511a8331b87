//! URL query seam
//!
//! The query string is shared with the user and browser navigation;
//! implementations are written to, never assumed exclusive.

/// Key/value view of a URL query string
pub trait QueryStore: Send + Sync {
    /// Current value of `key`
    fn get(&self, key: &str) -> Option<String>;

    /// Set `key` to `value`, replacing any previous value
    fn set(&self, key: &str, value: &str);

    /// Remove `key`
    fn remove(&self, key: &str);
}
