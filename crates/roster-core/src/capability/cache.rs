//! Local key-value cache capability trait.

/// A synchronous, string-valued key-value store for the local profile cache.
///
/// Semantics are deliberately minimal: last-write-wins, no expiry, no
/// transactions. In practice a single fixed key is used, written exclusively
/// by the session manager.
pub trait ProfileCache: Send + Sync {
    /// Returns the stored value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Removes `key` if present.
    fn remove(&self, key: &str);
}
