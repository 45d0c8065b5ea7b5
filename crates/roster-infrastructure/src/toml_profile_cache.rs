//! File-backed profile cache implementation.
//!
//! This module persists the cached identity as a small TOML file and keeps
//! an in-memory copy to avoid repeated file I/O operations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use roster_core::capability::ProfileCache;
use roster_core::error::{Result, RosterError};
use serde::{Deserialize, Serialize};

/// On-disk shape of the cache file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheFile {
    /// RFC3339 timestamp of the last write.
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    entries: HashMap<String, String>,
}

/// Profile cache backed by a TOML file.
///
/// Reads happen against the cached in-memory copy; every mutation is written
/// through to disk. Cache writes are last-write-wins and a failed disk write
/// is logged rather than surfaced, matching the best-effort contract of the
/// cache capability.
pub struct TomlProfileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl TomlProfileCache {
    /// Opens (or initializes) a cache file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = Self::load(&path)?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens the cache at its default location, `<config dir>/roster/profile.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be resolved
    /// or an existing file cannot be read or parsed.
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RosterError::cache("Cannot find config directory"))?;
        Self::new(config_dir.join("roster").join("profile.toml"))
    }

    fn load(path: &Path) -> Result<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let file: CacheFile = toml::from_str(&content)?;
        Ok(file.entries)
    }

    /// Writes the current entries through to disk. Best-effort: failures are
    /// logged and the in-memory state stays authoritative for this process.
    fn persist(&self, entries: &HashMap<String, String>) {
        let file = CacheFile {
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
            entries: entries.clone(),
        };

        let result = toml::to_string_pretty(&file)
            .map_err(RosterError::from)
            .and_then(|content| {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&self.path, content)?;
                Ok(())
            });

        if let Err(e) = result {
            tracing::warn!(
                "[TomlProfileCache] Failed to persist cache to {:?}: {}",
                self.path,
                e
            );
        }
    }
}

impl ProfileCache for TomlProfileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = TomlProfileCache::new(temp_dir.path().join("profile.toml")).unwrap();

        assert!(cache.get("user.profile").is_none());

        cache.set("user.profile", r#"{"uid":"u1"}"#);
        assert_eq!(cache.get("user.profile").unwrap(), r#"{"uid":"u1"}"#);

        cache.remove("user.profile");
        assert!(cache.get("user.profile").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let temp_dir = TempDir::new().unwrap();
        let cache = TomlProfileCache::new(temp_dir.path().join("profile.toml")).unwrap();

        cache.set("user.profile", "first");
        cache.set("user.profile", "second");
        assert_eq!(cache.get("user.profile").unwrap(), "second");
    }

    #[test]
    fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("profile.toml");

        {
            let cache = TomlProfileCache::new(&path).unwrap();
            cache.set("user.profile", r#"{"uid":"u1","email":"a@x.com"}"#);
        }

        let reopened = TomlProfileCache::new(&path).unwrap();
        assert_eq!(
            reopened.get("user.profile").unwrap(),
            r#"{"uid":"u1","email":"a@x.com"}"#
        );
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = TomlProfileCache::new(temp_dir.path().join("nope.toml")).unwrap();
        assert!(cache.get("user.profile").is_none());
    }
}
