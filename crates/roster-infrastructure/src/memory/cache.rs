//! In-memory profile cache backend.

use std::collections::HashMap;
use std::sync::Mutex;

use roster_core::capability::ProfileCache;

/// Volatile profile cache for tests and local mode.
#[derive(Default)]
pub struct MemoryProfileCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryProfileCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileCache for MemoryProfileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}
