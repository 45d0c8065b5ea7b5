use serde::{Deserialize, Serialize};

/// Storage key for the cached identity. Single fixed key, written only by
/// the session manager.
pub const PROFILE_CACHE_KEY: &str = "user.profile";

/// Default remote collection holding the student records.
pub const DEFAULT_COLLECTION: &str = "students";

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_profile_cache_key() -> String {
    PROFILE_CACHE_KEY.to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

/// Application-level configuration shared by all components.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RosterConfig {
    /// Remote collection name for student records.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Key the cached identity is stored under.
    #[serde(default = "default_profile_cache_key")]
    pub profile_cache_key: String,
    /// Poll interval for snapshot listeners that poll rather than stream.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            profile_cache_key: default_profile_cache_key(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}
