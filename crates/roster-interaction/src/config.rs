//! Remote backend configuration.
//!
//! Configuration is read from environment variables; only the API key and
//! project ID are required, the endpoints default to the Google-hosted
//! services.

use std::env;
use std::time::Duration;

use roster_core::error::{Result, RosterError};

const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_STORE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Connection settings shared by the REST adapters.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the Identity-Toolkit compatible auth service.
    pub auth_url: String,
    /// Base URL of the Firestore compatible document service.
    pub store_url: String,
    /// API key appended to every request.
    pub api_key: String,
    /// Project the document database lives in.
    pub project_id: String,
    /// How often the snapshot listener polls the collection.
    pub poll_interval: Duration,
}

impl BackendConfig {
    /// Creates a configuration with the default hosted endpoints.
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            store_url: DEFAULT_STORE_URL.to_string(),
            api_key: api_key.into(),
            project_id: project_id.into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// `ROSTER_API_KEY` and `ROSTER_PROJECT_ID` are required;
    /// `ROSTER_AUTH_URL`, `ROSTER_STORE_URL`, and
    /// `ROSTER_POLL_INTERVAL_SECS` override the defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a required variable is missing.
    pub fn try_from_env() -> Result<Self> {
        let api_key = env::var("ROSTER_API_KEY")
            .map_err(|_| RosterError::config("ROSTER_API_KEY is not set"))?;
        let project_id = env::var("ROSTER_PROJECT_ID")
            .map_err(|_| RosterError::config("ROSTER_PROJECT_ID is not set"))?;

        let mut config = Self::new(api_key, project_id);
        if let Ok(auth_url) = env::var("ROSTER_AUTH_URL") {
            config.auth_url = auth_url;
        }
        if let Ok(store_url) = env::var("ROSTER_STORE_URL") {
            config.store_url = store_url;
        }
        if let Ok(secs) = env::var("ROSTER_POLL_INTERVAL_SECS") {
            match secs.parse() {
                Ok(secs) => config.poll_interval = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    "[BackendConfig] Ignoring invalid ROSTER_POLL_INTERVAL_SECS: {}",
                    secs
                ),
            }
        }

        tracing::info!(
            "[BackendConfig] Configured for project {} (auth: {}, store: {})",
            config.project_id,
            config.auth_url,
            config.store_url
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_hosted_defaults() {
        let config = BackendConfig::new("key", "demo-project");
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.store_url, DEFAULT_STORE_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }
}
