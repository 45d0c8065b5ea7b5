//! REST auth gateway.
//!
//! Talks to an Identity-Toolkit compatible endpoint for email/password
//! sign-up and sign-in. The gateway owns the current auth state: every
//! successful credential operation (and sign-out, which is purely
//! client-side in this protocol) is announced through the shared fan-out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use roster_core::capability::{AuthEvents, AuthGateway, AuthStateFanout};
use roster_core::error::{Result, RosterError};
use roster_core::identity::Identity;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Auth gateway over the Identity-Toolkit REST protocol.
pub struct RestAuthGateway {
    client: Client,
    config: BackendConfig,
    fanout: AuthStateFanout,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl RestAuthGateway {
    /// Creates a gateway with the given backend configuration.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            fanout: AuthStateFanout::new(),
        }
    }

    /// Creates a gateway configured from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if required variables are missing.
    pub fn try_from_env() -> Result<Self> {
        Ok(Self::new(BackendConfig::try_from_env()?))
    }

    /// Runs one credential operation (`signUp` or `signInWithPassword`).
    async fn credentials_call(&self, operation: &str, email: &str, password: &str) -> Result<Identity> {
        let url = format!(
            "{}/v1/accounts:{}?key={}",
            self.config.auth_url, operation, self.config.api_key
        );
        let body = CredentialsRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RosterError::auth(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            // The endpoint reports failures as a structured error whose
            // message is the stable code (EMAIL_EXISTS, ...). Surface that
            // message verbatim.
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}: {text}"));
            return Err(RosterError::auth(message));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| RosterError::auth(format!("Malformed auth response: {e}")))?;

        let identity = Identity::new(auth.local_id, auth.email);
        tracing::info!(
            "[RestAuth] {} succeeded for {}",
            operation,
            identity.display_email()
        );
        self.fanout.publish(Some(identity.clone()));
        Ok(identity)
    }
}

#[async_trait]
impl AuthGateway for RestAuthGateway {
    fn subscribe(&self) -> AuthEvents {
        self.fanout.subscribe()
    }

    async fn register(&self, email: &str, password: &str) -> Result<Identity> {
        self.credentials_call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        self.credentials_call("signInWithPassword", email, password).await
    }

    async fn sign_out(&self) -> Result<()> {
        // No server round-trip: the protocol keeps no server-side session.
        tracing::info!("[RestAuth] Signed out");
        self.fanout.publish(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "EMAIL_EXISTS");
    }

    #[test]
    fn test_auth_response_parsing_without_email() {
        let body = r#"{"localId":"u1","idToken":"t"}"#;
        let parsed: AuthResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.local_id, "u1");
        assert!(parsed.email.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_is_announced_without_network() {
        let gateway = RestAuthGateway::new(BackendConfig::new("key", "demo"));
        let mut events = gateway.subscribe();
        assert!(events.recv().await.unwrap().is_none());

        gateway.sign_out().await.unwrap();
        assert!(events.recv().await.unwrap().is_none());
    }
}
