//! In-memory auth backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use roster_core::capability::{AuthEvents, AuthGateway, AuthStateFanout};
use roster_core::error::{Result, RosterError};
use roster_core::identity::Identity;

struct Account {
    uid: String,
    password: String,
}

/// In-process email/password auth backend.
///
/// Mirrors the remote provider's observable behavior, including its error
/// codes, so callers cannot tell the difference through the
/// [`AuthGateway`] contract. Registering an account signs it in, as the
/// remote provider does.
#[derive(Default)]
pub struct MemoryAuthGateway {
    accounts: Mutex<HashMap<String, Account>>,
    fanout: AuthStateFanout,
}

impl MemoryAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthGateway for MemoryAuthGateway {
    fn subscribe(&self) -> AuthEvents {
        self.fanout.subscribe()
    }

    async fn register(&self, email: &str, password: &str) -> Result<Identity> {
        if !email.contains('@') {
            return Err(RosterError::auth("INVALID_EMAIL"));
        }
        if password.len() < 6 {
            return Err(RosterError::auth(
                "WEAK_PASSWORD : Password should be at least 6 characters",
            ));
        }

        let identity = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(RosterError::auth("EMAIL_EXISTS"));
            }

            let uid = uuid::Uuid::new_v4().to_string();
            accounts.insert(
                email.to_string(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                },
            );
            Identity::new(uid, Some(email.to_string()))
        };

        tracing::info!("[MemoryAuth] Registered account for {}", email);
        self.fanout.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let identity = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => {
                    Identity::new(account.uid.clone(), Some(email.to_string()))
                }
                _ => return Err(RosterError::auth("INVALID_LOGIN_CREDENTIALS")),
            }
        };

        tracing::info!("[MemoryAuth] Signed in {}", email);
        self.fanout.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        tracing::info!("[MemoryAuth] Signed out");
        self.fanout.publish(None);
        Ok(())
    }
}
