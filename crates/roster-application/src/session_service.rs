//! Session manager implementation.
//!
//! `SessionService` owns the derived session state. All identity transitions
//! funnel through the single auth-event listener: `login`, `register`, and
//! `logout` only delegate to the auth capability and never touch the state
//! or the cache themselves, so the published state and the cached profile
//! can never diverge from the capability's own view.

use std::sync::{Arc, Mutex};

use roster_core::capability::{AuthGateway, ProfileCache};
use roster_core::error::{Result, RosterError};
use roster_core::identity::Identity;
use roster_core::session_state::SessionState;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Manages the authentication session lifecycle.
///
/// `SessionService` is responsible for:
/// - Listening to the auth capability's state transitions
/// - Mirroring the signed-in identity into the local profile cache
/// - Publishing the derived [`SessionState`] to observers
/// - Delegating `login`/`register`/`logout` to the auth capability
pub struct SessionService {
    auth: Arc<dyn AuthGateway>,
    cache: Arc<dyn ProfileCache>,
    cache_key: String,
    state: Arc<watch::Sender<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionService {
    /// Creates a new `SessionService`.
    ///
    /// The published state starts as [`SessionState::Initializing`] and
    /// stays there until [`SessionService::start`] has been called and the
    /// capability reports its first state.
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        cache: Arc<dyn ProfileCache>,
        cache_key: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            auth,
            cache,
            cache_key: cache_key.into(),
            state: Arc::new(state),
            listener: Mutex::new(None),
        }
    }

    /// Attaches the listener to the auth capability's event stream.
    ///
    /// The first event moves the state out of `Initializing` exactly once;
    /// the state never reverts to `Initializing` afterwards. Calling
    /// `start` again is a no-op.
    pub fn start(&self) {
        let mut listener = self.listener.lock().unwrap();
        if listener.is_some() {
            tracing::warn!("[SessionService] Listener already running, skipping");
            return;
        }

        let mut events = self.auth.subscribe();
        let cache = Arc::clone(&self.cache);
        let cache_key = self.cache_key.clone();
        let state = Arc::clone(&self.state);

        *listener = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    Some(identity) => {
                        // Cache before publishing, so an observer of
                        // `Authenticated` always finds the cache populated.
                        match serde_json::to_string(&identity) {
                            Ok(json) => cache.set(&cache_key, &json),
                            Err(e) => tracing::warn!(
                                "[SessionService] Failed to serialize cached identity: {}",
                                e
                            ),
                        }
                        tracing::info!(
                            "[SessionService] Signed in as {}",
                            identity.display_email()
                        );
                        state.send_replace(SessionState::Authenticated(identity));
                    }
                    None => {
                        cache.remove(&cache_key);
                        tracing::info!("[SessionService] Signed out");
                        state.send_replace(SessionState::Unauthenticated);
                    }
                }
            }
            tracing::debug!("[SessionService] Auth event stream ended");
        }));
    }

    /// Returns a receiver for session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Returns the current session state.
    pub fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// True until the auth capability reports its first state.
    pub fn initializing(&self) -> bool {
        self.state.borrow().is_initializing()
    }

    /// Reads the cached identity for optimistic cold-start display.
    ///
    /// An unreadable cache entry is treated as absent.
    pub fn cached_identity(&self) -> Option<Identity> {
        let json = self.cache.get(&self.cache_key)?;
        match serde_json::from_str(&json) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!("[SessionService] Ignoring unreadable cached identity: {}", e);
                None
            }
        }
    }

    /// Signs in an existing account.
    ///
    /// The resulting state transition arrives through the auth listener,
    /// not from this call.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty credentials, or the capability's
    /// failure verbatim. No state or cache mutation happens on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        Self::check_credentials(email, password)?;
        self.auth.sign_in(email, password).await
    }

    /// Creates a new account and signs it in.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty credentials, or the capability's
    /// failure verbatim. No state or cache mutation happens on failure.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity> {
        Self::check_credentials(email, password)?;
        self.auth.register(email, password).await
    }

    /// Signs out the current account.
    ///
    /// # Errors
    ///
    /// Returns the capability's failure verbatim; the cache is only cleared
    /// by the signed-out event, never on failure.
    pub async fn logout(&self) -> Result<()> {
        self.auth.sign_out().await
    }

    fn check_credentials(email: &str, password: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(RosterError::validation("email"));
        }
        if password.is_empty() {
            return Err(RosterError::validation("password"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::config::PROFILE_CACHE_KEY;
    use roster_infrastructure::{MemoryAuthGateway, MemoryProfileCache};
    use std::time::Duration;
    use tokio::time::timeout;

    fn service() -> (SessionService, Arc<MemoryProfileCache>) {
        let auth = Arc::new(MemoryAuthGateway::new());
        let cache = Arc::new(MemoryProfileCache::new());
        let service = SessionService::new(auth, cache.clone(), PROFILE_CACHE_KEY);
        (service, cache)
    }

    async fn wait_for(
        rx: &mut watch::Receiver<SessionState>,
        pred: impl FnMut(&SessionState) -> bool,
    ) {
        timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .expect("timed out waiting for session state")
            .expect("state channel closed");
    }

    #[tokio::test]
    async fn test_initializing_flips_exactly_once() {
        let (service, _cache) = service();
        assert!(service.initializing());

        service.start();
        let mut states = service.subscribe();
        wait_for(&mut states, |s| !s.is_initializing()).await;
        assert!(!service.initializing());

        // Further transitions never revert to Initializing.
        service.register("a@x.com", "secret1").await.unwrap();
        wait_for(&mut states, |s| s.is_authenticated()).await;
        assert!(!service.initializing());

        service.logout().await.unwrap();
        wait_for(&mut states, |s| *s == SessionState::Unauthenticated).await;
        assert!(!service.initializing());
    }

    #[tokio::test]
    async fn test_cache_mirrors_auth_events() {
        let (service, cache) = service();
        service.start();
        let mut states = service.subscribe();

        let identity = service.register("a@x.com", "secret1").await.unwrap();
        wait_for(&mut states, |s| s.is_authenticated()).await;

        assert_eq!(service.cached_identity().unwrap(), identity);
        assert_eq!(
            cache.get(PROFILE_CACHE_KEY).unwrap(),
            serde_json::to_string(&identity).unwrap()
        );

        service.logout().await.unwrap();
        wait_for(&mut states, |s| *s == SessionState::Unauthenticated).await;
        assert!(cache.get(PROFILE_CACHE_KEY).is_none());
        assert!(service.cached_identity().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_mutates_nothing() {
        let (service, cache) = service();
        service.start();
        let mut states = service.subscribe();

        service.register("a@x.com", "secret1").await.unwrap();
        wait_for(&mut states, |s| s.is_authenticated()).await;
        service.logout().await.unwrap();
        wait_for(&mut states, |s| *s == SessionState::Unauthenticated).await;

        let err = service.login("a@x.com", "wrong").await.unwrap_err();
        assert_eq!(err, RosterError::auth("INVALID_LOGIN_CREDENTIALS"));
        assert_eq!(service.current_state(), SessionState::Unauthenticated);
        assert!(cache.get(PROFILE_CACHE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_locally() {
        let (service, _cache) = service();
        let err = service.login("", "secret1").await.unwrap_err();
        assert_eq!(err, RosterError::validation("email"));

        let err = service.register("a@x.com", "").await.unwrap_err();
        assert_eq!(err, RosterError::validation("password"));
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_is_ignored() {
        let (service, cache) = service();
        cache.set(PROFILE_CACHE_KEY, "not json");
        assert!(service.cached_identity().is_none());
    }
}
