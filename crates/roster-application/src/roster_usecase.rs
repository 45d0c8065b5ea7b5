//! Roster use case: the session-to-subscription state machine.
//!
//! This module wires `SessionService`, `LiveQuery`, and `RecordGateway`
//! together and drives the lifecycle transitions: entering `Authenticated`
//! opens the live subscription, leaving it closes the subscription and
//! empties the list. The transitions live here, independent of any
//! rendering layer.

use std::sync::{Arc, Mutex};

use roster_core::capability::{AuthGateway, DocumentStore, ProfileCache};
use roster_core::config::RosterConfig;
use roster_core::error::{Result, RosterError};
use roster_core::identity::Identity;
use roster_core::record::RecordList;
use roster_core::session_state::SessionState;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::live_query::LiveQuery;
use crate::record_gateway::RecordGateway;
use crate::session_service::SessionService;

/// Coordinates the session lifecycle with the live record subscription.
///
/// `RosterUseCase` is the single entry point the presentation layer talks
/// to: it exposes the session state, the live record list, and the user
/// operations, and internally keeps the subscription's lifetime bounded by
/// the authenticated session.
pub struct RosterUseCase {
    session: Arc<SessionService>,
    live_query: Arc<LiveQuery>,
    gateway: RecordGateway,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl RosterUseCase {
    /// Creates a new `RosterUseCase` over the given capabilities.
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn ProfileCache>,
        config: RosterConfig,
    ) -> Self {
        let session = Arc::new(SessionService::new(
            auth,
            cache,
            config.profile_cache_key.clone(),
        ));
        let live_query = Arc::new(LiveQuery::new(
            Arc::clone(&store),
            config.collection.clone(),
        ));
        let gateway = RecordGateway::new(store, config.collection);

        Self {
            session,
            live_query,
            gateway,
            watcher: Mutex::new(None),
        }
    }

    /// Starts the session listener and the state machine watcher.
    ///
    /// Calling `start` again is a no-op.
    pub fn start(&self) {
        let mut watcher = self.watcher.lock().unwrap();
        if watcher.is_some() {
            tracing::warn!("[RosterUseCase] Already started, skipping");
            return;
        }

        // Subscribe before the listener starts so the very first auth
        // transition is observed as a change.
        let mut states = self.session.subscribe();
        self.session.start();

        let live_query = Arc::clone(&self.live_query);

        *watcher = Some(tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                match state {
                    SessionState::Authenticated(identity) => {
                        tracing::info!(
                            "[RosterUseCase] Session for {} active, opening subscription",
                            identity.display_email()
                        );
                        if let Err(e) = live_query.open().await {
                            tracing::error!(
                                "[RosterUseCase] Failed to open subscription: {}",
                                e
                            );
                        }
                    }
                    SessionState::Unauthenticated => {
                        tracing::info!("[RosterUseCase] Session ended, closing subscription");
                        live_query.close().await;
                    }
                    SessionState::Initializing => {}
                }
            }
            tracing::debug!("[RosterUseCase] Session state channel closed");
        }));
    }

    /// Stops the state machine watcher and closes any open subscription.
    pub async fn shutdown(&self) {
        let handle = self.watcher.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.live_query.close().await;
    }

    // ========================================================================
    // Observed state
    // ========================================================================

    /// Returns a receiver for session state changes.
    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Returns a receiver for record list changes.
    pub fn records(&self) -> watch::Receiver<RecordList> {
        self.live_query.records()
    }

    /// Returns a receiver for the live subscription's terminal error.
    pub fn stream_error(&self) -> watch::Receiver<Option<RosterError>> {
        self.live_query.last_error()
    }

    /// True until the auth capability reports its first state.
    pub fn initializing(&self) -> bool {
        self.session.initializing()
    }

    /// Reads the cached identity for optimistic cold-start display.
    pub fn cached_identity(&self) -> Option<Identity> {
        self.session.cached_identity()
    }

    // ========================================================================
    // User operations
    // ========================================================================

    /// Signs in an existing account.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        self.session.login(email, password).await
    }

    /// Creates a new account and signs it in.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity> {
        self.session.register(email, password).await
    }

    /// Signs out the current account.
    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }

    /// Validates and appends a new student record.
    pub async fn add_record(
        &self,
        name: &str,
        student_id: &str,
        department: &str,
    ) -> Result<String> {
        self.gateway.add_record(name, student_id, department).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::capability::ProfileCache;
    use roster_core::config::PROFILE_CACHE_KEY;
    use roster_infrastructure::{MemoryAuthGateway, MemoryDocumentStore, MemoryProfileCache};
    use serde_json::Map;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Fixture {
        usecase: RosterUseCase,
        store: Arc<MemoryDocumentStore>,
        cache: Arc<MemoryProfileCache>,
    }

    fn fixture() -> Fixture {
        let auth = Arc::new(MemoryAuthGateway::new());
        let store = Arc::new(MemoryDocumentStore::new());
        let cache = Arc::new(MemoryProfileCache::new());
        let usecase = RosterUseCase::new(
            auth,
            store.clone(),
            cache.clone(),
            RosterConfig::default(),
        );
        Fixture {
            usecase,
            store,
            cache,
        }
    }

    async fn wait<T: Clone + Send + Sync + 'static>(
        rx: &mut watch::Receiver<T>,
        pred: impl FnMut(&T) -> bool,
        what: &str,
    ) {
        timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
            .expect("watch channel closed");
    }

    #[tokio::test]
    async fn test_register_opens_subscription_with_empty_list() {
        let f = fixture();
        f.usecase.start();
        let mut states = f.usecase.session_state();

        let identity = f.usecase.register("a@x.com", "secret1").await.unwrap();
        assert_eq!(identity.email.as_deref(), Some("a@x.com"));

        wait(&mut states, |s| s.is_authenticated(), "authenticated state").await;
        assert!(!f.usecase.initializing());
        assert_eq!(f.usecase.cached_identity().unwrap(), identity);

        // The subscription's initial snapshot of an empty collection yields
        // an empty list.
        wait(
            &mut f.usecase.records(),
            |l| l.is_empty(),
            "initial empty snapshot",
        )
        .await;
    }

    #[tokio::test]
    async fn test_added_record_arrives_through_snapshot() {
        let f = fixture();
        f.usecase.start();
        let mut states = f.usecase.session_state();
        f.usecase.register("a@x.com", "secret1").await.unwrap();
        wait(&mut states, |s| s.is_authenticated(), "authenticated state").await;

        let id = f.usecase.add_record("Ada", "NIM001", "CS").await.unwrap();

        let mut records = f.usecase.records();
        wait(&mut records, |l| l.len() == 1, "snapshot with the record").await;

        let list = records.borrow().clone();
        let record = list.get(&id).unwrap();
        assert_eq!(record.name, "Ada");
        assert_eq!(record.student_id, "NIM001");
        assert_eq!(record.department, "CS");
    }

    #[tokio::test]
    async fn test_logout_clears_list_and_discards_late_snapshots() {
        let f = fixture();
        f.usecase.start();
        let mut states = f.usecase.session_state();
        f.usecase.register("a@x.com", "secret1").await.unwrap();
        wait(&mut states, |s| s.is_authenticated(), "authenticated state").await;

        f.usecase.add_record("Ada", "NIM001", "CS").await.unwrap();
        let mut records = f.usecase.records();
        wait(&mut records, |l| l.len() == 1, "snapshot with the record").await;

        f.usecase.logout().await.unwrap();
        wait(
            &mut states,
            |s| *s == SessionState::Unauthenticated,
            "unauthenticated state",
        )
        .await;
        wait(&mut records, |l| l.is_empty(), "cleared record list").await;
        assert!(f.cache.get(PROFILE_CACHE_KEY).is_none());

        // A write landing after logout reaches the store but not the list:
        // the subscription is detached, so nothing can repopulate it.
        f.store.append("students", Map::new()).await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(f.store.documents("students").len(), 2);
        assert!(records.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_relogin_reopens_subscription() {
        let f = fixture();
        f.usecase.start();
        let mut states = f.usecase.session_state();

        f.usecase.register("a@x.com", "secret1").await.unwrap();
        wait(&mut states, |s| s.is_authenticated(), "authenticated state").await;
        f.usecase.add_record("Ada", "NIM001", "CS").await.unwrap();

        f.usecase.logout().await.unwrap();
        let mut records = f.usecase.records();
        wait(&mut records, |l| l.is_empty(), "cleared record list").await;

        f.usecase.login("a@x.com", "secret1").await.unwrap();
        // The fresh subscription's first snapshot restores the remote
        // contents.
        wait(&mut records, |l| l.len() == 1, "restored record list").await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscription() {
        let f = fixture();
        f.usecase.start();
        let mut states = f.usecase.session_state();
        f.usecase.register("a@x.com", "secret1").await.unwrap();
        wait(&mut states, |s| s.is_authenticated(), "authenticated state").await;

        f.usecase.shutdown().await;
        assert!(f.usecase.records().borrow().is_empty());
    }
}
