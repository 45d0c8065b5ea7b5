//! Auth capability trait.
//!
//! The original callback-registration contract (`onAuthStateChanged(cb) ->
//! unsubscribe`) is remodeled as an event channel: `subscribe` hands out a
//! receiver that yields the current state first and then every transition,
//! and dropping the receiver unsubscribes.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::identity::Identity;

/// Receiver half of an auth-state subscription.
///
/// Each event is the full new state: `Some(identity)` for signed-in,
/// `None` for signed-out. Events arrive in the order the capability emits
/// them, with no coalescing.
pub type AuthEvents = mpsc::UnboundedReceiver<Option<Identity>>;

/// An abstract gateway to the authentication capability.
///
/// Implementations own the current auth state and are its single source of
/// truth: every transition (including the ones caused by `register`,
/// `sign_in`, and `sign_out` below) must be announced on all subscriptions.
/// Consumers derive their own state exclusively from those events.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Opens a new auth-state subscription.
    ///
    /// The current state is delivered as the first event as soon as the
    /// capability has resolved it; every later transition follows in order.
    /// Dropping the receiver ends the subscription.
    fn subscribe(&self) -> AuthEvents;

    /// Creates a new account and signs it in.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RosterError::Auth`] carrying the capability's
    /// failure message verbatim. No state transition is emitted on failure.
    async fn register(&self, email: &str, password: &str) -> Result<Identity>;

    /// Signs in an existing account.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RosterError::Auth`] carrying the capability's
    /// failure message verbatim. No state transition is emitted on failure.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    /// Signs out the current account.
    async fn sign_out(&self) -> Result<()>;
}

/// Shared auth-state bookkeeping for [`AuthGateway`] implementations.
///
/// Tracks the current state and fans every transition out to all live
/// subscriptions. New subscriptions receive the current state immediately;
/// closed ones are pruned on the next publish.
#[derive(Default)]
pub struct AuthStateFanout {
    current: Mutex<Option<Identity>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<Option<Identity>>>>,
}

impl AuthStateFanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current auth state.
    pub fn current(&self) -> Option<Identity> {
        self.current.lock().unwrap().clone()
    }

    /// Opens a subscription seeded with the current state.
    pub fn subscribe(&self) -> AuthEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        // Seed before registering so the first event is always the current
        // state, never a transition that races past it.
        let current = self.current.lock().unwrap().clone();
        let _ = tx.send(current);
        self.listeners.lock().unwrap().push(tx);
        rx
    }

    /// Records a transition and announces it to every live subscription.
    pub fn publish(&self, state: Option<Identity>) {
        *self.current.lock().unwrap() = state.clone();
        let mut listeners = self.listeners.lock().unwrap();
        listeners.retain(|tx| tx.send(state.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_receives_current_state_first() {
        let fanout = AuthStateFanout::new();
        fanout.publish(Some(Identity::new("u1", None)));

        let mut rx = fanout.subscribe();
        let first = rx.recv().await.unwrap();
        assert_eq!(first.unwrap().uid, "u1");
    }

    #[tokio::test]
    async fn test_publish_fans_out_in_order() {
        let fanout = AuthStateFanout::new();
        let mut a = fanout.subscribe();
        let mut b = fanout.subscribe();

        fanout.publish(Some(Identity::new("u1", None)));
        fanout.publish(None);

        for rx in [&mut a, &mut b] {
            assert!(rx.recv().await.unwrap().is_none()); // seeded state
            assert_eq!(rx.recv().await.unwrap().unwrap().uid, "u1");
            assert!(rx.recv().await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let fanout = AuthStateFanout::new();
        let rx = fanout.subscribe();
        drop(rx);

        fanout.publish(None);
        assert_eq!(fanout.listeners.lock().unwrap().len(), 0);
    }
}
