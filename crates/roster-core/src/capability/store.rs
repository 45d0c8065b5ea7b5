//! Document store capability trait.
//!
//! The remote collection is consumed through full-contents snapshots: every
//! change notification carries the collection's complete current documents
//! in the store's delivery order. Subscriptions are event channels with
//! drop-to-unsubscribe semantics, mirroring the auth capability contract.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::{Result, RosterError};

/// A raw document as the store delivers it.
///
/// The `fields` map is opaque to the store; domain types convert from it
/// leniently without schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned document ID.
    pub id: String,
    /// Raw field map.
    pub fields: Map<String, Value>,
}

/// An event on a collection subscription.
#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    /// The collection's full current contents, in delivery order.
    Snapshot(Vec<Document>),
    /// A terminal stream failure; no further events follow.
    Error(RosterError),
}

/// Receiver half of a collection subscription.
pub type SnapshotEvents = mpsc::UnboundedReceiver<SnapshotEvent>;

/// An abstract gateway to the remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Opens a streaming read against a collection.
    ///
    /// The collection's current contents are delivered as the first
    /// snapshot; every later change produces a fresh full snapshot. A
    /// stream failure is delivered as a terminal [`SnapshotEvent::Error`].
    /// Dropping the receiver ends the subscription.
    async fn subscribe(&self, collection: &str) -> Result<SnapshotEvents>;

    /// Appends a document with a store-generated ID and returns that ID
    /// once the store acknowledges persistence.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Write`] if the store rejects the append. No
    /// partial write is observable on failure.
    async fn append(&self, collection: &str, fields: Map<String, Value>) -> Result<String>;
}
