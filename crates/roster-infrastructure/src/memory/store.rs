//! In-memory document store backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use roster_core::capability::{Document, DocumentStore, SnapshotEvent, SnapshotEvents};
use roster_core::error::Result;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

/// In-process document store with live snapshot subscriptions.
///
/// Each append broadcasts a fresh full snapshot of the touched collection to
/// every live subscription, preserving insertion order. Consumers observe
/// the same contract the remote store delivers over the wire.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    watchers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<SnapshotEvent>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a collection's current documents in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn broadcast(&self, collection: &str, snapshot: Vec<Document>) {
        let mut watchers = self.watchers.lock().unwrap();
        if let Some(senders) = watchers.get_mut(collection) {
            senders.retain(|tx| tx.send(SnapshotEvent::Snapshot(snapshot.clone())).is_ok());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn subscribe(&self, collection: &str) -> Result<SnapshotEvents> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Seed with the current contents before registering, so the first
        // event is always a complete snapshot.
        let snapshot = self.documents(collection);
        let _ = tx.send(SnapshotEvent::Snapshot(snapshot));

        self.watchers
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(tx);

        tracing::debug!("[MemoryStore] Opened subscription on '{}'", collection);
        Ok(rx)
    }

    async fn append(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let snapshot = {
            let mut collections = self.collections.lock().unwrap();
            let documents = collections.entry(collection.to_string()).or_default();
            documents.push(Document {
                id: id.clone(),
                fields,
            });
            documents.clone()
        };

        tracing::debug!(
            "[MemoryStore] Appended document {} to '{}' ({} total)",
            id,
            collection,
            snapshot.len()
        );
        self.broadcast(collection, snapshot);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(name.to_string()));
        map
    }

    #[tokio::test]
    async fn test_subscribe_seeds_current_snapshot() {
        let store = MemoryDocumentStore::new();
        store.append("students", fields("Ada")).await.unwrap();

        let mut events = store.subscribe("students").await.unwrap();
        match events.recv().await.unwrap() {
            SnapshotEvent::Snapshot(docs) => assert_eq!(docs.len(), 1),
            SnapshotEvent::Error(e) => panic!("unexpected stream error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_append_broadcasts_full_snapshot_in_order() {
        let store = MemoryDocumentStore::new();
        let mut events = store.subscribe("students").await.unwrap();
        events.recv().await.unwrap(); // initial empty snapshot

        let first = store.append("students", fields("Ada")).await.unwrap();
        let second = store.append("students", fields("Grace")).await.unwrap();

        events.recv().await.unwrap();
        match events.recv().await.unwrap() {
            SnapshotEvent::Snapshot(docs) => {
                assert_eq!(docs.len(), 2);
                assert_eq!(docs[0].id, first);
                assert_eq!(docs[1].id, second);
            }
            SnapshotEvent::Error(e) => panic!("unexpected stream error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let store = MemoryDocumentStore::new();
        let mut events = store.subscribe("students").await.unwrap();
        events.recv().await.unwrap();

        store.append("alumni", fields("Ada")).await.unwrap();
        assert!(events.try_recv().is_err());
        assert!(store.documents("students").is_empty());
        assert_eq!(store.documents("alumni").len(), 1);
    }
}
