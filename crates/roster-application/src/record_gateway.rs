//! Record mutation gateway.

use std::sync::Arc;

use roster_core::capability::DocumentStore;
use roster_core::error::Result;
use roster_core::record::NewStudentRecord;

/// Appends new student records to the remote collection.
///
/// The gateway never touches the displayed list: a successful append is
/// reflected asynchronously by the next snapshot the live subscription
/// delivers. There is no idempotency key, so a duplicate submission
/// produces a duplicate record, and no optimistic local insert.
pub struct RecordGateway {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl RecordGateway {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Validates and appends a record, returning its store-assigned ID once
    /// the store acknowledges persistence.
    ///
    /// # Errors
    ///
    /// Returns a validation error without contacting the store if any field
    /// is empty after trimming, or the store's write failure verbatim.
    pub async fn add_record(
        &self,
        name: &str,
        student_id: &str,
        department: &str,
    ) -> Result<String> {
        let record = NewStudentRecord::new(name, student_id, department)?;
        let id = self.store.append(&self.collection, record.into_fields()).await?;
        tracing::info!(
            "[RecordGateway] Appended record {} to '{}'",
            id,
            self.collection
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roster_core::capability::SnapshotEvents;
    use roster_core::error::RosterError;
    use roster_infrastructure::MemoryDocumentStore;
    use serde_json::{Map, Value};

    #[tokio::test]
    async fn test_empty_field_is_rejected_without_any_write() {
        let store = Arc::new(MemoryDocumentStore::new());
        let gateway = RecordGateway::new(store.clone(), "students");

        let err = gateway.add_record("", "123", "CS").await.unwrap_err();
        assert_eq!(err, RosterError::validation("name"));
        assert!(store.documents("students").is_empty());
    }

    #[tokio::test]
    async fn test_successful_append_is_acknowledged_with_id() {
        let store = Arc::new(MemoryDocumentStore::new());
        let gateway = RecordGateway::new(store.clone(), "students");

        let id = gateway.add_record("Ada", "NIM001", "CS").await.unwrap();

        let documents = store.documents("students");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, id);
        assert_eq!(documents[0].fields["name"], "Ada");
        assert_eq!(documents[0].fields["student_id"], "NIM001");
        assert_eq!(documents[0].fields["department"], "CS");
    }

    #[tokio::test]
    async fn test_duplicate_submission_produces_duplicate_records() {
        let store = Arc::new(MemoryDocumentStore::new());
        let gateway = RecordGateway::new(store.clone(), "students");

        let first = gateway.add_record("Ada", "NIM001", "CS").await.unwrap();
        let second = gateway.add_record("Ada", "NIM001", "CS").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.documents("students").len(), 2);
    }

    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn subscribe(&self, _collection: &str) -> Result<SnapshotEvents> {
            Err(RosterError::stream("unavailable"))
        }

        async fn append(&self, _collection: &str, _fields: Map<String, Value>) -> Result<String> {
            Err(RosterError::write("PERMISSION_DENIED"))
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_surfaced_verbatim() {
        let gateway = RecordGateway::new(Arc::new(FailingStore), "students");
        let err = gateway.add_record("Ada", "NIM001", "CS").await.unwrap_err();
        assert_eq!(err, RosterError::write("PERMISSION_DENIED"));
    }
}
