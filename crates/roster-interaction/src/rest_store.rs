//! REST document store.
//!
//! Appends documents through a Firestore-compatible REST endpoint and
//! emulates the streaming subscription by polling the collection on an
//! interval: a snapshot is emitted whenever the fetched contents differ
//! from the last emitted ones, so consumers observe the same
//! full-snapshot-on-change contract a push channel would deliver.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use roster_core::capability::{Document, DocumentStore, SnapshotEvent, SnapshotEvents};
use roster_core::error::{Result, RosterError};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;

use crate::config::BackendConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Document store over the Firestore REST protocol.
pub struct RestDocumentStore {
    client: Client,
    config: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    /// Full resource name, `projects/.../documents/<collection>/<id>`.
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RestDocumentStore {
    /// Creates a store with the given backend configuration.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Creates a store configured from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if required variables are missing.
    pub fn try_from_env() -> Result<Self> {
        Ok(Self::new(BackendConfig::try_from_env()?))
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}?key={}",
            self.config.store_url, self.config.project_id, collection, self.config.api_key
        )
    }
}

/// Fetches a collection's current documents in the order the backend
/// returns them.
async fn fetch_documents(client: &Client, url: &str) -> Result<Vec<Document>> {
    let response = client
        .get(url)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(|e| RosterError::stream(format!("Request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(RosterError::stream(format!("HTTP {status}: {text}")));
    }

    let list: ListDocumentsResponse = response
        .json()
        .await
        .map_err(|e| RosterError::stream(format!("Malformed document list: {e}")))?;

    Ok(list.documents.into_iter().map(decode_document).collect())
}

fn decode_document(wire: WireDocument) -> Document {
    let id = wire
        .name
        .rsplit('/')
        .next()
        .unwrap_or(wire.name.as_str())
        .to_string();
    let fields = wire
        .fields
        .into_iter()
        .map(|(key, value)| (key, decode_value(value)))
        .collect();
    Document { id, fields }
}

/// Unwraps a Firestore typed value into a plain JSON value.
fn decode_value(value: Value) -> Value {
    match value {
        Value::Object(mut typed) => {
            if let Some(s) = typed.remove("stringValue") {
                s
            } else if let Some(n) = typed.remove("integerValue") {
                // Integers come over the wire as strings.
                n.as_str()
                    .and_then(|s| s.parse::<i64>().ok())
                    .map(Value::from)
                    .unwrap_or(n)
            } else if let Some(n) = typed.remove("doubleValue") {
                n
            } else if let Some(b) = typed.remove("booleanValue") {
                b
            } else {
                Value::Null
            }
        }
        other => other,
    }
}

/// Wraps a plain JSON value into a Firestore typed value.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::String(s) => json!({ "stringValue": s }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        other => json!({ "stringValue": other.to_string() }),
    }
}

fn encode_fields(fields: &Map<String, Value>) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();
    Value::Object(encoded)
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn subscribe(&self, collection: &str) -> Result<SnapshotEvents> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.collection_url(collection);
        let poll_interval = self.config.poll_interval;
        let collection = collection.to_string();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut last: Option<Vec<Document>> = None;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                match fetch_documents(&client, &url).await {
                    Ok(documents) => {
                        if last.as_ref() != Some(&documents) {
                            tracing::debug!(
                                "[RestStore] '{}' changed ({} documents)",
                                collection,
                                documents.len()
                            );
                            last = Some(documents.clone());
                            if tx.send(SnapshotEvent::Snapshot(documents)).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        // Terminal for this subscription; the consumer may
                        // re-subscribe.
                        tracing::error!("[RestStore] Poll failed on '{}': {}", collection, e);
                        let _ = tx.send(SnapshotEvent::Error(e));
                        break;
                    }
                }
            }
            tracing::debug!("[RestStore] Listener for '{}' stopped", collection);
        });

        Ok(rx)
    }

    async fn append(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let url = self.collection_url(collection);
        let body = json!({ "fields": encode_fields(&fields) });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RosterError::write(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RosterError::write(format!("HTTP {status}: {text}")));
        }

        let created: WireDocument = response
            .json()
            .await
            .map_err(|e| RosterError::write(format!("Malformed create response: {e}")))?;

        let document = decode_document(created);
        tracing::info!(
            "[RestStore] Created document {} in '{}'",
            document.id,
            collection
        );
        Ok(document.id)
    }
}
