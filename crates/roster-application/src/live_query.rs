//! Live collection subscription.
//!
//! `LiveQuery` owns the single open stream against the record collection.
//! Snapshot events replace the record list wholesale; closing the query
//! detaches the pump task before the list is cleared, so a snapshot that
//! was already in flight when the session ended can never be applied.

use std::sync::Arc;

use roster_core::capability::{DocumentStore, SnapshotEvent, SnapshotEvents};
use roster_core::error::{Result, RosterError};
use roster_core::record::RecordList;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct ActiveStream {
    cancel: CancellationToken,
    pump: JoinHandle<()>,
}

/// A live, cancellable subscription over the record collection.
///
/// At most one stream is open at a time: `open` implicitly supersedes any
/// prior stream, and `close` fully detaches the pump before emptying the
/// list. A stream error is terminal for that subscription; the list keeps
/// its last known value and the caller may `open` again.
pub struct LiveQuery {
    store: Arc<dyn DocumentStore>,
    collection: String,
    records: Arc<watch::Sender<RecordList>>,
    last_error: Arc<watch::Sender<Option<RosterError>>>,
    active: Mutex<Option<ActiveStream>>,
}

impl LiveQuery {
    /// Creates a query over the given collection. No stream is opened yet.
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        let (records, _) = watch::channel(RecordList::default());
        let (last_error, _) = watch::channel(None);
        Self {
            store,
            collection: collection.into(),
            records: Arc::new(records),
            last_error: Arc::new(last_error),
            active: Mutex::new(None),
        }
    }

    /// Opens the subscription, superseding any prior one.
    ///
    /// The previous stream (if any) is cancelled and awaited before the new
    /// one starts delivering, so exactly one stream is ever active and no
    /// duplicate entries can appear. The list is not cleared here: it keeps
    /// showing its last contents until the new stream's first snapshot
    /// replaces them.
    ///
    /// # Errors
    ///
    /// Returns the store's failure if the stream cannot be opened; the
    /// prior subscription is already closed at that point.
    pub async fn open(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            prev.cancel.cancel();
            let _ = prev.pump.await;
            tracing::debug!("[LiveQuery] Superseded previous subscription");
        }

        let events = self.store.subscribe(&self.collection).await?;
        self.last_error.send_replace(None);

        let cancel = CancellationToken::new();
        let pump = tokio::spawn(Self::pump(
            events,
            cancel.clone(),
            Arc::clone(&self.records),
            Arc::clone(&self.last_error),
        ));
        *active = Some(ActiveStream { cancel, pump });

        tracing::info!("[LiveQuery] Subscription opened on '{}'", self.collection);
        Ok(())
    }

    /// Closes the subscription and empties the record list.
    ///
    /// The pump task is cancelled and awaited first; only then is the list
    /// cleared. Snapshot events still queued on the superseded stream are
    /// discarded, never applied.
    pub async fn close(&self) {
        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            prev.cancel.cancel();
            let _ = prev.pump.await;
            tracing::info!("[LiveQuery] Subscription closed on '{}'", self.collection);
        }
        self.records.send_replace(RecordList::default());
    }

    /// Returns a receiver for record list changes.
    pub fn records(&self) -> watch::Receiver<RecordList> {
        self.records.subscribe()
    }

    /// Returns the current record list.
    pub fn current_records(&self) -> RecordList {
        self.records.borrow().clone()
    }

    /// Returns a receiver for the terminal stream error, if one occurred on
    /// the current subscription.
    pub fn last_error(&self) -> watch::Receiver<Option<RosterError>> {
        self.last_error.subscribe()
    }

    /// True while a stream is open and its pump is still running.
    pub async fn is_open(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| !active.pump.is_finished())
    }

    async fn pump(
        mut events: SnapshotEvents,
        cancel: CancellationToken,
        records: Arc<watch::Sender<RecordList>>,
        last_error: Arc<watch::Sender<Option<RosterError>>>,
    ) {
        loop {
            tokio::select! {
                // Cancellation must win over a queued snapshot.
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(SnapshotEvent::Snapshot(documents)) => {
                        let list = RecordList::from_snapshot(&documents);
                        tracing::debug!("[LiveQuery] Snapshot applied ({} records)", list.len());
                        records.send_replace(list);
                    }
                    Some(SnapshotEvent::Error(e)) => {
                        // Terminal: the list keeps its last known value.
                        tracing::error!("[LiveQuery] Stream error: {}", e);
                        last_error.send_replace(Some(e));
                        break;
                    }
                    None => {
                        tracing::debug!("[LiveQuery] Snapshot stream ended");
                        break;
                    }
                },
            }
        }
    }
}
