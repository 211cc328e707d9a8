//! # Snapshot Writer
//!
//! Background task mirroring the cart into durable storage.
//!
//! The writer watches the store's state channel, which only ever holds the
//! latest snapshot. Mutations issued while a write is in flight coalesce
//! into a single follow-up write of the newest collection, and writes are
//! never concurrent with each other.
//!
//! ```text
//!  command ──► watch::Sender<CartSnapshot> ──► writer task ──► set_item(key, json)
//!                                                   │
//!                                                   ▼
//!                                     watch::Sender<PersistStatus> ──► flush()
//! ```
//!
//! Failed writes are logged and counted, never retried; the next mutation
//! rewrites the whole collection anyway.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use cart_core::{BoxedKeyValueStore, CartResult};

use crate::store::CartSnapshot;

/// Progress of the background writer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistStatus {
    /// Highest state version the writer has finished with (written or failed)
    pub settled_version: u64,

    /// Highest state version successfully written
    pub last_written_version: Option<u64>,

    /// When the last successful write completed
    pub last_written_at: Option<DateTime<Utc>>,

    /// Number of writes that failed
    pub failed_writes: u64,

    /// Message of the most recent failure
    pub last_error: Option<String>,
}

impl PersistStatus {
    /// Check if every settled version was also written
    pub fn is_clean(&self) -> bool {
        self.last_error.is_none()
    }
}

/// Handle to a running writer task
#[derive(Debug)]
pub(crate) struct Writer {
    status: watch::Receiver<PersistStatus>,
}

impl Writer {
    /// Spawn the writer.
    ///
    /// Versions up to `settled_version` are treated as already durable (the
    /// snapshot that was just loaded); anything newer is written.
    pub(crate) fn spawn(
        storage: BoxedKeyValueStore,
        storage_key: String,
        state: watch::Receiver<CartSnapshot>,
        settled_version: u64,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(PersistStatus {
            settled_version,
            ..PersistStatus::default()
        });

        tokio::spawn(run_writer(storage, storage_key, state, status_tx));

        Self { status: status_rx }
    }

    /// Current writer progress
    pub(crate) fn status(&self) -> PersistStatus {
        self.status.borrow().clone()
    }

    /// Wait until `version` has been settled.
    ///
    /// Returns early if the writer task is gone.
    pub(crate) async fn wait_settled(&self, version: u64) {
        let mut status = self.status.clone();
        let _ = status.wait_for(|s| s.settled_version >= version).await;
    }
}

async fn run_writer(
    storage: BoxedKeyValueStore,
    storage_key: String,
    mut state: watch::Receiver<CartSnapshot>,
    status: watch::Sender<PersistStatus>,
) {
    loop {
        let snapshot = state.borrow_and_update().clone();
        let settled = status.borrow().settled_version;

        if snapshot.version > settled {
            let result = write_snapshot(&storage, &storage_key, &snapshot).await;
            status.send_modify(|s| {
                s.settled_version = snapshot.version;
                match result {
                    Ok(()) => {
                        s.last_written_version = Some(snapshot.version);
                        s.last_written_at = Some(Utc::now());
                        s.last_error = None;
                    }
                    Err(e) => {
                        warn!(
                            backend = storage.backend_name(),
                            version = snapshot.version,
                            error = %e,
                            "cart snapshot write failed"
                        );
                        s.failed_writes += 1;
                        s.last_error = Some(e.to_string());
                    }
                }
            });
        }

        // Errors once every store handle is gone and the last value is seen.
        if state.changed().await.is_err() {
            break;
        }
    }

    debug!(key = %storage_key, "cart writer stopped");
}

async fn write_snapshot(
    storage: &BoxedKeyValueStore,
    storage_key: &str,
    snapshot: &CartSnapshot,
) -> CartResult<()> {
    let json = snapshot.collection.to_json()?;
    storage.set_item(storage_key, &json).await?;
    debug!(
        key = %storage_key,
        version = snapshot.version,
        items = snapshot.collection.len(),
        "cart snapshot written"
    );
    Ok(())
}
