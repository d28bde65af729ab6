//! Best-effort background persistence.
//!
//! Store mutations never wait on storage. They hand a serialized snapshot to
//! a [`Persister`], which queues it for a single background task. The task
//! applies writes in the order they were queued and logs failures; nothing is
//! reported back to the code that triggered the write.
//!
//! [`Persister::flush`] waits until everything queued so far has been
//! applied, which is what shutdown and tests use.
//!
//! [`Persister::close`] marks the end of the owning provider's scope. The
//! flag is shared by every clone; stores check it before mutating.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::storage::{KeyValueStorage, StorageError};

enum Command {
    Set { key: &'static str, value: String },
    Remove { key: &'static str },
    Flush(oneshot::Sender<()>),
}

/// Handle for queueing storage writes.
#[derive(Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<Command>,
    closed: Arc<AtomicBool>,
}

impl Persister {
    /// Spawn the writer task on the current Tokio runtime.
    ///
    /// The task runs until every `Persister` clone is dropped or the returned
    /// handle is aborted.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(storage: Arc<dyn KeyValueStorage>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_writer(storage, rx));
        let persister = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (persister, worker)
    }

    /// Mark every clone as closed. Already queued writes still apply.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether [`Persister::close`] has been called on any clone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queue `value` to be written under `key` as JSON.
    ///
    /// The value is serialized immediately so later mutations cannot leak
    /// into this write.
    pub fn save<T: Serialize + ?Sized>(&self, key: &'static str, value: &T) {
        match serde_json::to_string(value) {
            Ok(value) => self.send(Command::Set { key, value }),
            Err(source) => {
                let e = StorageError::Serialization {
                    key: key.to_string(),
                    source,
                };
                warn!(error = %e, "Skipping persistence");
            }
        }
    }

    /// Queue removal of `key`.
    pub fn remove(&self, key: &'static str) {
        self.send(Command::Remove { key });
    }

    /// Wait until all previously queued writes have been applied.
    ///
    /// Returns immediately if the writer has stopped.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("Persistence writer stopped, dropping write");
        }
    }
}

async fn run_writer(storage: Arc<dyn KeyValueStorage>, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Set { key, value } => {
                let storage = Arc::clone(&storage);
                let result =
                    tokio::task::spawn_blocking(move || storage.set_item(key, &value)).await;
                log_outcome("write", key, result);
            }
            Command::Remove { key } => {
                let storage = Arc::clone(&storage);
                let result = tokio::task::spawn_blocking(move || storage.remove_item(key)).await;
                log_outcome("remove", key, result);
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    info!("Persistence writer stopped");
}

fn log_outcome(
    op: &str,
    key: &str,
    result: Result<Result<(), StorageError>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(())) => debug!(op, key, "Persisted"),
        Ok(Err(e)) => warn!(op, key, error = %e, "Failed to persist, continuing in memory"),
        Err(e) => warn!(op, key, error = %e, "Persistence task failed"),
    }
}
