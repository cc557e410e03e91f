//! Task registry and completion/abort eviction.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::fingerprint::FileFingerprint;
use crate::registry::{SessionId, UploadRegistry};
use crate::task::{TaskEvent, UploadTask};

/// In-memory session id -> task map. Lives as long as the manager; never persisted.
pub(crate) struct TaskTable<T> {
    tasks: RwLock<HashMap<SessionId, Arc<T>>>,
    removed: Notify,
}

impl<T: UploadTask> TaskTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            removed: Notify::new(),
        }
    }

    /// Register a task under its session id, replacing any previous handle.
    pub(crate) fn register(&self, task: Arc<T>) {
        let id = task.session_id().to_string();
        self.tasks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, task);
    }

    pub(crate) fn get(&self, session_id: &str) -> Option<Arc<T>> {
        self.tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
    }

    pub(crate) fn unregister(&self, session_id: &str) -> Option<Arc<T>> {
        let removed = self
            .tasks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id);
        self.removed.notify_waiters();
        removed
    }

    /// Remove `task` only if it is still the handle registered under its
    /// session id. A newer handle for the same session stays.
    pub(crate) fn unregister_if_current(&self, task: &Arc<T>) -> bool {
        let removed = {
            let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
            match tasks.get(task.session_id()) {
                Some(current) if Arc::ptr_eq(current, task) => {
                    tasks.remove(task.session_id());
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.removed.notify_waiters();
        }
        removed
    }

    /// Resolves on the next removal. Create it before checking the table.
    pub(crate) fn removal(&self) -> Notified<'_> {
        self.removed.notified()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Wait for the task's completion or abort, then drop its registry record
/// and its task table entry.
///
/// Events for other sessions sharing the channel are skipped. If the
/// channel closes without a terminal event, nothing is evicted. The table
/// entry is only dropped while it still holds `task`.
pub(crate) fn spawn_eviction<T: UploadTask>(
    registry: UploadRegistry,
    tasks: Arc<TaskTable<T>>,
    fingerprint: FileFingerprint,
    task: Arc<T>,
    mut rx: broadcast::Receiver<TaskEvent>,
) {
    let session_id = task.session_id().to_string();
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(%session_id, skipped, "task event listener lagged");
                    continue;
                }
                Err(RecvError::Closed) => {
                    tracing::debug!(%session_id, "task event channel closed");
                    return;
                }
            };
            if event.session_id() != session_id || !event.is_terminal() {
                continue;
            }

            match registry.remove(&fingerprint).await {
                Ok(true) => tracing::debug!(%session_id, %fingerprint, "evicted upload record"),
                Ok(false) => {}
                Err(e) => tracing::warn!(%session_id, %fingerprint, "could not evict upload record: {}", e),
            }
            if !tasks.unregister_if_current(&task) {
                tracing::debug!(%session_id, "task handle was superseded, table entry kept");
            }
            return;
        }
    });
}
