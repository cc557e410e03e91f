//! Task lifecycle notifications.

use tokio::sync::broadcast;

use crate::registry::SessionId;

const EVENT_CAPACITY: usize = 64;

/// Notification emitted by an upload task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// One part reached the remote store.
    PartUploaded {
        session_id: SessionId,
        part_number: u32,
        size: u64,
    },
    /// The session was completed; the object exists.
    Completed { session_id: SessionId },
    /// The session was cancelled.
    Aborted { session_id: SessionId },
}

impl TaskEvent {
    pub fn session_id(&self) -> &str {
        match self {
            TaskEvent::PartUploaded { session_id, .. }
            | TaskEvent::Completed { session_id }
            | TaskEvent::Aborted { session_id } => session_id,
        }
    }

    /// Completed or aborted: no further events will follow for this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::Completed { .. } | TaskEvent::Aborted { .. })
    }
}

/// Broadcast channel tasks emit on. Cloning shares the channel, so one
/// `TaskEvents` may serve several tasks; receivers filter by session id.
#[derive(Debug, Clone)]
pub struct TaskEvents {
    tx: broadcast::Sender<TaskEvent>,
}

impl TaskEvents {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    /// Send to all current subscribers. Having none is fine.
    pub fn emit(&self, event: TaskEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for TaskEvents {
    fn default() -> Self {
        Self::new()
    }
}
