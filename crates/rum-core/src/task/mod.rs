//! Upload tasks: the transfer side of one multipart session.
//!
//! The manager never moves bytes itself. It builds a task through a
//! [`TaskFactory`], hands it to the caller, and listens on the task's
//! [`TaskEvents`] for completion or abort.

mod chunked;
mod events;
mod progress;

use std::sync::Arc;

use crate::fingerprint::Destination;
use crate::registry::SessionId;
use crate::remote::{RemoteMultipartClient, UploadedPart};
use crate::source::UploadSource;

pub use chunked::{ChunkedUpload, ChunkedUploadFactory, TaskError};
pub use events::{TaskEvent, TaskEvents};
pub use progress::UploadProgress;

/// A live upload bound to one remote session.
pub trait UploadTask: Send + Sync + 'static {
    fn session_id(&self) -> &str;
}

/// Everything a task needs to run one session.
pub struct TaskParams {
    pub remote: Arc<dyn RemoteMultipartClient>,
    pub session_id: SessionId,
    pub destination: Destination,
    pub source: UploadSource,
    /// Parts the store already holds (`Some` when resuming a cached session).
    pub parts: Option<Vec<UploadedPart>>,
    /// Channel the task must emit its lifecycle events on.
    pub events: TaskEvents,
}

/// Builds tasks for the manager.
pub trait TaskFactory: Send + Sync {
    type Task: UploadTask;

    fn create(&self, params: TaskParams) -> Self::Task;
}
