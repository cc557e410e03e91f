//! Part-by-part upload of one payload to one session.

use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{TaskEvent, TaskEvents, TaskFactory, TaskParams, UploadProgress, UploadTask};
use crate::error::RemoteError;
use crate::fingerprint::Destination;
use crate::parts::{missing_parts, plan_parts, PartRange};
use crate::registry::SessionId;
use crate::remote::{PartUploader, RemoteMultipartClient, UploadedPart};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::source::UploadSource;

/// Why a [`ChunkedUpload::run`] stopped.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("upload aborted")]
    Aborted,
    #[error("upload is already running")]
    AlreadyRunning,
    #[error("upload already completed")]
    AlreadyCompleted,
    #[error("reading source: {0}")]
    Read(#[from] std::io::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

const ACTIVE: u8 = 0;
const ABORTED: u8 = 1;
const COMPLETED: u8 = 2;

/// Clears the running flag when `run` returns, however it returns.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Uploads the missing parts of a payload, then completes the session.
///
/// Parts the store already holds (pre-seeded on resume) are skipped when
/// their size matches the plan.
pub struct ChunkedUpload {
    remote: Arc<dyn RemoteMultipartClient>,
    uploader: Arc<dyn PartUploader>,
    session_id: SessionId,
    destination: Destination,
    source: UploadSource,
    plan: Vec<PartRange>,
    retry: RetryPolicy,
    events: TaskEvents,
    done: Mutex<BTreeMap<u32, UploadedPart>>,
    resumed: bool,
    running: AtomicBool,
    /// `ACTIVE` until exactly one of abort or completion claims it.
    state: AtomicU8,
}

impl ChunkedUpload {
    pub fn new(
        params: TaskParams,
        uploader: Arc<dyn PartUploader>,
        part_size: u64,
        retry: RetryPolicy,
    ) -> Self {
        let plan = plan_parts(params.source.size(), part_size);
        let resumed = params.parts.is_some();
        let seeded = params.parts.unwrap_or_default();
        // Keep only seeded parts that line up with the plan; the rest are re-sent.
        let done = plan
            .iter()
            .filter_map(|range| {
                seeded
                    .iter()
                    .find(|p| p.part_number == range.number && p.size == range.len())
                    .map(|p| (range.number, p.clone()))
            })
            .collect();

        Self {
            remote: params.remote,
            uploader,
            session_id: params.session_id,
            destination: params.destination,
            source: params.source,
            plan,
            retry,
            events: params.events,
            done: Mutex::new(done),
            resumed,
            running: AtomicBool::new(false),
            state: AtomicU8::new(ACTIVE),
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// True when the task continues a cached session rather than a new one.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn is_aborted(&self) -> bool {
        self.state.load(Ordering::Acquire) == ABORTED
    }

    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Parts the store holds right now, in part-number order.
    pub fn uploaded_parts(&self) -> Vec<UploadedPart> {
        self.done_parts().values().cloned().collect()
    }

    pub fn progress(&self) -> UploadProgress {
        let done = self.done_parts();
        UploadProgress {
            parts_done: done.len(),
            part_count: self.plan.len(),
            bytes_done: done.values().map(|p| p.size).sum(),
            total_bytes: self.source.size(),
        }
    }

    fn done_parts(&self) -> std::sync::MutexGuard<'_, BTreeMap<u32, UploadedPart>> {
        self.done.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_aborted(&self) -> Result<(), TaskError> {
        if self.is_aborted() {
            return Err(TaskError::Aborted);
        }
        Ok(())
    }

    async fn read_range(&self, range: PartRange) -> Result<Vec<u8>, TaskError> {
        match &self.source {
            UploadSource::Blob(blob) => Ok(blob.data[range.start as usize..range.end as usize].to_vec()),
            UploadSource::File(file) => {
                let mut f = tokio::fs::File::open(&file.path).await?;
                f.seek(SeekFrom::Start(range.start)).await?;
                let mut buf = vec![0u8; range.len() as usize];
                f.read_exact(&mut buf).await?;
                Ok(buf)
            }
        }
    }

    /// Upload every missing part and complete the session.
    ///
    /// Can be called again after a failure; parts already sent are not
    /// re-sent. Emits `PartUploaded` per part and `Completed` at the end.
    pub async fn run(&self) -> Result<(), TaskError> {
        if self.is_completed() {
            return Err(TaskError::AlreadyCompleted);
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(TaskError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);
        self.check_aborted()?;

        let Destination { bucket, key } = &self.destination;
        let already: Vec<UploadedPart> = self.uploaded_parts();
        let missing = missing_parts(&self.plan, &already);
        tracing::debug!(
            session_id = %self.session_id,
            parts = self.plan.len(),
            missing = missing.len(),
            "starting chunked upload"
        );

        for range in missing {
            self.check_aborted()?;
            let data = self.read_range(range).await?;
            let sent = run_with_retry(&self.retry, || {
                self.uploader
                    .upload_part(bucket, key, &self.session_id, range.number, data.clone())
            })
            .await;
            let part = match sent {
                Ok(part) => part,
                Err(_) if self.is_aborted() => return Err(TaskError::Aborted),
                Err(e) => return Err(e.into()),
            };
            self.events.emit(TaskEvent::PartUploaded {
                session_id: self.session_id.clone(),
                part_number: part.part_number,
                size: part.size,
            });
            self.done_parts().insert(part.part_number, part);
        }

        self.check_aborted()?;
        let parts = self.uploaded_parts();
        let committed = run_with_retry(&self.retry, || {
            self.uploader
                .complete_session(bucket, key, &self.session_id, &parts)
        })
        .await;
        match committed {
            Ok(()) => {}
            Err(_) if self.is_aborted() => return Err(TaskError::Aborted),
            Err(e) => return Err(e.into()),
        }

        // An abort that landed while the commit was in flight wins.
        if self
            .state
            .compare_exchange(ACTIVE, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TaskError::Aborted);
        }
        tracing::info!(session_id = %self.session_id, dest = %self.destination, "upload completed");
        self.events.emit(TaskEvent::Completed {
            session_id: self.session_id.clone(),
        });
        Ok(())
    }

    /// Cancel the upload: stop between parts, abort the remote session, emit `Aborted`.
    ///
    /// No-op once the upload has completed or was already aborted. Exactly
    /// one of `Completed` and `Aborted` is ever emitted.
    pub async fn abort(&self) {
        if self
            .state
            .compare_exchange(ACTIVE, ABORTED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let Destination { bucket, key } = &self.destination;
        match self.remote.abort_session(bucket, key, &self.session_id).await {
            Ok(()) | Err(RemoteError::NoSuchUpload { .. }) => {}
            Err(e) => tracing::warn!(session_id = %self.session_id, "remote abort failed: {}", e),
        }
        tracing::info!(session_id = %self.session_id, "upload aborted");
        self.events.emit(TaskEvent::Aborted {
            session_id: self.session_id.clone(),
        });
    }
}

impl UploadTask for ChunkedUpload {
    fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Builds [`ChunkedUpload`] tasks that send parts through one [`PartUploader`].
pub struct ChunkedUploadFactory {
    uploader: Arc<dyn PartUploader>,
    part_size: u64,
    retry: RetryPolicy,
}

impl ChunkedUploadFactory {
    pub fn new(uploader: Arc<dyn PartUploader>, part_size: u64, retry: RetryPolicy) -> Self {
        Self {
            uploader,
            part_size,
            retry,
        }
    }
}

impl TaskFactory for ChunkedUploadFactory {
    type Task = ChunkedUpload;

    fn create(&self, params: TaskParams) -> ChunkedUpload {
        ChunkedUpload::new(params, Arc::clone(&self.uploader), self.part_size, self.retry)
    }
}

#[cfg(test)]
mod tests;
