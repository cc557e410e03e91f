//! Fresh path: open a new session and record it.

use std::sync::Arc;

use super::UploadManager;
use crate::clock::now_millis;
use crate::error::UploadError;
use crate::fingerprint::{Destination, FileFingerprint};
use crate::registry::{AccessLevel, UploadRecord};
use crate::source::UploadSource;
use crate::task::{TaskEvents, TaskFactory, TaskParams};

impl<F: TaskFactory> UploadManager<F> {
    /// Open a new remote session, build a task with no prior parts and
    /// record the session under `fingerprint`.
    ///
    /// Failing to open the session is fatal. Failing to record it only
    /// costs resumability.
    pub(crate) async fn initiate(
        &self,
        fingerprint: &FileFingerprint,
        access_level: AccessLevel,
        source: UploadSource,
        destination: Destination,
        events: TaskEvents,
    ) -> Result<F::Task, UploadError> {
        let session_id = self
            .remote
            .create_session(&destination.bucket, &destination.key)
            .await
            .map_err(|source| UploadError::SessionInit {
                destination: destination.clone(),
                source,
            })?;
        tracing::info!(%session_id, dest = %destination, "opened new upload session");

        let now = now_millis();
        let record = UploadRecord {
            session_id: session_id.clone(),
            bucket: destination.bucket.clone(),
            key: destination.key.clone(),
            access_level,
            file_name: source.file_name().map(str::to_string),
            session_start: now,
            last_touched: now,
        };

        let task = self.factory.create(TaskParams {
            remote: Arc::clone(&self.remote),
            session_id,
            destination,
            source,
            parts: None,
            events,
        });

        if let Err(e) = self.registry.insert(fingerprint.clone(), record).await {
            tracing::warn!(%fingerprint, "upload will not be resumable: {}", e);
        }
        Ok(task)
    }
}
