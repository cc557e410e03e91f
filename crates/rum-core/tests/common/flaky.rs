//! Part uploader that fails on a chosen part number, to simulate an interrupted upload.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rum_core::remote::{LocalMultipartStore, PartUploader, UploadedPart};
use rum_core::RemoteError;

pub struct FlakyUploader {
    inner: Arc<LocalMultipartStore>,
    fail_at: u32,
    sent: AtomicU32,
}

impl FlakyUploader {
    /// Refuse every upload of part `fail_at`; other parts go through.
    pub fn new(inner: Arc<LocalMultipartStore>, fail_at: u32) -> Self {
        Self {
            inner,
            fail_at,
            sent: AtomicU32::new(0),
        }
    }

    /// Parts that reached the store.
    pub fn sent(&self) -> u32 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PartUploader for FlakyUploader {
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        part_number: u32,
        data: Vec<u8>,
    ) -> Result<UploadedPart, RemoteError> {
        if part_number == self.fail_at {
            return Err(RemoteError::Rejected("connection dropped".into()));
        }
        let part = self
            .inner
            .upload_part(bucket, key, session_id, part_number, data)
            .await?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(part)
    }

    async fn complete_session(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), RemoteError> {
        self.inner
            .complete_session(bucket, key, session_id, parts)
            .await
    }
}
