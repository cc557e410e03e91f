//! Remote multipart store interfaces.
//!
//! The manager only needs [`RemoteMultipartClient`] (open, list, abort).
//! Transfer tasks additionally use [`PartUploader`] to send and commit parts.

mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::registry::SessionId;

pub use local::LocalMultipartStore;

/// One part the remote store has already received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPart {
    /// 1-based part number.
    pub part_number: u32,
    pub size: u64,
    /// Store-assigned checksum (ETag-like); opaque to the manager.
    pub checksum: String,
}

/// Result of a list-parts call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPartsOutput {
    pub session_id: SessionId,
    /// Sorted by part number.
    pub parts: Vec<UploadedPart>,
}

/// Session bookkeeping on the remote store.
#[async_trait]
pub trait RemoteMultipartClient: Send + Sync {
    /// Open a new multipart session for `bucket/key`.
    async fn create_session(&self, bucket: &str, key: &str) -> Result<SessionId, RemoteError>;

    /// Parts already received under `session_id`.
    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
    ) -> Result<ListPartsOutput, RemoteError>;

    /// Discard a session and its parts. Unknown sessions yield [`RemoteError::NoSuchUpload`].
    async fn abort_session(&self, bucket: &str, key: &str, session_id: &str)
        -> Result<(), RemoteError>;
}

/// Part transfer and commit, used by upload tasks.
#[async_trait]
pub trait PartUploader: Send + Sync {
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        part_number: u32,
        data: Vec<u8>,
    ) -> Result<UploadedPart, RemoteError>;

    /// Assemble `parts` (in part-number order) into the final object and close the session.
    async fn complete_session(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), RemoteError>;
}
