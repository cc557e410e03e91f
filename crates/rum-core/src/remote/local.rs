//! Directory-backed multipart store.
//!
//! Layout under `root`:
//! - `.sessions/<id>/session.json`: owning bucket/key and creation time
//! - `.sessions/<id>/part-00001`: bytes of each received part
//! - `<bucket>/<key>`: completed objects
//!
//! Part and object writes go to a `.part` temp file first and are renamed
//! into place, so a crash never leaves a half-written part visible to `list_parts`.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;

use super::{ListPartsOutput, PartUploader, RemoteMultipartClient, UploadedPart};
use crate::checksum::{sha256_file, sha256_hex};
use crate::clock::now_millis;
use crate::error::RemoteError;
use crate::registry::SessionId;

const SESSIONS_DIR: &str = ".sessions";
const SESSION_META: &str = "session.json";
const PART_PREFIX: &str = "part-";
const TEMP_SUFFIX: &str = ".part";

#[derive(Debug, Serialize, Deserialize)]
struct SessionMeta {
    bucket: String,
    key: String,
    created_ms: i64,
}

/// Multipart store rooted at a local directory.
#[derive(Debug)]
pub struct LocalMultipartStore {
    root: PathBuf,
    counter: AtomicU64,
}

fn part_file_name(part_number: u32) -> String {
    format!("{PART_PREFIX}{part_number:05}")
}

fn parse_part_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(PART_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

fn no_such(session_id: &str) -> RemoteError {
    RemoteError::NoSuchUpload {
        session_id: session_id.to_string(),
    }
}

impl LocalMultipartStore {
    /// Open the store at `root`, creating the directory layout if needed.
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        let sessions = root.join(SESSIONS_DIR);
        tokio::fs::create_dir_all(&sessions)
            .await
            .with_context(|| format!("create dir: {}", sessions.display()))?;
        Ok(Self {
            root,
            counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a completed `bucket/key` object lives. Rejects keys that would escape the root.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, RemoteError> {
        let bucket_ok = !bucket.is_empty()
            && !bucket.starts_with('.')
            && !bucket.contains(['/', '\\']);
        if !bucket_ok {
            return Err(RemoteError::Rejected(format!("invalid bucket name {bucket:?}")));
        }
        let key_path = Path::new(key);
        let key_ok = !key.is_empty()
            && key_path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !key_ok {
            return Err(RemoteError::Rejected(format!("invalid object key {key:?}")));
        }
        Ok(self.root.join(bucket).join(key_path))
    }

    fn session_dir(&self, session_id: &str) -> Result<PathBuf, RemoteError> {
        // Ids are SHA-256 hex; anything else cannot name a session (and must not name a path).
        if session_id.len() != 64 || !session_id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(no_such(session_id));
        }
        Ok(self.root.join(SESSIONS_DIR).join(session_id))
    }

    /// Resolve a session dir and check it belongs to `bucket/key`.
    async fn open_session(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
    ) -> Result<PathBuf, RemoteError> {
        let dir = self.session_dir(session_id)?;
        let raw = match tokio::fs::read(dir.join(SESSION_META)).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(no_such(session_id)),
            Err(e) => return Err(e.into()),
        };
        let meta: SessionMeta = serde_json::from_slice(&raw).map_err(|e| {
            RemoteError::Rejected(format!("corrupt session metadata for {session_id}: {e}"))
        })?;
        if meta.bucket != bucket || meta.key != key {
            return Err(RemoteError::Rejected(format!(
                "session {session_id} belongs to {}/{}, not {bucket}/{key}",
                meta.bucket, meta.key
            )));
        }
        Ok(dir)
    }

    fn new_session_id(&self, bucket: &str, key: &str) -> SessionId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seed = format!("{bucket}\0{key}\0{nanos}\0{n}\0{}", std::process::id());
        sha256_hex(seed.as_bytes())
    }

    async fn read_parts(dir: &Path) -> Result<Vec<UploadedPart>, RemoteError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut parts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(part_number) = name.to_str().and_then(parse_part_name) else {
                continue;
            };
            let path = entry.path();
            let size = entry.metadata().await?.len();
            let checksum = sha256_file(&path).await?;
            parts.push(UploadedPart {
                part_number,
                size,
                checksum,
            });
        }
        parts.sort_by_key(|p| p.part_number);
        Ok(parts)
    }
}

#[async_trait]
impl RemoteMultipartClient for LocalMultipartStore {
    async fn create_session(&self, bucket: &str, key: &str) -> Result<SessionId, RemoteError> {
        self.object_path(bucket, key)?;
        let session_id = self.new_session_id(bucket, key);
        let dir = self.session_dir(&session_id)?;
        tokio::fs::create_dir_all(&dir).await?;
        let meta = SessionMeta {
            bucket: bucket.to_string(),
            key: key.to_string(),
            created_ms: now_millis(),
        };
        let json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| RemoteError::Rejected(format!("encode session metadata: {e}")))?;
        tokio::fs::write(dir.join(SESSION_META), json).await?;
        tracing::debug!(%session_id, bucket, key, "local session created");
        Ok(session_id)
    }

    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
    ) -> Result<ListPartsOutput, RemoteError> {
        let dir = self.open_session(bucket, key, session_id).await?;
        let parts = Self::read_parts(&dir).await?;
        Ok(ListPartsOutput {
            session_id: session_id.to_string(),
            parts,
        })
    }

    async fn abort_session(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
    ) -> Result<(), RemoteError> {
        let dir = self.open_session(bucket, key, session_id).await?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(no_such(session_id)),
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(%session_id, "local session aborted");
        Ok(())
    }
}

#[async_trait]
impl PartUploader for LocalMultipartStore {
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        part_number: u32,
        data: Vec<u8>,
    ) -> Result<UploadedPart, RemoteError> {
        if part_number == 0 {
            return Err(RemoteError::Rejected("part numbers start at 1".into()));
        }
        let dir = self.open_session(bucket, key, session_id).await?;
        let path = dir.join(part_file_name(part_number));
        let tmp = temp_path(&path);
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(UploadedPart {
            part_number,
            size: data.len() as u64,
            checksum: sha256_hex(&data),
        })
    }

    async fn complete_session(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), RemoteError> {
        let dir = self.open_session(bucket, key, session_id).await?;
        if parts.is_empty() {
            return Err(RemoteError::Rejected("cannot complete with no parts".into()));
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(RemoteError::Rejected(
                "parts must be in ascending part-number order".into(),
            ));
        }
        for part in parts {
            let path = dir.join(part_file_name(part.part_number));
            let size = match tokio::fs::metadata(&path).await {
                Ok(m) => m.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(RemoteError::Rejected(format!(
                        "part {} was never uploaded",
                        part.part_number
                    )))
                }
                Err(e) => return Err(e.into()),
            };
            if size != part.size {
                return Err(RemoteError::Rejected(format!(
                    "part {} size mismatch: stored {size}, listed {}",
                    part.part_number, part.size
                )));
            }
        }

        let dest = self.object_path(bucket, key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = temp_path(&dest);
        let mut out = tokio::fs::File::create(&tmp).await?;
        for part in parts {
            let mut src = tokio::fs::File::open(dir.join(part_file_name(part.part_number))).await?;
            tokio::io::copy(&mut src, &mut out).await?;
        }
        out.flush().await?;
        out.sync_all().await?;
        drop(out);
        tokio::fs::rename(&tmp, &dest).await?;
        tokio::fs::remove_dir_all(&dir).await?;
        tracing::debug!(%session_id, dest = %dest.display(), parts = parts.len(), "local session completed");
        Ok(())
    }
}
