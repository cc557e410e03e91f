//! Upload payload descriptors: named files on disk or anonymous in-memory blobs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Content type used when the caller does not supply one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A named file: has a name and modification time, so it can be told apart
/// from other payloads of the same size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFile {
    pub path: PathBuf,
    pub name: String,
    /// Modification time in Unix milliseconds.
    pub last_modified_ms: i64,
    pub size: u64,
    pub content_type: String,
}

/// An anonymous payload with no name or modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Arc<[u8]>,
    pub content_type: String,
}

/// What is being uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    File(NamedFile),
    Blob(Blob),
}

impl UploadSource {
    /// Describe a file on disk. Name, size and mtime come from the filesystem.
    pub async fn from_path(path: impl AsRef<Path>, content_type: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("stat {}", path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("not a regular file: {}", path.display());
        }
        let last_modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(UploadSource::File(NamedFile {
            path: path.to_path_buf(),
            name,
            last_modified_ms,
            size: meta.len(),
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        }))
    }

    pub fn blob(data: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        UploadSource::Blob(Blob {
            data: data.into(),
            content_type: content_type.into(),
        })
    }

    pub fn size(&self) -> u64 {
        match self {
            UploadSource::File(f) => f.size,
            UploadSource::Blob(b) => b.data.len() as u64,
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            UploadSource::File(f) => &f.content_type,
            UploadSource::Blob(b) => &b.content_type,
        }
    }

    /// File name, only for named files.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            UploadSource::File(f) => Some(&f.name),
            UploadSource::Blob(_) => None,
        }
    }
}
