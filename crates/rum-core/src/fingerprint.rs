//! File fingerprints: recognise "the same file to the same destination"
//! across process restarts.
//!
//! A fingerprint is built from the observable identity of the payload plus
//! the destination. It is not a content hash: two different anonymous blobs
//! with the same size and content type sent to the same bucket/key produce
//! the same fingerprint and may resume each other's session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::UploadSource;

const SEPARATOR: char = '_';

/// Destination coordinates in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub bucket: String,
    pub key: String,
}

impl Destination {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Registry key for one (payload, destination) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileFingerprint(String);

impl FileFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FileFingerprint {
    fn from(s: String) -> Self {
        FileFingerprint(s)
    }
}

/// Escape backslash and the separator so distinct field tuples never join to the same string.
fn push_field(out: &mut String, field: &str) {
    if !out.is_empty() {
        out.push(SEPARATOR);
    }
    for c in field.chars() {
        if c == '\\' || c == SEPARATOR {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Compute the fingerprint of `source` uploaded to `dest`.
///
/// Named files use name, mtime, size, content type, bucket and key.
/// Blobs use size, content type, bucket and key.
pub fn fingerprint(source: &UploadSource, dest: &Destination) -> FileFingerprint {
    let mut out = String::new();
    match source {
        UploadSource::File(file) => {
            push_field(&mut out, &file.name);
            push_field(&mut out, &file.last_modified_ms.to_string());
            push_field(&mut out, &file.size.to_string());
            push_field(&mut out, &file.content_type);
        }
        UploadSource::Blob(blob) => {
            push_field(&mut out, &blob.data.len().to_string());
            push_field(&mut out, &blob.content_type);
        }
    }
    push_field(&mut out, &dest.bucket);
    push_field(&mut out, &dest.key);
    FileFingerprint(out)
}
