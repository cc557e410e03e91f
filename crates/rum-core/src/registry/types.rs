//! Types persisted in the upload registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::fingerprint::FileFingerprint;

/// Remote store handle for one multipart upload attempt.
pub type SessionId = String;

/// Whole registry: fingerprint -> record. Ordered so the serialized form is stable.
pub type RegistryMap = BTreeMap<FileFingerprint, UploadRecord>;

/// Access level of the destination. Carried and persisted, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Protected,
    #[default]
    Private,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Protected => "protected",
            AccessLevel::Private => "private",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(AccessLevel::Public),
            "protected" => Ok(AccessLevel::Protected),
            "private" => Ok(AccessLevel::Private),
            other => Err(format!(
                "unknown access level {other:?} (expected public, protected or private)"
            )),
        }
    }
}

/// Persisted metadata for one in-flight multipart session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub session_id: SessionId,
    pub bucket: String,
    pub key: String,
    pub access_level: AccessLevel,
    /// Only set for named files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// When the session was opened (Unix ms). GC expiry is measured from here.
    pub session_start: i64,
    /// Last successful cache hit (Unix ms). Resume staleness is measured from here.
    pub last_touched: i64,
}
