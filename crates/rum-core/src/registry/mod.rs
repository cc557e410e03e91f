//! Persisted upload registry: fingerprint -> session record.
//!
//! The whole mapping is serialized as one JSON object under a single store
//! key and is always read and written as a whole. There is no locking
//! across a read-modify-write cycle; concurrent writers are
//! last-writer-wins on the entire blob.

mod types;

use std::sync::Arc;

use crate::error::RegistryError;
use crate::fingerprint::FileFingerprint;
use crate::store::RecordStore;

pub use types::{AccessLevel, RegistryMap, SessionId, UploadRecord};

/// Handle to the registry blob in a [`RecordStore`]. Cheap to clone.
#[derive(Clone)]
pub struct UploadRegistry {
    store: Arc<dyn RecordStore>,
    key: String,
}

impl UploadRegistry {
    pub fn new(store: Arc<dyn RecordStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Store key this registry lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read and decode the whole registry. A missing or empty value is an empty registry.
    pub async fn load(&self) -> Result<RegistryMap, RegistryError> {
        let raw = self
            .store
            .get(&self.key)
            .await
            .map_err(RegistryError::Store)?;
        match raw.as_deref() {
            None => Ok(RegistryMap::new()),
            Some(s) if s.trim().is_empty() => Ok(RegistryMap::new()),
            Some(s) => Ok(serde_json::from_str(s)?),
        }
    }

    /// Like [`load`](Self::load), but an unreadable or corrupt registry is logged and treated as empty.
    pub async fn load_or_empty(&self) -> RegistryMap {
        match self.load().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(key = %self.key, "treating upload registry as empty: {}", e);
                RegistryMap::new()
            }
        }
    }

    /// Encode and write the whole registry.
    pub async fn save(&self, map: &RegistryMap) -> Result<(), RegistryError> {
        let json = serde_json::to_string(map)?;
        self.store
            .set(&self.key, &json)
            .await
            .map_err(RegistryError::Store)
    }

    /// Insert or replace one record (read-modify-write of the whole blob).
    pub async fn insert(
        &self,
        fingerprint: FileFingerprint,
        record: UploadRecord,
    ) -> Result<(), RegistryError> {
        let mut map = self.load_or_empty().await;
        map.insert(fingerprint, record);
        self.save(&map).await
    }

    /// Remove one record. Removing an absent fingerprint is a no-op that writes nothing.
    /// Returns whether a record was removed.
    pub async fn remove(&self, fingerprint: &FileFingerprint) -> Result<bool, RegistryError> {
        let mut map = self.load_or_empty().await;
        if map.remove(fingerprint).is_none() {
            return Ok(false);
        }
        self.save(&map).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests;
