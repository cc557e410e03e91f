//! Resume path: cached session lookup and part reconciliation.

use std::sync::Arc;

use super::UploadManager;
use crate::clock::{is_expired, now_millis};
use crate::error::ReconcileError;
use crate::fingerprint::{Destination, FileFingerprint};
use crate::registry::SessionId;
use crate::remote::UploadedPart;
use crate::source::UploadSource;
use crate::task::{TaskEvents, TaskFactory, TaskParams};

/// A cached session the store still knows, with the parts it already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CachedSession {
    pub(crate) session_id: SessionId,
    pub(crate) parts: Vec<UploadedPart>,
}

impl<F: TaskFactory> UploadManager<F> {
    /// Cached session for `fingerprint`, reconciled against the store.
    ///
    /// Staleness is judged on `last_touched`, not on session start. A stale
    /// record is left in place for GC. On a hit `last_touched` is refreshed
    /// and persisted before the store is asked for its part list.
    async fn try_lookup_cached(
        &self,
        fingerprint: &FileFingerprint,
    ) -> Result<Option<CachedSession>, ReconcileError> {
        let mut map = self.registry.load().await?;
        let Some(record) = map.get_mut(fingerprint) else {
            return Ok(None);
        };

        let now = now_millis();
        if is_expired(record.last_touched, now, self.ttl) {
            tracing::debug!(%fingerprint, session_id = %record.session_id, "cached session is stale");
            return Ok(None);
        }

        record.last_touched = now;
        let bucket = record.bucket.clone();
        let key = record.key.clone();
        let session_id = record.session_id.clone();
        self.registry.save(&map).await?;

        let listed = self.remote.list_parts(&bucket, &key, &session_id).await?;
        Ok(Some(CachedSession {
            session_id,
            parts: listed.parts,
        }))
    }

    /// Like `try_lookup_cached`, with every failure logged and read as "no cached session".
    pub(crate) async fn lookup_cached(&self, fingerprint: &FileFingerprint) -> Option<CachedSession> {
        match self.try_lookup_cached(fingerprint).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%fingerprint, "resume lookup failed, starting a fresh session: {}", e);
                None
            }
        }
    }

    pub(crate) fn resume(
        &self,
        cached: CachedSession,
        source: UploadSource,
        destination: Destination,
        events: TaskEvents,
    ) -> F::Task {
        tracing::info!(
            session_id = %cached.session_id,
            dest = %destination,
            parts = cached.parts.len(),
            "resuming cached upload session"
        );
        self.factory.create(TaskParams {
            remote: Arc::clone(&self.remote),
            session_id: cached.session_id,
            destination,
            source,
            parts: Some(cached.parts),
            events,
        })
    }
}
