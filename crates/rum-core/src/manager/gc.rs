//! Expiry of abandoned sessions.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinSet;

use super::UploadManager;
use crate::clock::{is_expired, now_millis};
use crate::error::RemoteError;
use crate::fingerprint::FileFingerprint;
use crate::task::TaskFactory;

/// Outcome of one GC pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Records in the registry when the pass started.
    pub examined: usize,
    /// Records older than the TTL (by session start).
    pub expired: usize,
    /// Expired records whose abort was acknowledged and that were removed.
    pub aborted: usize,
    /// Expired records kept because their abort failed.
    pub failed: usize,
}

impl<F: TaskFactory> UploadManager<F> {
    /// Abort and forget every session opened more than one TTL ago.
    ///
    /// All aborts of a pass run concurrently and the registry is written back
    /// once, after they settle. "No such upload" counts as acknowledged; any
    /// other abort failure keeps the record for the next pass. Never fails:
    /// an unreadable registry skips the pass.
    pub async fn purge_expired(&self) -> GcReport {
        let mut map = match self.registry.load().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("skipping expired-session cleanup: {}", e);
                return GcReport::default();
            }
        };

        let now = now_millis();
        let expired: Vec<_> = map
            .iter()
            .filter(|(_, rec)| is_expired(rec.session_start, now, self.ttl))
            .map(|(fp, rec)| (fp.clone(), rec.clone()))
            .collect();

        let mut report = GcReport {
            examined: map.len(),
            expired: expired.len(),
            ..GcReport::default()
        };
        if expired.is_empty() {
            return report;
        }

        let mut aborts = JoinSet::new();
        for (fp, rec) in expired {
            let remote = Arc::clone(&self.remote);
            aborts.spawn(async move {
                let result = remote
                    .abort_session(&rec.bucket, &rec.key, &rec.session_id)
                    .await;
                (fp, rec.session_id, result)
            });
        }

        let mut acknowledged: Vec<FileFingerprint> = Vec::new();
        while let Some(joined) = aborts.join_next().await {
            match joined {
                Ok((fp, _, Ok(()))) | Ok((fp, _, Err(RemoteError::NoSuchUpload { .. }))) => {
                    acknowledged.push(fp);
                }
                Ok((fp, session_id, Err(e))) => {
                    tracing::warn!(%session_id, fingerprint = %fp, "abort of expired session failed: {}", e);
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!("abort task did not finish: {}", e);
                    report.failed += 1;
                }
            }
        }

        for fp in &acknowledged {
            map.remove(fp);
        }
        report.aborted = acknowledged.len();
        if report.aborted > 0 {
            if let Err(e) = self.registry.save(&map).await {
                tracing::warn!("could not persist purged upload registry: {}", e);
            }
        }
        tracing::info!(
            examined = report.examined,
            expired = report.expired,
            aborted = report.aborted,
            failed = report.failed,
            "expired-session cleanup finished"
        );
        report
    }

    /// Abort one cached session by id and drop its record.
    ///
    /// Returns `false` when no record names `session_id`. A session the store
    /// no longer knows is treated as already aborted.
    pub async fn abort_cached(&self, session_id: &str) -> anyhow::Result<bool> {
        let mut map = self.registry.load().await.context("read upload registry")?;
        let Some(fp) = map
            .iter()
            .find(|(_, rec)| rec.session_id == session_id)
            .map(|(fp, _)| fp.clone())
        else {
            return Ok(false);
        };
        if let Some(rec) = map.get(&fp) {
            match self
                .remote
                .abort_session(&rec.bucket, &rec.key, &rec.session_id)
                .await
            {
                Ok(()) | Err(RemoteError::NoSuchUpload { .. }) => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("abort session {session_id}"));
                }
            }
        }
        map.remove(&fp);
        self.registry
            .save(&map)
            .await
            .context("write upload registry")?;
        self.tasks.unregister(session_id);
        tracing::info!(%session_id, fingerprint = %fp, "cached session aborted");
        Ok(true)
    }
}
