//! Upload manager: decides whether an upload resumes a cached session or
//! opens a fresh one, and keeps the persisted registry in step with task
//! lifecycles.
//!
//! Per request the flow is: purge expired records, fingerprint the file,
//! look up a cached session, reconcile it with the store's part list (or
//! open a new session), register the task and subscribe to its events.
//!
//! Concurrent requests are not serialized. Two requests for the same
//! fingerprint may both open, or both resume, a session; the registry ends
//! up with whichever whole-blob write lands last.

mod gc;
mod initiate;
mod lifecycle;
mod reconcile;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RumConfig, DEFAULT_REGISTRY_KEY, DEFAULT_TTL_SECS};
use crate::error::{RegistryError, UploadError};
use crate::fingerprint::{fingerprint, Destination, FileFingerprint};
use crate::registry::{AccessLevel, UploadRecord, UploadRegistry};
use crate::remote::RemoteMultipartClient;
use crate::source::UploadSource;
use crate::store::RecordStore;
use crate::task::{TaskEvents, TaskFactory};

pub use gc::GcReport;
use lifecycle::TaskTable;

/// One `add_upload` call.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub access_level: AccessLevel,
    pub source: UploadSource,
    pub destination: Destination,
    /// Channel the task will emit on; keep a clone to observe the upload.
    pub events: TaskEvents,
}

impl UploadRequest {
    /// Private access level and a fresh event channel.
    pub fn new(source: UploadSource, destination: Destination) -> Self {
        Self {
            access_level: AccessLevel::default(),
            source,
            destination,
            events: TaskEvents::new(),
        }
    }

    pub fn with_access_level(mut self, access_level: AccessLevel) -> Self {
        self.access_level = access_level;
        self
    }

    pub fn with_events(mut self, events: TaskEvents) -> Self {
        self.events = events;
        self
    }
}

pub struct UploadManager<F: TaskFactory> {
    store: Arc<dyn RecordStore>,
    registry: UploadRegistry,
    remote: Arc<dyn RemoteMultipartClient>,
    factory: F,
    tasks: Arc<TaskTable<F::Task>>,
    ttl: Duration,
}

impl<F: TaskFactory> UploadManager<F> {
    /// Manager with the default one-hour TTL and registry key.
    pub fn new(
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteMultipartClient>,
        factory: F,
    ) -> Self {
        let registry = UploadRegistry::new(Arc::clone(&store), DEFAULT_REGISTRY_KEY);
        Self {
            store,
            registry,
            remote,
            factory,
            tasks: Arc::new(TaskTable::new()),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }

    /// Manager with TTL and registry key taken from `cfg`.
    pub fn from_config(
        cfg: &RumConfig,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteMultipartClient>,
        factory: F,
    ) -> Self {
        Self::new(store, remote, factory)
            .with_ttl(cfg.ttl())
            .with_registry_key(cfg.registry_key.clone())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_registry_key(mut self, key: impl Into<String>) -> Self {
        self.registry = UploadRegistry::new(Arc::clone(&self.store), key);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn registry(&self) -> &UploadRegistry {
        &self.registry
    }

    /// Start (or resume) an upload and return its task.
    ///
    /// Cache and reconciliation failures never fail the call; they fall back
    /// to a fresh session. Only failing to open that fresh session is an error.
    pub async fn add_upload(&self, request: UploadRequest) -> Result<Arc<F::Task>, UploadError> {
        let UploadRequest {
            access_level,
            source,
            destination,
            events,
        } = request;

        self.purge_expired().await;

        let fingerprint = fingerprint(&source, &destination);
        // Subscribe before the task exists so its first notification cannot be missed.
        let listener = events.subscribe();

        let task = match self.lookup_cached(&fingerprint).await {
            Some(cached) => self.resume(cached, source, destination, events),
            None => {
                self.initiate(&fingerprint, access_level, source, destination, events)
                    .await?
            }
        };

        let task = Arc::new(task);
        self.tasks.register(Arc::clone(&task));
        lifecycle::spawn_eviction(
            self.registry.clone(),
            Arc::clone(&self.tasks),
            fingerprint,
            Arc::clone(&task),
            listener,
        );
        Ok(task)
    }

    /// Task registered under `session_id` in this process, if any. No remote call.
    pub fn get_task(&self, session_id: &str) -> Option<Arc<F::Task>> {
        self.tasks.get(session_id)
    }

    /// Number of tasks currently registered in this process.
    pub fn live_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for the task under `session_id` to be evicted after its terminal
    /// event. Returns `false` if it is still registered when `timeout` runs out.
    pub async fn wait_evicted(&self, session_id: &str, timeout: Duration) -> bool {
        let evicted = async {
            loop {
                let removal = self.tasks.removal();
                tokio::pin!(removal);
                removal.as_mut().enable();
                if self.tasks.get(session_id).is_none() {
                    return;
                }
                removal.await;
            }
        };
        tokio::time::timeout(timeout, evicted).await.is_ok()
    }

    /// Snapshot of the persisted registry, in fingerprint order.
    pub async fn records(&self) -> Result<Vec<(FileFingerprint, UploadRecord)>, RegistryError> {
        Ok(self.registry.load().await?.into_iter().collect())
    }
}
