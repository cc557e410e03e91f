#![allow(dead_code)]

pub mod flaky;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rum_core::remote::{LocalMultipartStore, PartUploader};
use rum_core::retry::RetryPolicy;
use rum_core::store::SqliteRecordStore;
use rum_core::task::ChunkedUploadFactory;
use rum_core::UploadManager;

pub const PART_SIZE: u64 = 1024;

/// One attempt per call; failures surface immediately.
pub fn no_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
    }
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0u8..251).cycle().take(len).collect()
}

/// Manager over an on-disk registry and local store, as a fresh process would build it.
pub async fn manager(
    db_path: &Path,
    store: Arc<LocalMultipartStore>,
    uploader: Arc<dyn PartUploader>,
) -> UploadManager<ChunkedUploadFactory> {
    let records = SqliteRecordStore::open_at(db_path).await.unwrap();
    let factory = ChunkedUploadFactory::new(uploader, PART_SIZE, no_retry());
    UploadManager::new(Arc::new(records), store, factory)
}

/// Poll until the manager's registry is empty.
pub async fn wait_registry_empty<F: rum_core::task::TaskFactory>(manager: &UploadManager<F>) {
    for _ in 0..400 {
        if manager.records().await.unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("upload registry never emptied");
}
