//! Tests for ChunkedUpload against a local multipart store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};

use super::*;
use crate::remote::LocalMultipartStore;

const PART_SIZE: u64 = 4;

async fn local_store() -> (tempfile::TempDir, Arc<LocalMultipartStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalMultipartStore::open(dir.path()).await.unwrap());
    (dir, store)
}

fn task(
    store: &Arc<LocalMultipartStore>,
    session_id: &str,
    source: UploadSource,
    parts: Option<Vec<UploadedPart>>,
    events: &TaskEvents,
) -> ChunkedUpload {
    let factory = ChunkedUploadFactory::new(store.clone(), PART_SIZE, RetryPolicy::default());
    factory.create(TaskParams {
        remote: store.clone(),
        session_id: session_id.to_string(),
        destination: Destination::new("b", "k"),
        source,
        parts,
        events: events.clone(),
    })
}

fn drain(rx: &mut broadcast::Receiver<TaskEvent>) -> Vec<TaskEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test]
async fn fresh_upload_sends_every_part_then_completes() {
    let (_dir, store) = local_store().await;
    let id = store.create_session("b", "k").await.unwrap();
    let events = TaskEvents::new();
    let mut rx = events.subscribe();

    let upload = task(&store, &id, UploadSource::blob(b"0123456789".to_vec(), "text/plain"), None, &events);
    assert!(!upload.is_resumed());
    assert_eq!(upload.progress().part_count, 3);
    upload.run().await.unwrap();

    let seen = drain(&mut rx);
    assert_eq!(seen.len(), 4);
    assert!(matches!(seen[0], TaskEvent::PartUploaded { part_number: 1, size: 4, .. }));
    assert!(matches!(seen[2], TaskEvent::PartUploaded { part_number: 3, size: 2, .. }));
    assert_eq!(seen[3], TaskEvent::Completed { session_id: id.clone() });

    let object = store.object_path("b", "k").unwrap();
    assert_eq!(std::fs::read(object).unwrap(), b"0123456789");
    assert!(upload.is_completed());
    assert!(upload.progress().is_done());
    assert!(matches!(upload.run().await, Err(TaskError::AlreadyCompleted)));
}

#[tokio::test]
async fn resumed_upload_skips_parts_the_store_already_has() {
    let (_dir, store) = local_store().await;
    let id = store.create_session("b", "k").await.unwrap();
    store.upload_part("b", "k", &id, 1, b"0123".to_vec()).await.unwrap();
    let listed = store.list_parts("b", "k", &id).await.unwrap();

    let events = TaskEvents::new();
    let mut rx = events.subscribe();
    let upload = task(
        &store,
        &id,
        UploadSource::blob(b"0123456789".to_vec(), "text/plain"),
        Some(listed.parts),
        &events,
    );
    assert!(upload.is_resumed());
    let before = upload.progress();
    assert_eq!(before.parts_done, 1);
    assert_eq!(before.bytes_done, 4);

    upload.run().await.unwrap();
    let uploaded: Vec<u32> = drain(&mut rx)
        .into_iter()
        .filter_map(|ev| match ev {
            TaskEvent::PartUploaded { part_number, .. } => Some(part_number),
            _ => None,
        })
        .collect();
    assert_eq!(uploaded, vec![2, 3]);
    let object = store.object_path("b", "k").unwrap();
    assert_eq!(std::fs::read(object).unwrap(), b"0123456789");
}

#[tokio::test]
async fn seeded_parts_with_wrong_size_are_resent() {
    let (_dir, store) = local_store().await;
    let id = store.create_session("b", "k").await.unwrap();
    let stale = UploadedPart {
        part_number: 1,
        size: 3,
        checksum: "x".into(),
    };
    let events = TaskEvents::new();
    let upload = task(
        &store,
        &id,
        UploadSource::blob(b"01234567".to_vec(), "text/plain"),
        Some(vec![stale]),
        &events,
    );
    assert_eq!(upload.progress().parts_done, 0);
    upload.run().await.unwrap();
    assert_eq!(upload.uploaded_parts().len(), 2);
}

#[tokio::test]
async fn file_source_is_read_by_range() {
    let (dir, store) = local_store().await;
    let path = dir.path().join("input.bin");
    let body: Vec<u8> = (0u8..=250).collect();
    std::fs::write(&path, &body).unwrap();

    let id = store.create_session("b", "k").await.unwrap();
    let source = UploadSource::from_path(&path, None).await.unwrap();
    let upload = task(&store, &id, source, None, &TaskEvents::new());
    upload.run().await.unwrap();

    let object = store.object_path("b", "k").unwrap();
    assert_eq!(std::fs::read(object).unwrap(), body);
}

#[tokio::test]
async fn abort_cancels_session_and_stops_run() {
    let (_dir, store) = local_store().await;
    let id = store.create_session("b", "k").await.unwrap();
    let events = TaskEvents::new();
    let mut rx = events.subscribe();
    let upload = task(&store, &id, UploadSource::blob(vec![7u8; 9], "x/y"), None, &events);

    upload.abort().await;
    assert!(upload.is_aborted());
    assert_eq!(drain(&mut rx), vec![TaskEvent::Aborted { session_id: id.clone() }]);
    assert!(matches!(
        store.list_parts("b", "k", &id).await,
        Err(RemoteError::NoSuchUpload { .. })
    ));
    assert!(matches!(upload.run().await, Err(TaskError::Aborted)));

    // Second abort is a no-op.
    upload.abort().await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn empty_blob_uploads_a_single_empty_part() {
    let (_dir, store) = local_store().await;
    let id = store.create_session("b", "k").await.unwrap();
    let upload = task(&store, &id, UploadSource::blob(Vec::new(), "x/y"), None, &TaskEvents::new());
    upload.run().await.unwrap();
    let object = store.object_path("b", "k").unwrap();
    assert!(std::fs::read(object).unwrap().is_empty());
}

/// Commits through the local store, then holds `complete_session` open until released.
struct HeldCommit {
    inner: Arc<LocalMultipartStore>,
    committed: Notify,
    release: Notify,
}

#[async_trait]
impl PartUploader for HeldCommit {
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        part_number: u32,
        data: Vec<u8>,
    ) -> Result<UploadedPart, RemoteError> {
        self.inner
            .upload_part(bucket, key, session_id, part_number, data)
            .await
    }

    async fn complete_session(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), RemoteError> {
        self.inner
            .complete_session(bucket, key, session_id, parts)
            .await?;
        self.committed.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn abort_during_commit_emits_a_single_terminal_event() {
    let (_dir, store) = local_store().await;
    let id = store.create_session("b", "k").await.unwrap();
    let events = TaskEvents::new();
    let mut rx = events.subscribe();
    let held = Arc::new(HeldCommit {
        inner: store.clone(),
        committed: Notify::new(),
        release: Notify::new(),
    });
    let factory = ChunkedUploadFactory::new(held.clone(), PART_SIZE, RetryPolicy::default());
    let upload = factory.create(TaskParams {
        remote: store.clone(),
        session_id: id.clone(),
        destination: Destination::new("b", "k"),
        source: UploadSource::blob(b"abcdef".to_vec(), "text/plain"),
        parts: None,
        events: events.clone(),
    });

    let (ran, ()) = tokio::join!(upload.run(), async {
        held.committed.notified().await;
        upload.abort().await;
        held.release.notify_one();
    });

    assert!(matches!(ran, Err(TaskError::Aborted)));
    assert!(upload.is_aborted());
    assert!(!upload.is_completed());
    let terminal: Vec<TaskEvent> = drain(&mut rx)
        .into_iter()
        .filter(TaskEvent::is_terminal)
        .collect();
    assert_eq!(terminal, vec![TaskEvent::Aborted { session_id: id }]);
}

#[tokio::test]
async fn abort_after_completion_is_a_no_op() {
    let (_dir, store) = local_store().await;
    let id = store.create_session("b", "k").await.unwrap();
    let events = TaskEvents::new();
    let mut rx = events.subscribe();
    let upload = task(&store, &id, UploadSource::blob(b"xyz".to_vec(), "x/y"), None, &events);

    upload.run().await.unwrap();
    upload.abort().await;

    assert!(upload.is_completed());
    assert!(!upload.is_aborted());
    let seen = drain(&mut rx);
    assert!(!seen.iter().any(|e| matches!(e, TaskEvent::Aborted { .. })));
    assert!(store.object_path("b", "k").unwrap().exists());
}
