//! `rum upload` – start or resume a multipart upload of one file.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rum_core::task::{TaskEvent, TaskEvents, UploadProgress, UploadTask};
use rum_core::{AccessLevel, Destination, UploadRequest, UploadSource};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::cli::Manager;

const PROGRESS_INTERVAL_MS: u64 = 500;
const EVICTION_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_upload(
    manager: &Manager,
    path: &Path,
    destination: Destination,
    access_level: AccessLevel,
    content_type: Option<&str>,
) -> Result<()> {
    let source = UploadSource::from_path(path, content_type).await?;
    let events = TaskEvents::new();
    let rx = events.subscribe();
    let request = UploadRequest::new(source, destination.clone())
        .with_access_level(access_level)
        .with_events(events);

    let task = manager.add_upload(request).await?;
    let session_id = task.session_id().to_string();
    let start = task.progress();
    if task.is_resumed() {
        println!(
            "Resuming session {} ({}/{} parts already uploaded)",
            session_id, start.parts_done, start.part_count
        );
    } else {
        println!("Started session {} for {}", session_id, destination);
    }

    let progress_handle = tokio::spawn(print_progress(rx, session_id.clone(), start));
    if let Err(e) = task.run().await {
        progress_handle.abort();
        println!();
        return Err(e).with_context(|| format!("upload {} (session {})", path.display(), session_id));
    }
    let _ = progress_handle.await;

    if !manager.wait_evicted(&session_id, EVICTION_TIMEOUT).await {
        tracing::warn!(%session_id, "registry record still present after completion");
    }
    println!("Uploaded {} to {}", path.display(), destination);
    Ok(())
}

async fn print_progress(
    mut rx: broadcast::Receiver<TaskEvent>,
    session_id: String,
    mut stats: UploadProgress,
) {
    let started = Instant::now();
    let resumed_bytes = stats.bytes_done;
    let mut last_print = Instant::now();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };
        if event.session_id() != session_id {
            continue;
        }
        if event.is_terminal() {
            break;
        }
        if let TaskEvent::PartUploaded { size, .. } = event {
            stats.parts_done += 1;
            stats.bytes_done += size;
        }

        let now = Instant::now();
        if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
            || stats.is_done()
        {
            let done_mib = stats.bytes_done as f64 / 1_048_576.0;
            let total_mib = stats.total_bytes as f64 / 1_048_576.0;
            let pct = stats.fraction() * 100.0;
            let elapsed = started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                (stats.bytes_done - resumed_bytes) as f64 / elapsed
            } else {
                0.0
            };
            println!(
                "\r  part {}/{}  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ",
                stats.parts_done,
                stats.part_count,
                done_mib,
                total_mib,
                pct,
                rate / 1_048_576.0
            );
            last_print = now;
        }
    }
    println!();
}
