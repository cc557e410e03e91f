//! `rum gc` – abort sessions older than the TTL.

use anyhow::Result;

use crate::cli::Manager;

pub async fn run_gc(manager: &Manager) -> Result<()> {
    let report = manager.purge_expired().await;
    println!(
        "Examined {} session(s): {} expired, {} aborted, {} failed.",
        report.examined, report.expired, report.aborted, report.failed
    );
    if report.failed > 0 {
        println!("Failed aborts are retried on the next run; see the log for details.");
    }
    Ok(())
}
