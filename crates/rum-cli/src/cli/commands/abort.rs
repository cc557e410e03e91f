//! `rum abort` – abort one cached session.

use anyhow::Result;

use crate::cli::Manager;

pub async fn run_abort(manager: &Manager, session_id: &str) -> Result<()> {
    if manager.abort_cached(session_id).await? {
        println!("Aborted session {session_id}.");
    } else {
        println!("No cached session {session_id}.");
    }
    Ok(())
}
