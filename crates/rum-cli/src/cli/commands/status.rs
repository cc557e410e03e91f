//! `rum status` – list cached upload sessions.

use anyhow::Result;
use rum_core::clock::now_millis;

use crate::cli::Manager;

fn format_age(since_ms: i64, now_ms: i64) -> String {
    let secs = (now_ms - since_ms).max(0) / 1000;
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s => format!("{}h{:02}m", s / 3600, (s % 3600) / 60),
    }
}

pub async fn run_status(manager: &Manager) -> Result<()> {
    let records = manager.records().await?;
    if records.is_empty() {
        println!("No cached upload sessions.");
        return Ok(());
    }

    let now = now_millis();
    let ttl_secs = manager.ttl().as_secs();
    println!(
        "{:<14} {:<10} {:<8} {:<8} {}",
        "SESSION", "ACCESS", "AGE", "IDLE", "DESTINATION"
    );
    for (fp, rec) in records {
        let short_id: String = rec.session_id.chars().take(12).collect();
        println!(
            "{:<14} {:<10} {:<8} {:<8} {}/{}",
            short_id,
            rec.access_level,
            format_age(rec.session_start, now),
            format_age(rec.last_touched, now),
            rec.bucket,
            rec.key
        );
        tracing::debug!(session_id = %rec.session_id, fingerprint = %fp, "cached session");
    }
    println!("(sessions older than {ttl_secs}s are aborted by `rum gc`)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::format_age;

    #[test]
    fn age_formatting() {
        assert_eq!(format_age(0, 42_000), "42s");
        assert_eq!(format_age(0, 5 * 60_000 + 1), "5m");
        assert_eq!(format_age(0, (2 * 3600 + 7 * 60) * 1000), "2h07m");
        assert_eq!(format_age(10_000, 0), "0s");
    }
}
