//! CLI for the RUM resumable upload manager.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rum_core::config::{self, RumConfig};
use rum_core::remote::LocalMultipartStore;
use rum_core::store::SqliteRecordStore;
use rum_core::task::ChunkedUploadFactory;
use rum_core::{AccessLevel, Destination, UploadManager};

use commands::{run_abort, run_gc, run_status, run_upload};

/// Manager wired to the on-disk registry and the local multipart store.
pub type Manager = UploadManager<ChunkedUploadFactory>;

/// Top-level CLI for the RUM resumable upload manager.
#[derive(Debug, Parser)]
#[command(name = "rum")]
#[command(about = "RUM: resumable multipart uploads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a file, resuming a cached session for it when one is still fresh.
    Upload {
        /// File to upload.
        path: PathBuf,

        /// Destination bucket.
        #[arg(long)]
        bucket: String,

        /// Destination object key.
        #[arg(long)]
        key: String,

        /// Access level recorded with the session (public, protected, private).
        #[arg(long, default_value = "private")]
        access_level: AccessLevel,

        /// MIME type recorded in the fingerprint (default application/octet-stream).
        #[arg(long)]
        content_type: Option<String>,
    },

    /// List cached upload sessions.
    Status,

    /// Abort and forget sessions older than the configured TTL.
    Gc,

    /// Abort one cached session by its ID.
    Abort {
        /// Session identifier (see `rum status`).
        session_id: String,
    },
}

async fn build_manager(cfg: &RumConfig) -> Result<Manager> {
    let records = SqliteRecordStore::open_default().await?;
    let root = cfg.resolved_store_root()?;
    let store = Arc::new(
        LocalMultipartStore::open(&root)
            .await
            .with_context(|| format!("open local store at {}", root.display()))?,
    );
    let factory = ChunkedUploadFactory::new(store.clone(), cfg.part_size_bytes, cfg.retry_policy());
    Ok(UploadManager::from_config(
        cfg,
        Arc::new(records),
        store,
        factory,
    ))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let manager = build_manager(&cfg).await?;

        match cli.command {
            CliCommand::Upload {
                path,
                bucket,
                key,
                access_level,
                content_type,
            } => {
                let destination = Destination::new(bucket, key);
                run_upload(
                    &manager,
                    &path,
                    destination,
                    access_level,
                    content_type.as_deref(),
                )
                .await?;
            }
            CliCommand::Status => run_status(&manager).await?,
            CliCommand::Gc => run_gc(&manager).await?,
            CliCommand::Abort { session_id } => run_abort(&manager, &session_id).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
