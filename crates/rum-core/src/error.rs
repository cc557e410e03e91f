//! Error types.
//!
//! Two tiers: [`RegistryError`] and [`ReconcileError`] are recoverable and
//! never leave the manager (the upload falls back to a fresh session);
//! [`UploadError`] is fatal and returned to the caller.

use thiserror::Error;

use crate::fingerprint::Destination;

/// Failure reported by the remote multipart store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The store has no session with this id (never existed, aborted, or completed).
    #[error("no such upload session: {session_id}")]
    NoSuchUpload { session_id: String },
    /// The store refused the request (bad arguments, mismatched destination, ...).
    #[error("remote store rejected request: {0}")]
    Rejected(String),
    /// Transport or disk failure; usually worth retrying.
    #[error("remote store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Reading or writing the persisted upload registry failed.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("record store: {0:#}")]
    Store(anyhow::Error),
    #[error("malformed upload registry: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Resume lookup failed; downgraded to "no cached session" by the manager.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("listing uploaded parts: {0}")]
    Remote(#[from] RemoteError),
}

/// Fatal upload-initiation failure.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to open multipart session for {destination}")]
    SessionInit {
        destination: Destination,
        #[source]
        source: RemoteError,
    },
}
