pub mod config;
pub mod logging;

// Upload reconciliation core
pub mod checksum;
pub mod clock;
pub mod error;
pub mod fingerprint;
pub mod manager;
pub mod parts;
pub mod registry;
pub mod remote;
pub mod retry;
pub mod source;
pub mod store;
pub mod task;

pub use error::{ReconcileError, RegistryError, RemoteError, UploadError};
pub use fingerprint::{Destination, FileFingerprint};
pub use manager::{GcReport, UploadManager, UploadRequest};
pub use registry::{AccessLevel, UploadRecord};
pub use source::UploadSource;
