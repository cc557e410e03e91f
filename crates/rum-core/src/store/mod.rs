//! Durable string-keyed record storage for the upload registry.
//!
//! The manager reads and writes one serialized blob under a single key, so
//! the substrate only needs whole-value `get` and `set`.

mod memory;
mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

/// Opaque key/value persistence. `set` replaces the whole value.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
