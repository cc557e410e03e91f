//! In-process record store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::RecordStore;

/// Record store kept in memory; contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous read, handy for assertions and seeding.
    pub fn get_now(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Synchronous write, handy for assertions and seeding.
    pub fn set_now(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_now(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_now(key, value);
        Ok(())
    }
}
