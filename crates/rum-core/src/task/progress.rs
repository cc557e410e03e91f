//! Progress snapshot for one upload task.

/// Parts and bytes the remote store holds for a task (CLI-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Parts confirmed by the store (pre-seeded or uploaded in this run).
    pub parts_done: usize,
    /// Total number of planned parts.
    pub part_count: usize,
    /// Bytes covered by confirmed parts.
    pub bytes_done: u64,
    /// Payload size in bytes.
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return if self.parts_done >= self.part_count { 1.0 } else { 0.0 };
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }

    pub fn is_done(&self) -> bool {
        self.parts_done >= self.part_count
    }
}
