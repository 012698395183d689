//! Outcome of a cleanup pass.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Statistics and failures from one cleanup pass.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Number of managed files found (excluding the active one).
    pub scanned_count: usize,

    /// Files deleted as stale.
    pub removed: Vec<PathBuf>,

    /// Files replaced by their `.gz` counterpart.
    pub compressed: Vec<PathBuf>,

    /// Total bytes saved by compression.
    pub bytes_saved: u64,

    /// Per-file failures, in the order they happened.
    pub errors: Vec<(PathBuf, io::Error)>,

    /// Time taken for the pass.
    pub duration: Duration,
}

impl CleanupReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_removal(&mut self, path: PathBuf) {
        self.removed.push(path);
    }

    pub fn record_compression(&mut self, path: PathBuf, original_size: u64, compressed_size: u64) {
        self.compressed.push(path);
        self.bytes_saved += original_size.saturating_sub(compressed_size);
    }

    pub fn record_error(&mut self, path: PathBuf, error: io::Error) {
        self.errors.push((path, error));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The report itself, or the first recorded failure.
    pub fn into_result(mut self) -> Result<Self> {
        if self.errors.is_empty() {
            return Ok(self);
        }
        let (path, source) = self.errors.swap_remove(0);
        Err(Error::Cleanup { path, source })
    }

    pub fn summary(&self) -> String {
        format!(
            "Scanned: {}, Removed: {}, Compressed: {}, Saved: {} bytes, Errors: {}, Duration: {:?}",
            self.scanned_count,
            self.removed.len(),
            self.compressed.len(),
            self.bytes_saved,
            self.errors.len(),
            self.duration
        )
    }
}
