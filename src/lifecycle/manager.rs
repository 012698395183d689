//! Retention and compaction pass over a log directory.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::clock::Clock;
use crate::lifecycle::{compress_file, plan_cleanup, scan_log_files, CleanupPolicy, CleanupReport};
use crate::naming::{FilenameCodec, LogFileDescriptor};
use crate::Result;

/// Deletes stale log files and compresses retired ones.
///
/// The file a rotator is currently writing to is registered with
/// [`set_active`](Compactor::set_active) and is never touched. The active
/// name is checked again under its lock right before each delete or
/// compression, and stays locked for the duration of that file operation,
/// so a rotator switching back to a file waits for it instead of writing
/// into an inode that is about to be unlinked.
pub struct Compactor {
    codec: FilenameCodec,
    policy: CleanupPolicy,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<OsString>>,
    pass: Mutex<()>,
}

impl Compactor {
    pub fn new(codec: FilenameCodec, policy: CleanupPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec,
            policy,
            clock,
            active: Mutex::new(None),
            pass: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &CleanupPolicy {
        &self.policy
    }

    /// Record the bare filename of the file currently being written.
    ///
    /// Blocks while a pass is deleting or compressing a single file.
    pub fn set_active(&self, file_name: Option<OsString>) {
        *self.lock_active() = file_name;
    }

    pub fn active(&self) -> Option<OsString> {
        self.lock_active().clone()
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<OsString>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `op` on `file` unless it is the active file.
    fn unless_active<T>(
        &self,
        file: &LogFileDescriptor,
        op: impl FnOnce(&Path) -> io::Result<T>,
    ) -> Option<io::Result<T>> {
        let active = self.lock_active();
        if active.as_deref() == Some(file.entry.file_name().as_os_str()) {
            return None;
        }
        Some(op(&file.path()))
    }

    /// Run one cleanup pass.
    ///
    /// Passes are serialized: a pass started while another is running waits
    /// for it. Classification happens on a complete listing before anything
    /// is deleted or compressed. Every candidate is attempted; the first
    /// per-file failure is returned after the batch finishes.
    pub fn run_once(&self) -> Result<CleanupReport> {
        let start = Instant::now();
        let mut report = CleanupReport::new();
        if self.policy.is_noop() {
            return Ok(report);
        }
        let _pass = self
            .pass
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let active = self.active();
        let files = scan_log_files(&self.codec, active.as_deref())?;
        report.scanned_count = files.len();

        let plan = plan_cleanup(&self.policy, files, self.clock.now());

        for file in plan.remove {
            let path = file.path();
            match self.unless_active(&file, |path| fs::remove_file(path)) {
                None => log::debug!("{} became active; kept", path.display()),
                Some(Ok(())) => report.record_removal(path),
                Some(Err(err)) => {
                    log::warn!("failed to remove {}: {}", path.display(), err);
                    report.record_error(path, err);
                }
            }
        }

        for file in plan.compress {
            let path = file.path();
            let original_size = file.entry.metadata().map(|meta| meta.len()).unwrap_or(0);
            match self.unless_active(&file, compress_file) {
                None => log::debug!("{} became active; not compressed", path.display()),
                Some(Ok(compressed_size)) => {
                    report.record_compression(path, original_size, compressed_size)
                }
                Some(Err(err)) => {
                    log::warn!("failed to compress {}: {}", path.display(), err);
                    report.record_error(path, err);
                }
            }
        }

        report.duration = start.elapsed();
        log::debug!("cleanup of {}: {}", self.codec.dir().display(), report.summary());
        report.into_result()
    }
}
