//! Time-bucketed rotating file writer.
//!
//! A [`Rotator`] writes to `{dir}/{prefix}_{bucket}{suffix}`, where the
//! bucket is derived from the current time (or an explicit timestamp). When
//! the bucket changes the current file is closed, the new one is opened and
//! the background compactor is signalled.
//!
//! A bucket change does not truncate its target. It goes through the same
//! open-existing-or-new path as the first write, so a late record for an
//! earlier bucket is appended to that bucket's file. If the bucket was
//! already archived, a fresh file is created beside its `.gz` and the next
//! cleanup pass appends it to the archive.
//!
//! # Example
//!
//! ```no_run
//! use dailylog::{Granularity, Rotator, RotatorConfig};
//!
//! let config = RotatorConfig::new("/var/log/app", "app")
//!     .granularity(Granularity::Hour)
//!     .retention(48)
//!     .compress(true);
//! let rotator = Rotator::new(config)?;
//!
//! rotator.write(b"service started\n")?;
//! rotator.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::ffi::OsString;
use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;

use crate::clock::{Clock, SystemClock};
use crate::config::RotatorConfig;
use crate::dispatch::Sink;
use crate::lifecycle::{CleanupPolicy, CleanupReport, CompactionWorker, Compactor};
use crate::naming::FilenameCodec;
use crate::{Error, Result};

#[cfg(unix)]
const DIR_MODE: u32 = 0o750;
#[cfg(unix)]
const FILE_MODE: u32 = 0o640;

/// The open file and its path. Only touched with the rotator lock held.
#[derive(Default)]
struct RotationState {
    file: Option<File>,
    current: Option<PathBuf>,
}

pub struct Rotator {
    config: RotatorConfig,
    codec: FilenameCodec,
    clock: Arc<dyn Clock>,
    state: Mutex<RotationState>,
    worker: CompactionWorker,
    #[cfg(test)]
    fail_next_append: std::sync::atomic::AtomicBool,
}

impl Rotator {
    pub fn new(config: RotatorConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RotatorConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let config = config.normalized()?;
        config.granularity.verify(clock.now(), config.utc_offset)?;

        let codec = FilenameCodec::new(
            &config.dir,
            &config.prefix,
            &config.suffix,
            config.granularity,
            config.utc_offset,
        );
        let policy = CleanupPolicy {
            retention: config.retention,
            compress: config.compress,
            interval: config.granularity.interval(),
        };
        let compactor = Compactor::new(codec.clone(), policy, Arc::clone(&clock));

        Ok(Self {
            config,
            codec,
            clock,
            state: Mutex::new(RotationState::default()),
            worker: CompactionWorker::new(Arc::new(compactor)),
            #[cfg(test)]
            fail_next_append: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RotatorConfig {
        &self.config
    }

    pub fn codec(&self) -> &FilenameCodec {
        &self.codec
    }

    /// Path of the file currently open, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock().ok().and_then(|state| state.current.clone())
    }

    /// Write to the file for the current time's bucket.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.write_at(buf, self.clock.now())
    }

    /// Write to the file for the bucket containing `at`, rotating first if
    /// that is not the open file.
    ///
    /// The whole call, including a rotation, happens under the rotator lock.
    /// Open and write failures are returned as they came from the OS.
    pub fn write_at(&self, buf: &[u8], at: OffsetDateTime) -> io::Result<usize> {
        let target = self.codec.encode(at)?;
        let mut state = self.lock()?;
        if state.file.is_none() {
            self.open(&mut state, target.clone())?;
        }
        if state.current.as_ref() != Some(&target) {
            self.rotate_locked(&mut state, target)?;
        }
        let file = state
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no open log file"))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    /// Switch to the current time's bucket file.
    pub fn rotate(&self) -> Result<()> {
        let target = self.codec.encode(self.clock.now())?;
        self.rotate_to(target)
    }

    /// Switch to an explicit file, e.g. to override the bucket.
    pub fn rotate_to(&self, path: impl Into<PathBuf>) -> Result<()> {
        let mut state = self.lock()?;
        self.rotate_locked(&mut state, path.into())?;
        Ok(())
    }

    /// Close the open file. Closing a closed rotator is a no-op.
    ///
    /// A later write reopens the bucket file in append mode.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.close_locked(&mut state)?;
        Ok(())
    }

    /// Run a cleanup pass on the calling thread.
    pub fn cleanup_now(&self) -> Result<CleanupReport> {
        self.worker.compactor().run_once()
    }

    /// Number of background cleanup passes that have finished.
    pub fn cleanup_runs(&self) -> u64 {
        self.worker.completed_runs()
    }

    fn lock(&self) -> Result<MutexGuard<'_, RotationState>> {
        self.state
            .lock()
            .map_err(|_| Error::Poisoned("rotator state lock poisoned"))
    }

    fn rotate_locked(&self, state: &mut RotationState, target: PathBuf) -> io::Result<()> {
        self.close_locked(state)?;
        self.open(state, target)?;
        if let Some(path) = &state.current {
            log::debug!("rotated to {}", path.display());
        }
        self.worker.trigger();
        Ok(())
    }

    fn close_locked(&self, state: &mut RotationState) -> io::Result<()> {
        state.current = None;
        let flushed = match state.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        };
        self.worker.compactor().set_active(None);
        flushed
    }

    /// The target is registered as active before it is opened so a cleanup
    /// pass cannot unlink it underneath the new handle.
    fn open(&self, state: &mut RotationState, path: PathBuf) -> io::Result<()> {
        let compactor = self.worker.compactor();
        compactor.set_active(path.file_name().map(OsString::from));
        let file = match self.open_existing_or_new(&path) {
            Ok(file) => file,
            Err(err) => {
                compactor.set_active(None);
                return Err(err);
            }
        };
        state.file = Some(file);
        state.current = Some(path);
        Ok(())
    }

    /// Append to `path` if it exists, otherwise create it.
    ///
    /// If an existing file cannot be opened for append and
    /// `overwrite_on_open_failure` is set, the file is recreated empty so
    /// writes keep flowing. A file that vanished between the existence
    /// check and the open is always recreated.
    fn open_existing_or_new(&self, path: &Path) -> io::Result<File> {
        match std::fs::metadata(path) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.ensure_dir()?;
                match self.options().create_new(true).open(path) {
                    Ok(file) => return Ok(file),
                    // Raced with another creator; append to theirs.
                    Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }

        match self.open_append(path) {
            Ok(file) => Ok(file),
            Err(err) if err.kind() == io::ErrorKind::NotFound => self.open_truncated(path),
            Err(err) if self.config.overwrite_on_open_failure => {
                log::warn!(
                    "cannot append to {} ({err}); recreating it",
                    path.display()
                );
                self.open_truncated(path)
            }
            Err(err) => Err(err),
        }
    }

    fn open_append(&self, path: &Path) -> io::Result<File> {
        #[cfg(test)]
        if self
            .fail_next_append
            .swap(false, std::sync::atomic::Ordering::AcqRel)
        {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "append open refused",
            ));
        }
        self.options().append(true).open(path)
    }

    fn open_truncated(&self, path: &Path) -> io::Result<File> {
        self.ensure_dir()?;
        self.options().create(true).truncate(true).open(path)
    }

    fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        options
    }

    fn ensure_dir(&self) -> io::Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(&self.config.dir)
    }
}

impl Write for Rotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Rotator::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.lock()?;
        match state.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Sink for Rotator {
    fn write_at(&self, buf: &[u8], at: OffsetDateTime) -> io::Result<usize> {
        Rotator::write_at(self, buf, at)
    }

    fn close(&self) -> io::Result<()> {
        Rotator::close(self).map_err(io::Error::from)
    }
}

impl Drop for Rotator {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            let _ = self.close_locked(&mut state);
        }
    }
}
