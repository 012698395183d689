//! Background compaction thread fed by a coalescing signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::lifecycle::Compactor;

/// Runs [`Compactor::run_once`] off the write path.
///
/// The signal holds at most one pending request: triggering while a run
/// is already queued is a no-op, so a burst of rotations costs one pass.
/// The thread is spawned on the first trigger and exits when the worker
/// is dropped.
pub struct CompactionWorker {
    compactor: Arc<Compactor>,
    signal: Mutex<Option<SyncSender<()>>>,
    completed: Arc<AtomicU64>,
    spawned: AtomicU64,
}

impl CompactionWorker {
    pub fn new(compactor: Arc<Compactor>) -> Self {
        Self {
            compactor,
            signal: Mutex::new(None),
            completed: Arc::new(AtomicU64::new(0)),
            spawned: AtomicU64::new(0),
        }
    }

    pub fn compactor(&self) -> &Arc<Compactor> {
        &self.compactor
    }

    /// Number of background passes that have finished, successful or not.
    pub fn completed_runs(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Request a cleanup pass without waiting for it.
    pub fn trigger(&self) {
        if self.compactor.policy().is_noop() {
            return;
        }
        let mut signal = self
            .signal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if signal.is_none() {
            match self.spawn() {
                Ok(sender) => *signal = Some(sender),
                Err(err) => {
                    log::warn!("failed to start compaction worker: {err}");
                    return;
                }
            }
        }
        let Some(sender) = signal.as_ref() else {
            return;
        };
        match sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                // The thread died; the next trigger starts a fresh one.
                log::warn!("compaction worker exited unexpectedly");
                *signal = None;
            }
        }
    }

    fn spawn(&self) -> std::io::Result<SyncSender<()>> {
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        let compactor = Arc::clone(&self.compactor);
        let completed = Arc::clone(&self.completed);
        thread::Builder::new()
            .name("dailylog-compactor".to_string())
            .spawn(move || run(compactor, rx, completed))?;
        let spawned = self.spawned.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("compaction worker started ({spawned} so far)");
        Ok(tx)
    }
}

fn run(compactor: Arc<Compactor>, rx: Receiver<()>, completed: Arc<AtomicU64>) {
    while rx.recv().is_ok() {
        if let Err(err) = compactor.run_once() {
            log::warn!("cleanup pass failed: {err}");
        }
        completed.fetch_add(1, Ordering::AcqRel);
    }
}
