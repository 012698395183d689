use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Condvar, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use time::OffsetDateTime;

use crate::dispatch::{Level, SinkTable};
use crate::{Error, Result};

/// Default number of records the queue holds before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// A record waiting in the dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub level: Level,
    pub payload: Vec<u8>,
    pub timestamp: OffsetDateTime,
}

/// Lifecycle of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatchState {
    /// Accepting records.
    Running = 0,
    /// Refusing new records while the consumer drains the queue.
    Draining = 1,
    /// Consumer finished and every sink closed.
    Stopped = 2,
}

impl DispatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DispatchState::Running,
            1 => DispatchState::Draining,
            _ => DispatchState::Stopped,
        }
    }
}

/// Bounded queue with a single consumer thread routing records by level.
///
/// Producers hand records over with [`enqueue`](Dispatcher::enqueue) and
/// return as soon as the record is queued. A full queue blocks producers
/// until the consumer catches up; nothing is dropped on the enqueue path.
/// One queue and one consumer give a total order: records reach their sinks
/// in the order they were enqueued.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use dailylog::dispatch::{Dispatcher, Level, SinkTable};
/// use dailylog::{Rotator, RotatorConfig};
/// use time::OffsetDateTime;
///
/// let info = Arc::new(Rotator::new(RotatorConfig::new("/var/log/app", "app_info"))?);
/// let sinks = SinkTable::new().route(Level::Info, info);
/// let dispatcher = Dispatcher::new(sinks, 1024)?;
///
/// dispatcher.enqueue(Level::Info, b"started\n".to_vec(), OffsetDateTime::now_utc())?;
/// dispatcher.stop_and_drain()?;
/// # Ok::<(), dailylog::Error>(())
/// ```
pub struct Dispatcher {
    state: AtomicU8,
    sender: RwLock<Option<SyncSender<DispatchRecord>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    stopped: Condvar,
    capacity: usize,
}

impl Dispatcher {
    /// Start the consumer thread. `capacity` bounds the queue.
    pub fn new(sinks: SinkTable, capacity: usize) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<DispatchRecord>(capacity);
        let consumer = thread::Builder::new()
            .name("dailylog-dispatch".to_string())
            .spawn(move || consume(sinks, rx))?;

        Ok(Self {
            state: AtomicU8::new(DispatchState::Running as u8),
            sender: RwLock::new(Some(tx)),
            consumer: Mutex::new(Some(consumer)),
            stopped: Condvar::new(),
            capacity,
        })
    }

    pub fn with_default_capacity(sinks: SinkTable) -> Result<Self> {
        Self::new(sinks, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> DispatchState {
        DispatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Queue a record for its level's sink.
    ///
    /// Blocks while the queue is full. Returns the number of payload bytes
    /// accepted, which says nothing about whether the sink write succeeds.
    /// Fails with [`Error::DispatcherStopped`] once shutdown has begun.
    pub fn enqueue(
        &self,
        level: Level,
        payload: impl Into<Vec<u8>>,
        timestamp: OffsetDateTime,
    ) -> Result<usize> {
        if self.state() != DispatchState::Running {
            return Err(Error::DispatcherStopped);
        }
        let sender = self
            .sender
            .read()
            .map_err(|_| Error::Poisoned("dispatcher sender lock poisoned"))?;
        let sender = sender.as_ref().ok_or(Error::DispatcherStopped)?;

        let payload = payload.into();
        let accepted = payload.len();
        sender
            .send(DispatchRecord {
                level,
                payload,
                timestamp,
            })
            .map_err(|_| Error::DispatcherStopped)?;
        Ok(accepted)
    }

    /// Stop accepting records, deliver everything already queued, close
    /// every sink once, and wait for the consumer to exit.
    ///
    /// Calling it again after shutdown is a no-op. A caller that arrives
    /// while another one is draining waits until the sinks are closed.
    pub fn stop_and_drain(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(
                DispatchState::Running as u8,
                DispatchState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return self.wait_stopped();
        }

        // Waits for producers blocked in `send`; the consumer keeps draining
        // so they finish. Dropping the sender ends the consumer loop once
        // the queue is empty.
        let sender = self
            .sender
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let consumer = self
            .consumer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let joined = match consumer {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Poisoned("dispatcher consumer panicked")),
            None => Ok(()),
        };

        // Stored under the lock so waiters cannot miss the wakeup.
        let guard = self
            .consumer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.state
            .store(DispatchState::Stopped as u8, Ordering::Release);
        drop(guard);
        self.stopped.notify_all();
        joined
    }

    fn wait_stopped(&self) -> Result<()> {
        let mut guard = self
            .consumer
            .lock()
            .map_err(|_| Error::Poisoned("dispatcher consumer lock poisoned"))?;
        while self.state() != DispatchState::Stopped {
            guard = self
                .stopped
                .wait(guard)
                .map_err(|_| Error::Poisoned("dispatcher consumer lock poisoned"))?;
        }
        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Err(err) = self.stop_and_drain() {
            log::warn!("dispatcher shutdown failed: {err}");
        }
    }
}

fn consume(sinks: SinkTable, rx: Receiver<DispatchRecord>) {
    while let Ok(record) = rx.recv() {
        let Some(sink) = sinks.get(record.level) else {
            continue;
        };
        if let Err(err) = sink.write_at(&record.payload, record.timestamp) {
            log::warn!("{} sink write failed: {err}", record.level);
        }
    }

    for sink in sinks.distinct_sinks() {
        if let Err(err) = sink.close() {
            log::warn!("sink close failed: {err}");
        }
    }
}
