use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

use crate::dispatch::Level;

/// Destination for dispatched records.
///
/// Implementations serialize their own writes; the dispatcher calls them
/// from a single consumer thread.
pub trait Sink: Send + Sync {
    /// Write `buf` as a record stamped at `at`.
    fn write_at(&self, buf: &[u8], at: OffsetDateTime) -> io::Result<usize>;

    /// Release the sink's resources. Called once at dispatcher shutdown.
    fn close(&self) -> io::Result<()>;
}

/// Fixed routing from severity to sink.
///
/// Built before the dispatcher starts and never changed afterwards.
/// Severities without a sink are dropped silently.
#[derive(Clone, Default)]
pub struct SinkTable {
    routes: HashMap<Level, Arc<dyn Sink>>,
}

impl SinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `level` to `sink`, replacing any earlier route for it.
    pub fn route(mut self, level: Level, sink: Arc<dyn Sink>) -> Self {
        self.routes.insert(level, sink);
        self
    }

    pub fn get(&self, level: Level) -> Option<&Arc<dyn Sink>> {
        self.routes.get(&level)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Every distinct sink once, even when it serves several levels.
    pub fn distinct_sinks(&self) -> Vec<Arc<dyn Sink>> {
        let mut seen = HashSet::new();
        let mut sinks = Vec::new();
        let mut routes: Vec<_> = self.routes.iter().collect();
        routes.sort_by_key(|(level, _)| **level);
        for (_, sink) in routes {
            let id = Arc::as_ptr(sink) as *const () as usize;
            if seen.insert(id) {
                sinks.push(Arc::clone(sink));
            }
        }
        sinks
    }
}

impl std::fmt::Debug for SinkTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut levels: Vec<_> = self.routes.keys().copied().collect();
        levels.sort();
        f.debug_struct("SinkTable").field("levels", &levels).finish()
    }
}

/// A sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Vec<u8>, OffsetDateTime)>>,
    closes: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records written so far.
    pub fn records(&self) -> Vec<(Vec<u8>, OffsetDateTime)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Payloads written so far, in order.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.records().into_iter().map(|(payload, _)| payload).collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::Acquire)
    }
}

impl Sink for MemorySink {
    fn write_at(&self, buf: &[u8], at: OffsetDateTime) -> io::Result<usize> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((buf.to_vec(), at));
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn distinct_sinks_deduplicates_shared_routes() {
        let shared: Arc<dyn Sink> = Arc::new(MemorySink::new());
        let other: Arc<dyn Sink> = Arc::new(MemorySink::new());
        let table = SinkTable::new()
            .route(Level::Info, Arc::clone(&shared))
            .route(Level::Notice, Arc::clone(&shared))
            .route(Level::Error, other);

        assert_eq!(table.len(), 3);
        assert_eq!(table.distinct_sinks().len(), 2);
        assert!(table.get(Level::Debug).is_none());
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let at = datetime!(2024-01-29 07:00 UTC);
        sink.write_at(b"a", at).unwrap();
        sink.write_at(b"b", at).unwrap();
        sink.close().unwrap();

        assert_eq!(sink.payloads(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(sink.close_count(), 1);
    }
}
