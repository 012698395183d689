//! Levelled logging facade over a [`Dispatcher`].

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::dispatch::{Dispatcher, Level};
use crate::format::{Formatter, SimpleFormatter};
use crate::Result;

/// Formats records and hands them to a dispatcher.
///
/// Records less severe than the threshold (default [`Level::Info`]) are
/// discarded before formatting.
pub struct Logger {
    dispatcher: Arc<Dispatcher>,
    formatter: Box<dyn Formatter>,
    clock: Arc<dyn Clock>,
    threshold: Level,
}

impl Logger {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            formatter: Box::new(SimpleFormatter::default()),
            clock: Arc::new(SystemClock),
            threshold: Level::Info,
        }
    }

    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn level(mut self, threshold: Level) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> Level {
        self.threshold
    }

    /// Format and enqueue one record. Returns `Ok(0)` when filtered out.
    pub fn log(&self, level: Level, correlation_id: &str, event: &str, message: &str) -> Result<usize> {
        if !level.enabled_at(self.threshold) {
            return Ok(0);
        }
        let now = self.clock.now();
        let line = self
            .formatter
            .format(now, level, correlation_id, event, message);
        self.dispatcher.enqueue(level, line, now)
    }

    pub fn emergency(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Emergency, correlation_id, event, message);
    }

    pub fn alert(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Alert, correlation_id, event, message);
    }

    pub fn critical(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Critical, correlation_id, event, message);
    }

    pub fn error(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Error, correlation_id, event, message);
    }

    pub fn warning(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Warning, correlation_id, event, message);
    }

    pub fn notice(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Notice, correlation_id, event, message);
    }

    pub fn info(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Info, correlation_id, event, message);
    }

    pub fn debug(&self, correlation_id: &str, event: &str, message: &str) {
        self.emit(Level::Debug, correlation_id, event, message);
    }

    fn emit(&self, level: Level, correlation_id: &str, event: &str, message: &str) {
        if let Err(err) = self.log(level, correlation_id, event, message) {
            log::warn!("dropped {level} record: {err}");
        }
    }
}
