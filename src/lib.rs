//! Time-bucketed rotating log files with retention, gzip compaction and
//! asynchronous severity routing.
//!
//! - [`Rotator`] writes to one file per time bucket and switches files when
//!   the bucket changes.
//! - [`lifecycle`] deletes files older than the retention window and
//!   compresses retired ones on a background thread.
//! - [`dispatch`] decouples producers from disk I/O with a bounded queue and a
//!   single consumer routing records to per-severity sinks.
//! - [`Logger`] is a small levelled facade on top of the dispatcher.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod granularity;
pub mod lifecycle;
pub mod logger;
pub mod naming;
pub mod rotator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RotatorConfig;
pub use dispatch::{Dispatcher, Level, Sink, SinkTable};
pub use error::{Error, Result};
pub use format::{Formatter, SimpleFormatter};
pub use granularity::Granularity;
pub use logger::Logger;
pub use naming::{DecodeError, FilenameCodec, LogFileDescriptor};
pub use rotator::Rotator;
