//! Retention and compaction of retired log files.
//!
//! After every rotation the rotator signals a [`CompactionWorker`], which
//! runs a [`Compactor`] pass on its own thread:
//! - list the managed files, skipping the active one
//! - delete files whose bucket is older than the retention window
//! - gzip the survivors that are not compressed yet
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dailylog::lifecycle::{CleanupPolicy, Compactor};
//! use dailylog::{FilenameCodec, Granularity, SystemClock};
//! use time::UtcOffset;
//!
//! let codec = FilenameCodec::new("/var/log/app", "app", ".log", Granularity::Day, UtcOffset::UTC);
//! let policy = CleanupPolicy { retention: 7, compress: true, interval: Granularity::Day.interval() };
//! let compactor = Compactor::new(codec, policy, Arc::new(SystemClock));
//!
//! let report = compactor.run_once()?;
//! println!("{}", report.summary());
//! # Ok::<(), dailylog::Error>(())
//! ```

mod compressor;
mod manager;
mod policy;
mod scan;
mod stats;
mod worker;

pub use compressor::{compress_file, compressed_path};
pub use manager::Compactor;
pub use policy::{plan_cleanup, CleanupPlan, CleanupPolicy};
pub use scan::scan_log_files;
pub use stats::CleanupReport;
pub use worker::CompactionWorker;
