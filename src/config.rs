use std::path::PathBuf;

use time::UtcOffset;

use crate::granularity::Granularity;
use crate::{Error, Result};

/// Default number of buckets kept on disk.
pub const DEFAULT_RETENTION: u32 = 30;
/// Default filename suffix.
pub const DEFAULT_SUFFIX: &str = ".log";

/// Configuration for a [`Rotator`](crate::Rotator).
///
/// Immutable once handed to the rotator; every rotator owns its own copy,
/// so rotators with different granularities never interfere.
#[derive(Debug, Clone)]
pub struct RotatorConfig {
    /// Directory holding the log files. Made absolute at construction.
    pub dir: PathBuf,
    /// Filename prefix. Defaults to the program name.
    pub prefix: String,
    /// Filename suffix, e.g. `.log`.
    pub suffix: String,
    pub granularity: Granularity,
    /// Number of most recent buckets to keep; `0` keeps everything.
    pub retention: u32,
    /// Gzip retired files that survive retention.
    pub compress: bool,
    /// Offset buckets are rendered in.
    pub utc_offset: UtcOffset,
    /// When an existing target cannot be opened for append, recreate it
    /// (discarding its content) instead of failing the write.
    pub overwrite_on_open_failure: bool,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            prefix: program_name(),
            suffix: DEFAULT_SUFFIX.to_string(),
            granularity: Granularity::Day,
            retention: DEFAULT_RETENTION,
            compress: false,
            utc_offset: UtcOffset::UTC,
            overwrite_on_open_failure: true,
        }
    }
}

impl RotatorConfig {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn retention(mut self, buckets: u32) -> Self {
        self.retention = buckets;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn overwrite_on_open_failure(mut self, enabled: bool) -> Self {
        self.overwrite_on_open_failure = enabled;
        self
    }

    /// Fill empty fields with defaults, absolutize the directory, and
    /// reject names that would escape the directory.
    pub(crate) fn normalized(mut self) -> Result<Self> {
        if self.dir.as_os_str().is_empty() {
            self.dir = std::env::temp_dir();
        }
        if !self.dir.is_absolute() {
            self.dir = std::env::current_dir()?.join(&self.dir);
        }
        if self.prefix.is_empty() {
            self.prefix = program_name();
        }
        if self.suffix.is_empty() {
            self.suffix = DEFAULT_SUFFIX.to_string();
        }
        for (field, value) in [("prefix", &self.prefix), ("suffix", &self.suffix)] {
            if value.contains(std::path::is_separator) {
                return Err(Error::Config(format!(
                    "{field} must not contain a path separator: {value:?}"
                )));
            }
        }
        Ok(self)
    }
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(PathBuf::from)
        .and_then(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "dailylog".to_string())
}
