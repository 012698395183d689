//! Filename <-> time bucket codec.
//!
//! Managed files are named `{prefix}_{bucket}{suffix}` and, once compacted,
//! `{prefix}_{bucket}{suffix}.gz`. Decoding an encoded name always yields the
//! start of the bucket it was encoded from.

use std::fs::DirEntry;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

use crate::granularity::Granularity;
use crate::Result;

/// Suffix appended to a file once it has been gzip-compressed.
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Separator between the prefix and the rendered bucket.
pub const BUCKET_SEPARATOR: char = '_';

/// Why a filename is not one of ours.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("mismatched prefix")]
    PrefixMismatch,
    #[error("mismatched suffix")]
    SuffixMismatch,
    #[error("mismatched bucket length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("malformed bucket: {0}")]
    Parse(#[from] time::error::Parse),
}

/// Encodes bucket timestamps into filenames under one directory and back.
#[derive(Debug, Clone)]
pub struct FilenameCodec {
    dir: PathBuf,
    prefix: String,
    suffix: String,
    compressed_suffix: String,
    granularity: Granularity,
    offset: UtcOffset,
}

impl FilenameCodec {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        granularity: Granularity,
        offset: UtcOffset,
    ) -> Self {
        let suffix = suffix.into();
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            compressed_suffix: format!("{suffix}{COMPRESSED_SUFFIX}"),
            suffix,
            granularity,
            offset,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Bare filename for the bucket containing `at`.
    pub fn file_name(&self, at: OffsetDateTime) -> Result<String> {
        let bucket = self.granularity.render(at, self.offset)?;
        Ok(format!(
            "{}{BUCKET_SEPARATOR}{bucket}{}",
            self.prefix, self.suffix
        ))
    }

    /// Full path of the file for the bucket containing `at`.
    pub fn encode(&self, at: OffsetDateTime) -> Result<PathBuf> {
        Ok(self.dir.join(self.file_name(at)?))
    }

    /// Decode a bare filename against the plain suffix.
    pub fn decode(&self, file_name: &str) -> std::result::Result<OffsetDateTime, DecodeError> {
        self.decode_with_suffix(file_name, &self.suffix)
    }

    /// Decode a bare filename against the plain suffix, then against the
    /// compressed one. Returns the bucket and whether the file is compressed.
    pub fn decode_any(
        &self,
        file_name: &str,
    ) -> std::result::Result<(OffsetDateTime, bool), DecodeError> {
        match self.decode_with_suffix(file_name, &self.suffix) {
            Ok(at) => Ok((at, false)),
            Err(_) => self
                .decode_with_suffix(file_name, &self.compressed_suffix)
                .map(|at| (at, true)),
        }
    }

    fn decode_with_suffix(
        &self,
        file_name: &str,
        suffix: &str,
    ) -> std::result::Result<OffsetDateTime, DecodeError> {
        let rest = file_name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(BUCKET_SEPARATOR))
            .ok_or(DecodeError::PrefixMismatch)?;
        let bucket = rest
            .strip_suffix(suffix)
            .ok_or(DecodeError::SuffixMismatch)?;
        self.granularity.parse(bucket, self.offset)
    }
}

/// A managed file found in the log directory.
#[derive(Debug)]
pub struct LogFileDescriptor {
    /// Start of the bucket decoded from the filename.
    pub timestamp: OffsetDateTime,
    /// Whether the name carries the compressed suffix.
    pub compressed: bool,
    pub entry: DirEntry,
}

impl LogFileDescriptor {
    pub fn path(&self) -> PathBuf {
        self.entry.path()
    }
}
