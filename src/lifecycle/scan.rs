//! Directory listing for managed log files.

use std::ffi::OsStr;
use std::fs;
use std::io;

use crate::naming::{FilenameCodec, LogFileDescriptor};

/// List the managed files in the codec's directory, newest bucket first.
///
/// Subdirectories, the active file, and anything that does not decode as
/// `{prefix}_{bucket}{suffix}` or `{prefix}_{bucket}{suffix}.gz` are skipped.
/// Files with equal buckets keep their directory order.
pub fn scan_log_files(
    codec: &FilenameCodec,
    active: Option<&OsStr>,
) -> io::Result<Vec<LogFileDescriptor>> {
    let entries = match fs::read_dir(codec.dir()) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        // Vanished since the listing was taken.
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        if Some(file_name.as_os_str()) == active {
            continue;
        }
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if let Ok((timestamp, compressed)) = codec.decode_any(name) {
            files.push(LogFileDescriptor {
                timestamp,
                compressed,
                entry,
            });
        }
    }

    files.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(files)
}
