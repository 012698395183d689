//! Gzip compaction of retired log files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::naming::COMPRESSED_SUFFIX;

const PARTIAL_SUFFIX: &str = ".partial";

/// Path a file is compressed to: the same name with `.gz` appended.
pub fn compressed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(COMPRESSED_SUFFIX);
    PathBuf::from(name)
}

/// Staging file for an in-flight compression of `path`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = compressed_path(path).into_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// How the staged archive reached its final name.
enum Published {
    Created,
    Appended { previous_len: u64 },
}

/// Compress `path` into `path.gz`, preserving the file mode, then remove
/// `path`.
///
/// The gzip stream is first written to an exclusively created
/// `path.gz.partial`, which also keeps a second compression of the same
/// file out. The source is opened only after that file exists, so a
/// compression that starts after another one finished sees the source gone
/// and does nothing.
///
/// If `path.gz` already exists (the bucket was reopened after it had been
/// archived), the new data is appended to it as a further gzip member;
/// read such archives with [`flate2::read::MultiGzDecoder`]. An existing
/// archive is never truncated.
///
/// On failure the source is left in place, the staging file is removed and
/// `path.gz` is restored to what it was before the call.
///
/// # Returns
///
/// Size of `path.gz` in bytes after the call.
pub fn compress_file(path: &Path) -> io::Result<u64> {
    let staging_path = partial_path(path);
    let dest_path = compressed_path(path);

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let staging = options.open(&staging_path)?;
    let result = compress_staged(path, staging, &staging_path, &dest_path);
    if let Err(err) = fs::remove_file(&staging_path) {
        if err.kind() != io::ErrorKind::NotFound {
            log::warn!("failed to remove {}: {}", staging_path.display(), err);
        }
    }
    result
}

fn compress_staged(
    path: &Path,
    staging: File,
    staging_path: &Path,
    dest_path: &Path,
) -> io::Result<u64> {
    let mut source = File::open(path)?;
    let permissions = source.metadata()?.permissions();
    staging.set_permissions(permissions)?;
    encode(&mut source, staging)?;
    drop(source);

    let published = publish(staging_path, dest_path)?;
    if let Err(err) = fs::remove_file(path) {
        unpublish(dest_path, published);
        return Err(err);
    }
    Ok(fs::metadata(dest_path)?.len())
}

fn encode(source: &mut File, dest: File) -> io::Result<()> {
    let mut encoder = GzEncoder::new(dest, Compression::default());
    io::copy(source, &mut encoder)?;
    let mut dest = encoder.finish()?;
    dest.flush()?;
    dest.sync_all()
}

/// Move the staged stream to `dest_path`, appending if an archive exists.
fn publish(staging_path: &Path, dest_path: &Path) -> io::Result<Published> {
    let mut dest = match OpenOptions::new().append(true).open(dest_path) {
        Ok(dest) => dest,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::rename(staging_path, dest_path)?;
            return Ok(Published::Created);
        }
        Err(err) => return Err(err),
    };

    let previous_len = dest.metadata()?.len();
    let appended = io::copy(&mut File::open(staging_path)?, &mut dest)
        .and_then(|_| dest.sync_all());
    if let Err(err) = appended {
        if let Err(trim) = dest.set_len(previous_len) {
            log::warn!("failed to restore {}: {}", dest_path.display(), trim);
        }
        return Err(err);
    }
    Ok(Published::Appended { previous_len })
}

fn unpublish(dest_path: &Path, published: Published) {
    let restored = match published {
        Published::Created => fs::remove_file(dest_path),
        Published::Appended { previous_len } => OpenOptions::new()
            .write(true)
            .open(dest_path)
            .and_then(|dest| dest.set_len(previous_len)),
    };
    if let Err(err) = restored {
        log::warn!("failed to restore {}: {}", dest_path.display(), err);
    }
}
