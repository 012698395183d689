use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dailylog::{Granularity, ManualClock, Rotator, RotatorConfig};
use tempfile::tempdir;
use time::macros::datetime;
use time::OffsetDateTime;

const T0: OffsetDateTime = datetime!(2024-01-29 10:00:00 UTC);

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

fn exists(dir: &Path, name: &str) -> bool {
    dir.join(name).exists()
}

#[test]
fn second_buckets_keep_two_and_compress_retired() {
    let dir = tempdir().expect("tempdir");
    // Half a second into the last bucket the cutoff is T0+1.5s, so T0+1s
    // falls outside the window. At exactly T0+3s it would be kept; see
    // `bucket_on_the_cutoff_is_kept`.
    let clock = Arc::new(ManualClock::new(T0 + time::Duration::milliseconds(3_500)));
    let config = RotatorConfig::new(dir.path(), "app")
        .suffix(".log")
        .granularity(Granularity::Second)
        .retention(2)
        .compress(true);
    let rotator = Rotator::with_clock(config, clock).expect("rotator");

    for offset in 0..4 {
        let at = T0 + time::Duration::seconds(offset);
        let line = format!("line {offset}\n");
        rotator.write_at(line.as_bytes(), at).expect("write");
    }

    let settled = wait_until(|| {
        !exists(dir.path(), "app_2024-01-29-10-00-00.log")
            && !exists(dir.path(), "app_2024-01-29-10-00-01.log")
            && exists(dir.path(), "app_2024-01-29-10-00-02.log.gz")
            && !exists(dir.path(), "app_2024-01-29-10-00-02.log")
    });
    assert!(settled, "cleanup did not reach the expected state");

    assert!(!exists(dir.path(), "app_2024-01-29-10-00-00.log.gz"));
    assert!(!exists(dir.path(), "app_2024-01-29-10-00-01.log.gz"));
    let active = dir.path().join("app_2024-01-29-10-00-03.log");
    assert_eq!(fs::read(&active).expect("read active"), b"line 3\n");
    assert_eq!(rotator.current_path(), Some(active));
    assert!(rotator.cleanup_runs() >= 1);
}

#[test]
fn bucket_on_the_cutoff_is_kept() {
    let dir = tempdir().expect("tempdir");
    // cutoff = T0+3s - 2 * 1s = T0+1s, which is retained.
    let clock = Arc::new(ManualClock::new(T0 + time::Duration::seconds(3)));
    let config = RotatorConfig::new(dir.path(), "app")
        .granularity(Granularity::Second)
        .retention(2)
        .compress(true);
    let rotator = Rotator::with_clock(config, clock).expect("rotator");

    for offset in 0..4 {
        let at = T0 + time::Duration::seconds(offset);
        rotator
            .write_at(format!("line {offset}\n").as_bytes(), at)
            .expect("write");
    }

    let settled = wait_until(|| {
        !exists(dir.path(), "app_2024-01-29-10-00-00.log")
            && exists(dir.path(), "app_2024-01-29-10-00-01.log.gz")
            && exists(dir.path(), "app_2024-01-29-10-00-02.log.gz")
            && !exists(dir.path(), "app_2024-01-29-10-00-01.log")
            && !exists(dir.path(), "app_2024-01-29-10-00-02.log")
    });
    assert!(settled, "cleanup did not reach the expected state");
    assert!(!exists(dir.path(), "app_2024-01-29-10-00-00.log.gz"));
    assert!(exists(dir.path(), "app_2024-01-29-10-00-03.log"));
}

#[test]
fn first_rotation_cleans_files_left_by_earlier_runs() {
    let dir = tempdir().expect("tempdir");
    for name in [
        "svc_2024-01-01.log",
        "svc_2024-01-02.log.gz",
        "svc_2024-01-28.log",
        "svc.pid",
    ] {
        fs::write(dir.path().join(name), b"old\n").expect("seed");
    }

    let clock = Arc::new(ManualClock::new(datetime!(2024-01-29 12:00 UTC)));
    let config = RotatorConfig::new(dir.path(), "svc")
        .granularity(Granularity::Day)
        .retention(7)
        .compress(false);
    let rotator = Rotator::with_clock(config, clock).expect("rotator");

    rotator
        .write_at(b"yesterday\n", datetime!(2024-01-28 23:59 UTC))
        .expect("write yesterday");
    rotator
        .write_at(b"today\n", datetime!(2024-01-29 00:01 UTC))
        .expect("write today");

    let settled = wait_until(|| {
        !exists(dir.path(), "svc_2024-01-01.log") && !exists(dir.path(), "svc_2024-01-02.log.gz")
    });
    assert!(settled, "stale files were not removed");
    assert_eq!(
        fs::read(dir.path().join("svc_2024-01-28.log")).expect("read retained"),
        b"old\nyesterday\n"
    );
    assert!(exists(dir.path(), "svc.pid"));
}

#[test]
fn cleanup_now_is_idempotent_for_compression() {
    let dir = tempdir().expect("tempdir");
    for name in ["app_2024-01-27.log", "app_2024-01-28.log"] {
        fs::write(dir.path().join(name), b"retired\n").expect("seed");
    }

    let clock = Arc::new(ManualClock::new(datetime!(2024-01-29 12:00 UTC)));
    let config = RotatorConfig::new(dir.path(), "app")
        .retention(0)
        .compress(true);
    let rotator = Rotator::with_clock(config, clock).expect("rotator");

    let first = rotator.cleanup_now().expect("first pass");
    assert_eq!(first.compressed.len(), 2);
    let second = rotator.cleanup_now().expect("second pass");
    assert!(second.compressed.is_empty());
    assert!(exists(dir.path(), "app_2024-01-27.log.gz"));
    assert!(exists(dir.path(), "app_2024-01-28.log.gz"));
}

fn read_archive(path: &Path) -> Option<Vec<u8>> {
    let file = fs::File::open(path).ok()?;
    let mut decoded = Vec::new();
    flate2::read::MultiGzDecoder::new(file)
        .read_to_end(&mut decoded)
        .ok()?;
    Some(decoded)
}

#[test]
fn late_record_for_archived_bucket_is_appended_to_archive() {
    let dir = tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(T0 + time::Duration::seconds(5)));
    let config = RotatorConfig::new(dir.path(), "app")
        .granularity(Granularity::Second)
        .retention(0)
        .compress(true);
    let rotator = Rotator::with_clock(config, clock).expect("rotator");
    let t1 = T0 + time::Duration::seconds(1);
    let first_gz = dir.path().join("app_2024-01-29-10-00-00.log.gz");
    let second_gz = dir.path().join("app_2024-01-29-10-00-01.log.gz");

    rotator.write_at(b"first\n", T0).expect("write");
    rotator.write_at(b"second\n", t1).expect("write");
    assert!(wait_until(|| read_archive(&first_gz).as_deref() == Some(&b"first\n"[..])));

    // Reopens the archived bucket as a fresh plain file.
    rotator.write_at(b"late\n", T0).expect("write");
    assert!(wait_until(|| read_archive(&second_gz).as_deref() == Some(&b"second\n"[..])));

    rotator.write_at(b"third\n", t1).expect("write");
    assert!(wait_until(|| {
        !exists(dir.path(), "app_2024-01-29-10-00-00.log")
            && read_archive(&first_gz).as_deref() == Some(&b"first\nlate\n"[..])
    }));
    assert_eq!(
        fs::read(dir.path().join("app_2024-01-29-10-00-01.log")).expect("read active"),
        b"third\n"
    );
}
