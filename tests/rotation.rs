use std::fs;
use std::sync::Arc;
use std::thread;

use dailylog::{Granularity, ManualClock, Rotator, RotatorConfig};
use tempfile::tempdir;
use time::macros::datetime;

fn config(dir: &std::path::Path) -> RotatorConfig {
    RotatorConfig::new(dir, "app")
        .granularity(Granularity::Hour)
        .retention(0)
        .compress(false)
}

#[test]
fn writes_land_in_their_bucket_files() {
    let dir = tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(datetime!(2024-01-29 07:00 UTC)));
    let rotator = Rotator::with_clock(config(dir.path()), clock).expect("rotator");

    rotator
        .write_at(b"t1-a\n", datetime!(2024-01-29 07:15 UTC))
        .expect("write t1");
    rotator
        .write_at(b"t1-b\n", datetime!(2024-01-29 07:59:59 UTC))
        .expect("write t1");
    rotator
        .write_at(b"t2\n", datetime!(2024-01-29 08:00 UTC))
        .expect("write t2");

    let first = dir.path().join("app_2024-01-29-07.log");
    let second = dir.path().join("app_2024-01-29-08.log");
    assert_eq!(fs::read(first).expect("read first"), b"t1-a\nt1-b\n");
    assert_eq!(fs::read(second).expect("read second"), b"t2\n");
}

#[test]
fn rotating_back_appends_instead_of_truncating() {
    let dir = tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(datetime!(2024-01-29 07:00 UTC)));
    let rotator = Rotator::with_clock(config(dir.path()), clock).expect("rotator");

    rotator
        .write_at(b"early\n", datetime!(2024-01-29 07:59 UTC))
        .expect("write");
    rotator
        .write_at(b"next\n", datetime!(2024-01-29 08:00 UTC))
        .expect("write");
    rotator
        .write_at(b"late arrival\n", datetime!(2024-01-29 07:59:30 UTC))
        .expect("write");

    let first = dir.path().join("app_2024-01-29-07.log");
    assert_eq!(fs::read(first).expect("read"), b"early\nlate arrival\n");
}

#[test]
fn concurrent_writers_never_interleave_lines() {
    const THREADS: usize = 8;
    const LINES: usize = 500;

    let dir = tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(datetime!(2024-01-29 07:00 UTC)));
    let rotator = Arc::new(Rotator::with_clock(config(dir.path()), clock).expect("rotator"));

    let handles: Vec<_> = (0..THREADS)
        .map(|writer| {
            let rotator = Arc::clone(&rotator);
            thread::spawn(move || {
                for line in 0..LINES {
                    let at = if line < LINES / 2 {
                        datetime!(2024-01-29 07:30 UTC)
                    } else {
                        datetime!(2024-01-29 08:30 UTC)
                    };
                    let text = format!("writer={writer} line={line} {}\n", "x".repeat(200));
                    rotator.write_at(text.as_bytes(), at).expect("write");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }
    rotator.close().expect("close");

    let mut total = 0;
    for name in ["app_2024-01-29-07.log", "app_2024-01-29-08.log"] {
        let content = fs::read_to_string(dir.path().join(name)).expect("read");
        for line in content.lines() {
            assert!(line.starts_with("writer="), "torn line: {line:?}");
            assert!(line.ends_with(&"x".repeat(200)), "torn line: {line:?}");
            total += 1;
        }
    }
    assert_eq!(total, THREADS * LINES);
}
