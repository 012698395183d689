//! Retention and compression classification.

use time::{Duration, OffsetDateTime};

use crate::naming::LogFileDescriptor;

/// What a cleanup pass is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Number of most recent buckets to keep; `0` disables deletion.
    pub retention: u32,
    /// Gzip surviving files that are not compressed yet.
    pub compress: bool,
    /// Span of one bucket.
    pub interval: Duration,
}

impl CleanupPolicy {
    /// Nothing to delete and nothing to compress.
    pub fn is_noop(&self) -> bool {
        self.retention == 0 && !self.compress
    }

    /// Oldest bucket timestamp still retained at `now`.
    ///
    /// The boundary is inclusive: a bucket starting exactly at the cutoff is
    /// kept. `None` when retention is unlimited or the window overflows.
    pub fn cutoff(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        if self.retention == 0 {
            return None;
        }
        let buckets = i32::try_from(self.retention).unwrap_or(i32::MAX);
        let window = self.interval.checked_mul(buckets)?;
        now.checked_sub(window)
    }
}

/// Files scheduled for removal and for compression.
#[derive(Debug, Default)]
pub struct CleanupPlan {
    pub remove: Vec<LogFileDescriptor>,
    pub compress: Vec<LogFileDescriptor>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.compress.is_empty()
    }
}

/// Split scanned files into stale ones to delete and survivors to compress.
pub fn plan_cleanup(
    policy: &CleanupPolicy,
    files: Vec<LogFileDescriptor>,
    now: OffsetDateTime,
) -> CleanupPlan {
    let mut plan = CleanupPlan::default();

    let remaining = match policy.cutoff(now) {
        Some(cutoff) => {
            let (remaining, stale): (Vec<_>, Vec<_>) =
                files.into_iter().partition(|file| file.timestamp >= cutoff);
            plan.remove = stale;
            remaining
        }
        None => files,
    };

    if policy.compress {
        plan.compress = remaining
            .into_iter()
            .filter(|file| !file.compressed)
            .collect();
    }
    plan
}
