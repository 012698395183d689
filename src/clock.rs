use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

/// A source of wall-clock time for bucket selection and retention cutoffs.
///
/// Rotators and the compactor never read the system clock directly, so
/// tests and replays can drive time explicitly.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// A clock backed by the system wall clock (`OffsetDateTime::now_utc`).
///
/// Susceptible to NTP adjustments; a backwards jump only means the next
/// write lands in an earlier bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: OffsetDateTime) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
