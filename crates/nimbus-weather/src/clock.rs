//! Wall-clock source for expiration checks and sun-position math.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{Local, Utc};

/// Source of "now" and the local timezone offset.
pub trait Clock: Send + Sync {
    /// Unix time in milliseconds
    fn now_ms(&self) -> i64;

    /// Local time minus UTC, in milliseconds (east of Greenwich is positive)
    fn utc_offset_ms(&self) -> i64;
}

/// The system clock in the machine's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn utc_offset_ms(&self) -> i64 {
        i64::from(Local::now().offset().local_minus_utc()) * 1000
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
    offset_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
            offset_ms: AtomicI64::new(0),
        }
    }

    pub fn with_utc_offset(self, offset: chrono::Duration) -> Self {
        self.offset_ms.store(offset.num_milliseconds(), Ordering::SeqCst);
        self
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn utc_offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::SeqCst)
    }
}
