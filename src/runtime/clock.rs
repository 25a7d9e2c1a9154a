//! Time sources for the logical clock.
//!
//! A time source is only consulted when a new history event is recorded.
//! Workflow code reads time exclusively through `ProcessContext::now()`,
//! which returns the timestamp of the last consumed history event, so
//! replay sees the same values as the first run.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic time: starts at `origin` and advances by `step` on every read
#[derive(Debug)]
pub struct SteppingTimeSource {
    origin: DateTime<Utc>,
    step: Duration,
    ticks: AtomicI64,
}

impl SteppingTimeSource {
    pub fn new(origin: DateTime<Utc>, step: Duration) -> Self {
        Self {
            origin,
            step,
            ticks: AtomicI64::new(0),
        }
    }

    /// Number of reads so far
    pub fn ticks(&self) -> i64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl TimeSource for SteppingTimeSource {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        // Saturates at the latest representable instant
        let offset = self.step.num_milliseconds().saturating_mul(tick);
        Duration::try_milliseconds(offset)
            .and_then(|offset| self.origin.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
