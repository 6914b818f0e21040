//! Injected time capability.
//!
//! Engines never read the wall clock directly; they take a [`TimeSource`]
//! so elapsed-time and day-boundary logic can be tested deterministically.

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait TimeSource {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed, manually-advanced time source for tests.
#[derive(Debug)]
pub struct FixedTimeSource {
    now: std::cell::Cell<DateTime<Utc>>,
}

impl FixedTimeSource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::cell::Cell::new(now),
        }
    }

    /// Move the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        let next = self.now.get() + chrono::Duration::seconds(secs);
        self.now.set(next);
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
