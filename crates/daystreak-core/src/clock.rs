//! The abstinence clock.
//!
//! One live timer per user, persisted as a single nullable start instant:
//!
//! ```text
//! Stopped -> (start) -> Running -> (reset) -> Stopped
//!                       Running -> (edit)  -> Running
//! ```
//!
//! Resetting the clock is also a product action: it always records the
//! current day as a full failure, even over an existing clean entry. The
//! archive write, the forced entry, and the state clear commit as one
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::day::DayKey;
use crate::entry::FailureLevel;
use crate::error::{Result, StateConflict, ValidationError};
use crate::store::database::{ClockHistoryRecord, Database, NewEntry};
use crate::time::TimeSource;

/// Note attached when a reset has to create the day's entry from scratch.
pub const RESET_NOTE: &str = "Clock reset - full failure";

/// Outcome of a clock reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockResetOutcome {
    /// The archived interval, if the clock was running for at least 1s.
    pub archived: Option<ClockHistoryRecord>,
    /// Day key of the entry forced to full failure.
    pub failed_day: DayKey,
}

/// Point-in-time view of a user's clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockStatus {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: i64,
    pub best_seconds: i64,
}

/// Per-user clock operations over the store.
pub struct ClockEngine<'a> {
    db: &'a Database,
    time: &'a dyn TimeSource,
}

impl<'a> ClockEngine<'a> {
    pub fn new(db: &'a Database, time: &'a dyn TimeSource) -> Self {
        Self { db, time }
    }

    /// Start the clock.
    ///
    /// # Errors
    /// [`StateConflict::ClockAlreadyRunning`] if a start instant is set.
    pub fn start(&self, user_id: i64) -> Result<DateTime<Utc>> {
        if self.db.clock_start(user_id)?.is_some() {
            return Err(StateConflict::ClockAlreadyRunning.into());
        }
        let now = self.time.now();
        self.db.set_clock_start(user_id, now)?;
        Ok(now)
    }

    /// Whole seconds elapsed on the live clock; 0 when stopped.
    ///
    /// Clamped to >= 0 so clock skew can never produce a negative figure.
    pub fn elapsed_seconds(&self, user_id: i64) -> Result<i64> {
        match self.db.clock_start(user_id)? {
            Some(start) => Ok((self.time.now() - start).num_seconds().max(0)),
            None => Ok(0),
        }
    }

    /// Rewind the running clock to show a chosen elapsed time.
    ///
    /// Recomputes `clock_start = now - (days, hours, minutes)`. Never
    /// writes history.
    ///
    /// # Errors
    /// [`StateConflict::ClockNotRunning`] when stopped;
    /// [`ValidationError::InvalidValue`] for hours > 23 or minutes > 59.
    pub fn edit(&self, user_id: i64, days: u32, hours: u32, minutes: u32) -> Result<DateTime<Utc>> {
        if hours > 23 {
            return Err(ValidationError::InvalidValue {
                field: "hours",
                message: format!("{hours} is not in 0..=23"),
            }
            .into());
        }
        if minutes > 59 {
            return Err(ValidationError::InvalidValue {
                field: "minutes",
                message: format!("{minutes} is not in 0..=59"),
            }
            .into());
        }
        if self.db.clock_start(user_id)?.is_none() {
            return Err(StateConflict::ClockNotRunning.into());
        }

        let total_seconds =
            i64::from(days) * 86_400 + i64::from(hours) * 3_600 + i64::from(minutes) * 60;
        let new_start = self.time.now() - chrono::Duration::seconds(total_seconds);
        self.db.set_clock_start(user_id, new_start)?;
        Ok(new_start)
    }

    /// Reset the clock and record today as a full failure.
    ///
    /// In one transaction: archives the finished interval (when running
    /// and >= 1s elapsed), forces today's entry to level 2 -- creating it
    /// with [`RESET_NOTE`] if absent, overwriting the level but keeping
    /// the note if present -- and clears the start instant. Runs whether
    /// or not the clock is running; the failure entry is unconditional.
    pub fn reset(&self, user_id: i64, tz_name: &str) -> Result<ClockResetOutcome> {
        let now = self.time.now();
        let today = DayKey::today(tz_name, self.time);

        self.db.with_immediate_tx(|db| {
            let mut archived = None;
            if let Some(start) = db.clock_start(user_id)? {
                let duration = (now - start).num_seconds().max(0);
                if duration >= 1 {
                    archived = Some(db.create_clock_history(user_id, duration, start, now)?);
                }
            }

            match db.find_entry(user_id, today)? {
                Some(existing) => {
                    db.update_entry_level(
                        existing.id,
                        FailureLevel::Full,
                        existing.note.as_deref(),
                        existing.morning_flag,
                        now,
                    )?;
                }
                None => {
                    db.create_entry(
                        &NewEntry {
                            user_id,
                            date: today,
                            level: FailureLevel::Full,
                            note: Some(RESET_NOTE),
                            morning_flag: false,
                        },
                        now,
                    )?;
                }
            }

            db.clear_clock_start(user_id)?;
            Ok(ClockResetOutcome {
                archived,
                failed_day: today,
            })
        })
    }

    /// Longest duration ever: the live run may exceed every archived one.
    pub fn best_duration_seconds(&self, user_id: i64) -> Result<i64> {
        let archived = self.db.best_clock_duration(user_id)?;
        let live = self.elapsed_seconds(user_id)?;
        Ok(archived.max(live))
    }

    /// Full status snapshot for dashboards.
    pub fn status(&self, user_id: i64) -> Result<ClockStatus> {
        let started_at = self.db.clock_start(user_id)?;
        Ok(ClockStatus {
            running: started_at.is_some(),
            started_at,
            elapsed_seconds: self.elapsed_seconds(user_id)?,
            best_seconds: self.best_duration_seconds(user_id)?,
        })
    }
}
