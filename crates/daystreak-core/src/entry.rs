//! Daily log entries.
//!
//! One entry per (user, calendar day), enforced by a uniqueness constraint
//! in the store. The outcome is tri-state ([`FailureLevel`]); `had_failure`
//! is carried alongside as a derived boolean because rows written before
//! the tri-state column existed have no level and older queries filter on
//! the boolean.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::day::DayKey;
use crate::error::{CoreError, DatabaseError, Result, StateConflict};
use crate::store::database::{Database, NewEntry};
use crate::time::TimeSource;

/// Tri-state outcome of a logged day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureLevel {
    Clean,
    Partial,
    Full,
}

impl FailureLevel {
    pub fn as_i64(self) -> i64 {
        match self {
            FailureLevel::Clean => 0,
            FailureLevel::Partial => 1,
            FailureLevel::Full => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(FailureLevel::Clean),
            1 => Some(FailureLevel::Partial),
            2 => Some(FailureLevel::Full),
            _ => None,
        }
    }

    /// Whether this level counts as a failure at all.
    pub fn is_failure(self) -> bool {
        !matches!(self, FailureLevel::Clean)
    }
}

/// Mutually-exclusive reporting category for an entry.
///
/// Differs from [`FailureLevel`] only for legacy rows: a pre-migration row
/// with `had_failure = true` and a NULL (or 0) level is counted as Partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCategory {
    Clean,
    Partial,
    Full,
}

/// A single day's log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub user_id: i64,
    pub date: DayKey,
    pub had_failure: bool,
    /// NULL for rows written before the tri-state migration.
    pub failure_level: Option<FailureLevel>,
    pub note: Option<String>,
    pub morning_flag: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Reporting category, applying the legacy compatibility rule.
    pub fn category(&self) -> EntryCategory {
        match self.failure_level {
            Some(FailureLevel::Full) => EntryCategory::Full,
            Some(FailureLevel::Partial) => EntryCategory::Partial,
            Some(FailureLevel::Clean) | None => {
                if self.had_failure {
                    EntryCategory::Partial
                } else {
                    EntryCategory::Clean
                }
            }
        }
    }
}

/// Entry logging operations: manual logs, quick check-ins, deletion, and
/// month views. Date strings are validated before any store call.
pub struct EntryLog<'a> {
    db: &'a Database,
    time: &'a dyn TimeSource,
}

impl<'a> EntryLog<'a> {
    pub fn new(db: &'a Database, time: &'a dyn TimeSource) -> Self {
        Self { db, time }
    }

    /// Log (or overwrite) an entry for a specific day.
    ///
    /// Manual logging is an upsert: re-submitting a day updates the
    /// existing row rather than failing on the uniqueness constraint.
    pub fn log(
        &self,
        user_id: i64,
        date: &str,
        level: FailureLevel,
        note: Option<&str>,
    ) -> Result<Entry> {
        let date = DayKey::parse(date)?;
        self.upsert(user_id, date, level, note)
    }

    /// Quick check-in for today in the user's timezone.
    pub fn check_in_today(
        &self,
        user_id: i64,
        tz_name: &str,
        level: FailureLevel,
        note: Option<&str>,
    ) -> Result<Entry> {
        let today = DayKey::today(tz_name, self.time);
        self.upsert(user_id, today, level, note)
    }

    fn upsert(
        &self,
        user_id: i64,
        date: DayKey,
        level: FailureLevel,
        note: Option<&str>,
    ) -> Result<Entry> {
        let now = self.time.now();
        if let Some(existing) = self.db.find_entry(user_id, date)? {
            return self
                .db
                .update_entry_level(existing.id, level, note, existing.morning_flag, now);
        }
        self.db.create_entry(
            &NewEntry {
                user_id,
                date,
                level,
                note,
                morning_flag: false,
            },
            now,
        )
    }

    /// Toggle the morning flag on an existing day.
    pub fn set_morning_flag(&self, user_id: i64, date: &str, flag: bool) -> Result<Entry> {
        let date = DayKey::parse(date)?;
        let entry = self.db.find_entry(user_id, date)?.ok_or_else(|| {
            CoreError::Database(DatabaseError::NotFound {
                entity: "entry",
                key: date.to_string(),
            })
        })?;
        self.db.set_morning_flag(entry.id, flag, self.time.now())
    }

    /// Delete one day's entry. Ownership is implied by the (user, date) key.
    pub fn delete(&self, user_id: i64, date: &str) -> Result<Entry> {
        let date = DayKey::parse(date)?;
        let entry = self.db.find_entry(user_id, date)?.ok_or_else(|| {
            CoreError::Database(DatabaseError::NotFound {
                entity: "entry",
                key: date.to_string(),
            })
        })?;
        self.db.delete_entry(entry.id)?;
        Ok(entry)
    }

    /// All entries within a calendar month, ascending by date.
    pub fn month(&self, user_id: i64, year: i32, month: u32) -> Result<Vec<Entry>> {
        let first = chrono::NaiveDate::from_ymd_opt(year, month, 1).ok_or(
            crate::error::ValidationError::InvalidValue {
                field: "month",
                message: format!("{year}-{month} is not a calendar month"),
            },
        )?;
        let last = first
            .checked_add_months(chrono::Months::new(1))
            .and_then(|d| d.pred_opt())
            .ok_or(crate::error::ValidationError::InvalidValue {
                field: "month",
                message: format!("{year}-{month} is out of range"),
            })?;
        self.db
            .entries_in_range(user_id, DayKey::new(first), DayKey::new(last))
    }
}

/// Map a duplicate-day constraint failure to a distinct conflict error.
pub(crate) fn duplicate_day_conflict(err: DatabaseError, date: DayKey) -> CoreError {
    if err.is_constraint() {
        CoreError::Conflict(StateConflict::DuplicateEntry {
            date: date.to_string(),
        })
    } else {
        CoreError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedTimeSource;

    fn setup() -> (Database, FixedTimeSource) {
        let db = Database::open_memory().unwrap();
        let time = FixedTimeSource::new("2024-06-10T18:00:00Z".parse().unwrap());
        (db, time)
    }

    fn user(db: &Database, time: &FixedTimeSource) -> i64 {
        db.create_user("sam", Some("UTC"), time.now()).unwrap().id
    }

    #[test]
    fn category_applies_legacy_partial_rule() {
        let (db, time) = setup();
        let uid = user(&db, &time);
        let log = EntryLog::new(&db, &time);
        let entry = log
            .log(uid, "2024-06-01", FailureLevel::Clean, None)
            .unwrap();
        assert_eq!(entry.category(), EntryCategory::Clean);

        // Simulate a pre-migration row: failure recorded only as a boolean.
        db.conn()
            .execute(
                "UPDATE entries SET had_failure = 1, failure_level = NULL WHERE id = ?1",
                [entry.id],
            )
            .unwrap();
        let legacy = db
            .find_entry(uid, DayKey::parse("2024-06-01").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(legacy.category(), EntryCategory::Partial);
    }

    #[test]
    fn log_upserts_instead_of_failing_on_duplicate() {
        let (db, time) = setup();
        let uid = user(&db, &time);
        let log = EntryLog::new(&db, &time);
        let first = log
            .log(uid, "2024-06-09", FailureLevel::Clean, Some("fine"))
            .unwrap();
        let second = log
            .log(uid, "2024-06-09", FailureLevel::Partial, Some("slipped"))
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.failure_level, Some(FailureLevel::Partial));
        assert!(second.had_failure);
        assert_eq!(second.note.as_deref(), Some("slipped"));
    }

    #[test]
    fn check_in_today_buckets_by_timezone() {
        let (db, time) = setup();
        let uid = user(&db, &time);
        let log = EntryLog::new(&db, &time);
        // 18:00 UTC on June 10 is still June 10 in Los Angeles.
        let entry = log
            .check_in_today(uid, "America/Los_Angeles", FailureLevel::Clean, None)
            .unwrap();
        assert_eq!(entry.date.to_string(), "2024-06-10");
    }

    #[test]
    fn bad_date_is_rejected_before_any_write() {
        let (db, time) = setup();
        let uid = user(&db, &time);
        let log = EntryLog::new(&db, &time);
        let err = log.log(uid, "June 9", FailureLevel::Clean, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(db.entries_for_user(uid).unwrap().is_empty());
    }

    #[test]
    fn delete_requires_an_existing_entry() {
        let (db, time) = setup();
        let uid = user(&db, &time);
        let log = EntryLog::new(&db, &time);
        assert!(log.delete(uid, "2024-06-09").is_err());
        log.log(uid, "2024-06-09", FailureLevel::Clean, None).unwrap();
        let deleted = log.delete(uid, "2024-06-09").unwrap();
        assert_eq!(deleted.date.to_string(), "2024-06-09");
        assert!(db.entries_for_user(uid).unwrap().is_empty());
    }

    #[test]
    fn month_view_spans_the_whole_month() {
        let (db, time) = setup();
        let uid = user(&db, &time);
        let log = EntryLog::new(&db, &time);
        for date in ["2024-05-31", "2024-06-01", "2024-06-30", "2024-07-01"] {
            log.log(uid, date, FailureLevel::Clean, None).unwrap();
        }
        let june = log.month(uid, 2024, 6).unwrap();
        let dates: Vec<String> = june.iter().map(|e| e.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-06-01", "2024-06-30"]);
        assert!(log.month(uid, 2024, 13).is_err());
    }
}
