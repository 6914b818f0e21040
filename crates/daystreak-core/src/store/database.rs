//! SQLite-backed store for users, daily entries, and archives.
//!
//! Provides persistent storage for:
//! - Users and their single clock-start timestamp
//! - One entry per (user, calendar day), uniqueness enforced by the schema
//! - Append-only clock and streak history archives

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::day::DayKey;
use crate::entry::{duplicate_day_conflict, Entry, FailureLevel};
use crate::error::{CoreError, DatabaseError, Result};

use super::{data_dir, migrations};

/// A tracked user. `clock_start` is the single live abstinence-timer state:
/// NULL means stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub timezone: Option<String>,
    pub clock_start: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Immutable archive row written once per clock reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockHistoryRecord {
    pub id: i64,
    pub user_id: i64,
    pub duration_seconds: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Immutable archive row written when a user resets all progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakHistoryRecord {
    pub id: i64,
    pub user_id: i64,
    pub streak_days: i64,
    pub start_date: DayKey,
    pub end_date: DayKey,
}

/// Entry counts by reporting category. Categories are mutually exclusive;
/// the partial bucket absorbs legacy boolean-only failure rows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub total: u64,
    pub clean: u64,
    pub partial: u64,
    pub full: u64,
    pub morning: u64,
}

/// Fields for a new entry row. `had_failure` is derived from the level.
#[derive(Debug, Clone, Copy)]
pub struct NewEntry<'a> {
    pub user_id: i64,
    pub date: DayKey,
    pub level: FailureLevel,
    pub note: Option<&'a str>,
    pub morning_flag: bool,
}

/// SQLite database handle.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/daystreak/daystreak.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("daystreak.db");
        let conn = Connection::open(&path).map_err(|source| {
            CoreError::Database(DatabaseError::OpenFailed { path, source })
        })?;
        let db = Self { conn };
        migrations::migrate(&db.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Database(DatabaseError::from(e)))?;
        let db = Self { conn };
        migrations::migrate(&db.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction, rolling back on error.
    ///
    /// Used for multi-step mutations (clock reset, progress reset) so a
    /// mid-sequence failure leaves no partial state behind.
    pub fn with_immediate_tx<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    // === Users ===

    pub fn create_user(
        &self,
        name: &str,
        timezone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<User> {
        self.conn.execute(
            "INSERT INTO users (name, timezone, created_at) VALUES (?1, ?2, ?3)",
            params![name, timezone, now.to_rfc3339()],
        )?;
        self.get_user(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, name, timezone, clock_start, created_at FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| {
                CoreError::Database(DatabaseError::NotFound {
                    entity: "user",
                    key: id.to_string(),
                })
            })
    }

    pub fn find_user(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, timezone, clock_start, created_at FROM users WHERE name = ?1",
                params![name],
                row_to_user,
            )
            .optional()?)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, timezone, clock_start, created_at FROM users ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_user)?;
        collect(rows)
    }

    /// Delete a user and everything they own.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        self.with_immediate_tx(|db| {
            db.conn
                .execute("DELETE FROM entries WHERE user_id = ?1", params![id])?;
            db.conn
                .execute("DELETE FROM clock_history WHERE user_id = ?1", params![id])?;
            db.conn
                .execute("DELETE FROM streak_history WHERE user_id = ?1", params![id])?;
            db.conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn set_user_timezone(&self, id: i64, timezone: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET timezone = ?1 WHERE id = ?2",
            params![timezone, id],
        )?;
        Ok(())
    }

    // === Clock state ===

    pub fn clock_start(&self, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT clock_start FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(raw.as_deref().map(parse_instant).transpose()?)
    }

    pub fn set_clock_start(&self, user_id: i64, start: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET clock_start = ?1 WHERE id = ?2",
            params![start.to_rfc3339(), user_id],
        )?;
        Ok(())
    }

    pub fn clear_clock_start(&self, user_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET clock_start = NULL WHERE id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    // === Entries ===

    /// Insert a new entry row.
    ///
    /// A second insert for the same (user, date) fails atomically with
    /// [`crate::error::StateConflict::DuplicateEntry`]; it never silently
    /// overwrites.
    pub fn create_entry(&self, entry: &NewEntry<'_>, now: DateTime<Utc>) -> Result<Entry> {
        let ts = now.to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO entries
                     (user_id, date, had_failure, failure_level, note, morning_flag, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.user_id,
                    entry.date.to_string(),
                    entry.level.is_failure(),
                    entry.level.as_i64(),
                    entry.note,
                    entry.morning_flag,
                    ts,
                    ts,
                ],
            )
            .map_err(|e| duplicate_day_conflict(DatabaseError::from(e), entry.date))?;
        self.get_entry(self.conn.last_insert_rowid())
    }

    pub fn get_entry(&self, id: i64) -> Result<Entry> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id],
                row_to_entry,
            )
            .optional()?
            .ok_or_else(|| {
                CoreError::Database(DatabaseError::NotFound {
                    entity: "entry",
                    key: id.to_string(),
                })
            })
    }

    pub fn find_entry(&self, user_id: i64, date: DayKey) -> Result<Option<Entry>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE user_id = ?1 AND date = ?2"),
                params![user_id, date.to_string()],
                row_to_entry,
            )
            .optional()?)
    }

    /// All entries for a user, newest first.
    pub fn entries_for_user(&self, user_id: i64) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE user_id = ?1 ORDER BY date DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_entry)?;
        collect(rows)
    }

    /// Entries within `[start, end]`, ascending by date.
    pub fn entries_in_range(&self, user_id: i64, start: DayKey, end: DayKey) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date ASC"
        ))?;
        let rows = stmt.query_map(
            params![user_id, start.to_string(), end.to_string()],
            row_to_entry,
        )?;
        collect(rows)
    }

    /// Overwrite an entry's outcome. `had_failure` is kept in sync.
    pub fn update_entry_level(
        &self,
        entry_id: i64,
        level: FailureLevel,
        note: Option<&str>,
        morning_flag: bool,
        now: DateTime<Utc>,
    ) -> Result<Entry> {
        self.conn.execute(
            "UPDATE entries
             SET had_failure = ?1, failure_level = ?2, note = ?3, morning_flag = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                level.is_failure(),
                level.as_i64(),
                note,
                morning_flag,
                now.to_rfc3339(),
                entry_id,
            ],
        )?;
        self.get_entry(entry_id)
    }

    pub fn set_morning_flag(&self, entry_id: i64, flag: bool, now: DateTime<Utc>) -> Result<Entry> {
        self.conn.execute(
            "UPDATE entries SET morning_flag = ?1, updated_at = ?2 WHERE id = ?3",
            params![flag, now.to_rfc3339(), entry_id],
        )?;
        self.get_entry(entry_id)
    }

    pub fn delete_entry(&self, entry_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM entries WHERE id = ?1", params![entry_id])?;
        Ok(())
    }

    /// Wipe a user's entries. Returns the number of rows removed.
    pub fn delete_all_entries(&self, user_id: i64) -> Result<usize> {
        let n = self
            .conn
            .execute("DELETE FROM entries WHERE user_id = ?1", params![user_id])?;
        Ok(n)
    }

    /// Count entries by category in one pass.
    ///
    /// The clean/partial filters mirror the pre-migration queries: a row
    /// with `had_failure = 1` and a NULL or 0 level counts as partial.
    pub fn category_counts(&self, user_id: i64) -> Result<CategoryCounts> {
        self.conn
            .query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(had_failure = 0 AND (failure_level IS NULL OR failure_level = 0)), 0),
                    COALESCE(SUM(failure_level = 1
                                 OR (had_failure = 1 AND (failure_level IS NULL OR failure_level = 0))), 0),
                    COALESCE(SUM(failure_level = 2), 0),
                    COALESCE(SUM(morning_flag = 1), 0)
                 FROM entries WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(CategoryCounts {
                        total: row.get(0)?,
                        clean: row.get(1)?,
                        partial: row.get(2)?,
                        full: row.get(3)?,
                        morning: row.get(4)?,
                    })
                },
            )
            .map_err(|e| CoreError::Database(DatabaseError::from(e)))
    }

    /// Users lacking an entry for `date` (the scheduler's query).
    pub fn users_without_entry(&self, date: DayKey) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.name, u.timezone, u.clock_start, u.created_at
             FROM users u
             WHERE NOT EXISTS (
                 SELECT 1 FROM entries e WHERE e.user_id = u.id AND e.date = ?1
             )
             ORDER BY u.name",
        )?;
        let rows = stmt.query_map(params![date.to_string()], row_to_user)?;
        collect(rows)
    }

    // === Clock history ===

    pub fn create_clock_history(
        &self,
        user_id: i64,
        duration_seconds: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<ClockHistoryRecord> {
        self.conn.execute(
            "INSERT INTO clock_history (user_id, duration_seconds, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                duration_seconds,
                start_time.to_rfc3339(),
                end_time.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(ClockHistoryRecord {
            id,
            user_id,
            duration_seconds,
            start_time,
            end_time,
        })
    }

    /// Archived clock intervals, most recent first.
    pub fn clock_history(&self, user_id: i64) -> Result<Vec<ClockHistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, duration_seconds, start_time, end_time
             FROM clock_history WHERE user_id = ?1 ORDER BY end_time DESC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_clock_history)?;
        collect(rows)
    }

    /// Longest archived duration, 0 with no history.
    pub fn best_clock_duration(&self, user_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(duration_seconds), 0) FROM clock_history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    pub fn delete_clock_history(&self, id: i64, user_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM clock_history WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(())
    }

    pub fn delete_all_clock_history(&self, user_id: i64) -> Result<usize> {
        let n = self.conn.execute(
            "DELETE FROM clock_history WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(n)
    }

    // === Streak history ===

    pub fn create_streak_history(
        &self,
        user_id: i64,
        streak_days: i64,
        start_date: DayKey,
        end_date: DayKey,
    ) -> Result<StreakHistoryRecord> {
        self.conn.execute(
            "INSERT INTO streak_history (user_id, streak_days, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                streak_days,
                start_date.to_string(),
                end_date.to_string(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(StreakHistoryRecord {
            id,
            user_id,
            streak_days,
            start_date,
            end_date,
        })
    }

    /// Archived streaks, most recent first.
    pub fn streak_history(&self, user_id: i64) -> Result<Vec<StreakHistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, streak_days, start_date, end_date
             FROM streak_history WHERE user_id = ?1 ORDER BY end_date DESC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_streak_history)?;
        collect(rows)
    }

    /// Longest archived streak, 0 with no history.
    pub fn best_streak_days(&self, user_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(streak_days), 0) FROM streak_history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }
}

const ENTRY_COLUMNS: &str =
    "id, user_id, date, had_failure, failure_level, note, morning_flag, created_at, updated_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let clock_start: Option<String> = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        timezone: row.get(2)?,
        clock_start: clock_start
            .as_deref()
            .map(parse_instant_sql)
            .transpose()?,
        created_at: parse_instant_sql(&created_at)?,
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let date: String = row.get(2)?;
    let level: Option<i64> = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Entry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_day_sql(&date)?,
        had_failure: row.get(3)?,
        failure_level: level.and_then(FailureLevel::from_i64),
        note: row.get(5)?,
        morning_flag: row.get(6)?,
        created_at: parse_instant_sql(&created_at)?,
        updated_at: parse_instant_sql(&updated_at)?,
    })
}

fn row_to_clock_history(row: &Row<'_>) -> rusqlite::Result<ClockHistoryRecord> {
    let start: String = row.get(3)?;
    let end: String = row.get(4)?;
    Ok(ClockHistoryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        duration_seconds: row.get(2)?,
        start_time: parse_instant_sql(&start)?,
        end_time: parse_instant_sql(&end)?,
    })
}

fn row_to_streak_history(row: &Row<'_>) -> rusqlite::Result<StreakHistoryRecord> {
    let start: String = row.get(3)?;
    let end: String = row.get(4)?;
    Ok(StreakHistoryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        streak_days: row.get(2)?,
        start_date: parse_day_sql(&start)?,
        end_date: parse_day_sql(&end)?,
    })
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

fn parse_instant_sql(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_day_sql(raw: &str) -> rusqlite::Result<DayKey> {
    DayKey::parse(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(DatabaseError::from)?);
    }
    Ok(out)
}
