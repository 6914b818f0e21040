//! Summary aggregation.
//!
//! Combines the streak engine, the clock engine, and the archives into one
//! consistent report. Read-only and recomputed from scratch on every call;
//! an empty store yields a zeroed summary, never an error, so dashboards
//! always render.

use serde::{Deserialize, Serialize};

use crate::clock::ClockEngine;
use crate::day::DayKey;
use crate::error::Result;
use crate::store::database::{CategoryCounts, Database};
use crate::streak::{streak_runs, StreakEngine, StreakRun};
use crate::time::TimeSource;

/// One consistent snapshot of a user's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub current_streak: u32,
    pub longest_streak: u32,

    pub total_days: u64,
    pub clean_days: u64,
    pub partial_days: u64,
    pub failed_days: u64,
    pub morning_days: u64,
    /// `round(100 * clean / total)`; 0 when there are no entries.
    pub success_rate: u32,

    pub clock_running: bool,
    pub clock_seconds: i64,
    /// Whole days on the live clock.
    pub clock_days: i64,
    pub best_clock_seconds: i64,
    pub best_clock_days: i64,

    pub last_entry: Option<DayKey>,
    /// Clean runs, longest first; the trailing run is marked ongoing.
    pub streaks: Vec<StreakRun>,
}

/// Build the full summary for one user.
pub fn build_summary(
    db: &Database,
    time: &dyn TimeSource,
    user_id: i64,
    tz_name: &str,
) -> Result<Summary> {
    let streaks = StreakEngine::new(db, time);
    let clock = ClockEngine::new(db, time);

    let current_streak = streaks.current_streak(user_id, tz_name)?;
    let longest_streak = streaks.longest_streak(user_id)?;
    let counts = db.category_counts(user_id)?;

    let clock_seconds = clock.elapsed_seconds(user_id)?;
    let best_clock_seconds = clock.best_duration_seconds(user_id)?;
    let running = db.clock_start(user_id)?.is_some();

    let entries = db.entries_for_user(user_id)?;
    let last_entry = entries.first().map(|e| e.date); // newest first
    let runs = streak_runs(&entries);

    Ok(Summary {
        current_streak,
        longest_streak,
        total_days: counts.total,
        clean_days: counts.clean,
        partial_days: counts.partial,
        failed_days: counts.full,
        morning_days: counts.morning,
        success_rate: success_rate(counts),
        clock_running: running,
        clock_seconds,
        clock_days: clock_seconds / 86_400,
        best_clock_seconds,
        best_clock_days: best_clock_seconds / 86_400,
        last_entry,
        streaks: runs,
    })
}

/// Percentage of clean days, rounded; 0 for an empty history.
fn success_rate(counts: CategoryCounts) -> u32 {
    if counts.total == 0 {
        return 0;
    }
    ((counts.clean as f64 / counts.total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockEngine;
    use crate::entry::{EntryLog, FailureLevel};
    use crate::time::FixedTimeSource;

    fn setup() -> (Database, FixedTimeSource, i64) {
        let db = Database::open_memory().unwrap();
        let time = FixedTimeSource::new("2024-06-10T12:00:00Z".parse().unwrap());
        let user = db.create_user("sam", Some("UTC"), time.now()).unwrap();
        (db, time, user.id)
    }

    #[test]
    fn empty_store_yields_a_zeroed_summary() {
        let (db, time, uid) = setup();
        let summary = build_summary(&db, &time, uid, "UTC").unwrap();
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_streak, 0);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.success_rate, 0);
        assert!(!summary.clock_running);
        assert_eq!(summary.best_clock_seconds, 0);
        assert!(summary.last_entry.is_none());
        assert!(summary.streaks.is_empty());
    }

    #[test]
    fn counts_and_success_rate() {
        let (db, time, uid) = setup();
        let log = EntryLog::new(&db, &time);
        log.log(uid, "2024-06-07", FailureLevel::Clean, None).unwrap();
        log.log(uid, "2024-06-08", FailureLevel::Clean, None).unwrap();
        log.log(uid, "2024-06-09", FailureLevel::Partial, None).unwrap();
        log.log(uid, "2024-06-10", FailureLevel::Full, None).unwrap();

        let summary = build_summary(&db, &time, uid, "UTC").unwrap();
        assert_eq!(summary.total_days, 4);
        assert_eq!(summary.clean_days, 2);
        assert_eq!(summary.partial_days, 1);
        assert_eq!(summary.failed_days, 1);
        assert_eq!(summary.success_rate, 50);
        // All four days tracked, failures included.
        assert_eq!(summary.current_streak, 4);
        assert_eq!(summary.longest_streak, 4);
        assert_eq!(summary.last_entry.unwrap().to_string(), "2024-06-10");
    }

    #[test]
    fn success_rate_rounds() {
        let (db, time, uid) = setup();
        let log = EntryLog::new(&db, &time);
        log.log(uid, "2024-06-08", FailureLevel::Clean, None).unwrap();
        log.log(uid, "2024-06-09", FailureLevel::Clean, None).unwrap();
        log.log(uid, "2024-06-10", FailureLevel::Partial, None).unwrap();
        let summary = build_summary(&db, &time, uid, "UTC").unwrap();
        // 2/3 -> 66.66 -> 67.
        assert_eq!(summary.success_rate, 67);
    }

    #[test]
    fn clock_figures_flow_through() {
        let (db, time, uid) = setup();
        db.create_clock_history(uid, 200_000, time.now(), time.now())
            .unwrap();
        let clock = ClockEngine::new(&db, &time);
        clock.start(uid).unwrap();
        time.advance_secs(90_000);

        let summary = build_summary(&db, &time, uid, "UTC").unwrap();
        assert!(summary.clock_running);
        assert_eq!(summary.clock_seconds, 90_000);
        assert_eq!(summary.clock_days, 1);
        assert_eq!(summary.best_clock_seconds, 200_000);
        assert_eq!(summary.best_clock_days, 2);
    }

    #[test]
    fn breakdown_is_longest_first_with_ongoing_tail() {
        let (db, time, uid) = setup();
        let log = EntryLog::new(&db, &time);
        for d in ["2024-06-01", "2024-06-02", "2024-06-03"] {
            log.log(uid, d, FailureLevel::Clean, None).unwrap();
        }
        log.log(uid, "2024-06-04", FailureLevel::Full, None).unwrap();
        for d in ["2024-06-09", "2024-06-10"] {
            log.log(uid, d, FailureLevel::Clean, None).unwrap();
        }

        let summary = build_summary(&db, &time, uid, "UTC").unwrap();
        assert_eq!(summary.streaks.len(), 2);
        assert_eq!(summary.streaks[0].length, 3);
        assert!(!summary.streaks[0].ongoing);
        assert_eq!(summary.streaks[1].length, 2);
        assert!(summary.streaks[1].ongoing);
    }
}
