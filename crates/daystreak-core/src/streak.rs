//! Streak computation.
//!
//! Two different questions, two different rules:
//!
//! - **Current / longest streak** count *tracked* days: an entry of any
//!   failure level keeps the streak alive, only a missing day breaks it.
//! - **Streak runs** (the summary breakdown) count *clean* stretches: a
//!   failure entry ends a run, and so does a calendar gap.
//!
//! All computation is read-only and recomputed from scratch on every call.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::day::DayKey;
use crate::entry::Entry;
use crate::error::Result;
use crate::store::database::{Database, StreakHistoryRecord};
use crate::time::TimeSource;

/// Upper bound on the backwards walk for the current streak.
///
/// A defensive limit against malformed data, not a feature: streaks longer
/// than this are undercounted.
pub const MAX_WALK_DAYS: usize = 365;

/// Current streak: consecutive tracked days ending today.
///
/// Walks backwards from `today`, counting while an entry exists for the day
/// under examination, and stops at the first absent day. Failure level is
/// irrelevant here.
pub fn current_streak(tracked: &HashSet<DayKey>, today: DayKey) -> u32 {
    let mut streak = 0u32;
    let mut day = today;
    for _ in 0..MAX_WALK_DAYS {
        if !tracked.contains(&day) {
            break;
        }
        streak += 1;
        day = day.prev();
    }
    streak
}

/// Longest streak: the longest consecutive-day run anywhere in history,
/// including a still-open trailing run.
pub fn longest_streak(days: &[DayKey]) -> u32 {
    let mut sorted: Vec<DayKey> = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<DayKey> = None;
    for day in sorted {
        run = match prev {
            Some(p) if p.days_until(day) == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}

/// One maximal consecutive-day run of non-failure entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakRun {
    pub length: u32,
    pub start: DayKey,
    pub end: DayKey,
    /// True when the run reaches the most recent entry on record.
    pub ongoing: bool,
}

/// Breakdown of every clean run, longest first.
///
/// A failure entry terminates a run; so does a gap between calendar days.
pub fn streak_runs(entries: &[Entry]) -> Vec<StreakRun> {
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_unstable_by_key(|e| e.date);

    let last_date = match sorted.last() {
        Some(entry) => entry.date,
        None => return Vec::new(),
    };

    let mut runs: Vec<StreakRun> = Vec::new();
    let mut open: Option<(DayKey, DayKey)> = None; // (start, end)

    for entry in sorted {
        if entry.had_failure {
            if let Some((start, end)) = open.take() {
                runs.push(make_run(start, end, last_date));
            }
            continue;
        }
        open = match open {
            Some((start, end)) if end.days_until(entry.date) == 1 => Some((start, entry.date)),
            Some((start, end)) => {
                runs.push(make_run(start, end, last_date));
                Some((entry.date, entry.date))
            }
            None => Some((entry.date, entry.date)),
        };
    }
    if let Some((start, end)) = open {
        runs.push(make_run(start, end, last_date));
    }

    runs.sort_by(|a, b| b.length.cmp(&a.length));
    runs
}

fn make_run(start: DayKey, end: DayKey, last_date: DayKey) -> StreakRun {
    StreakRun {
        length: start.days_until(end) as u32 + 1,
        start,
        end,
        ongoing: end == last_date,
    }
}

/// Store-backed streak queries plus the full progress reset.
pub struct StreakEngine<'a> {
    db: &'a Database,
    time: &'a dyn TimeSource,
}

impl<'a> StreakEngine<'a> {
    pub fn new(db: &'a Database, time: &'a dyn TimeSource) -> Self {
        Self { db, time }
    }

    pub fn current_streak(&self, user_id: i64, tz_name: &str) -> Result<u32> {
        let entries = self.db.entries_for_user(user_id)?;
        let tracked: HashSet<DayKey> = entries.iter().map(|e| e.date).collect();
        Ok(current_streak(&tracked, DayKey::today(tz_name, self.time)))
    }

    pub fn longest_streak(&self, user_id: i64) -> Result<u32> {
        let entries = self.db.entries_for_user(user_id)?;
        let days: Vec<DayKey> = entries.iter().map(|e| e.date).collect();
        Ok(longest_streak(&days))
    }

    /// Relapse: archive the tracked-day total, then wipe all entries.
    ///
    /// Snapshot and wipe commit or roll back together. Returns the archive
    /// record, or `None` when there was nothing to archive.
    pub fn reset_all_progress(&self, user_id: i64) -> Result<Option<StreakHistoryRecord>> {
        self.db.with_immediate_tx(|db| {
            let entries = db.entries_for_user(user_id)?;
            if entries.is_empty() {
                return Ok(None);
            }
            // entries_for_user returns newest first.
            let end = entries[0].date;
            let start = entries[entries.len() - 1].date;
            let record =
                db.create_streak_history(user_id, entries.len() as i64, start, end)?;
            db.delete_all_entries(user_id)?;
            Ok(Some(record))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryLog, FailureLevel};
    use crate::time::FixedTimeSource;

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    fn days(specs: &[&str]) -> Vec<DayKey> {
        specs.iter().map(|s| day(s)).collect()
    }

    fn tracked(specs: &[&str]) -> HashSet<DayKey> {
        specs.iter().map(|s| day(s)).collect()
    }

    #[test]
    fn zero_entries_means_zero_streaks() {
        assert_eq!(current_streak(&HashSet::new(), day("2024-06-10")), 0);
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn current_streak_counts_back_from_today_until_a_gap() {
        let set = tracked(&["2024-06-08", "2024-06-09", "2024-06-10"]);
        assert_eq!(current_streak(&set, day("2024-06-10")), 3);
        // A gap right before the window: still 3, not more.
        let set = tracked(&["2024-06-06", "2024-06-08", "2024-06-09", "2024-06-10"]);
        assert_eq!(current_streak(&set, day("2024-06-10")), 3);
        // No entry today: streak is 0 regardless of history.
        assert_eq!(current_streak(&set, day("2024-06-11")), 0);
    }

    // Pins the canonical semantics: a failure day is still a tracked day.
    // (An earlier revision of the product broke the streak on failures.)
    #[test]
    fn failure_day_does_not_break_current_streak() {
        let db = Database::open_memory().unwrap();
        let time = FixedTimeSource::new("2024-06-10T12:00:00Z".parse().unwrap());
        let user = db.create_user("sam", Some("UTC"), time.now()).unwrap();
        let log = EntryLog::new(&db, &time);
        log.log(user.id, "2024-06-08", FailureLevel::Clean, None).unwrap();
        log.log(user.id, "2024-06-09", FailureLevel::Full, None).unwrap();
        log.log(user.id, "2024-06-10", FailureLevel::Partial, None).unwrap();

        let engine = StreakEngine::new(&db, &time);
        assert_eq!(engine.current_streak(user.id, "UTC").unwrap(), 3);
    }

    #[test]
    fn longest_streak_scans_consecutive_runs() {
        // Gap at day 4: longest run is 3.
        let d = days(&["2024-06-01", "2024-06-02", "2024-06-03", "2024-06-05"]);
        assert_eq!(longest_streak(&d), 3);
        // Unsorted input and duplicates are tolerated.
        let d = days(&["2024-06-05", "2024-06-02", "2024-06-01", "2024-06-02", "2024-06-03"]);
        assert_eq!(longest_streak(&d), 3);
    }

    #[test]
    fn week_with_a_missed_day() {
        // Days 1-5 clean, day 6 absent, day 7 (today) clean.
        let specs = [
            "2024-06-01", "2024-06-02", "2024-06-03", "2024-06-04", "2024-06-05",
            "2024-06-07",
        ];
        let set = tracked(&specs);
        assert_eq!(current_streak(&set, day("2024-06-07")), 1);
        assert_eq!(longest_streak(&days(&specs)), 5);
    }

    #[test]
    fn walk_is_bounded() {
        // 400 consecutive tracked days: undercounted at the defensive cap.
        let mut set = HashSet::new();
        let mut d = day("2024-06-10");
        for _ in 0..400 {
            set.insert(d);
            d = d.prev();
        }
        assert_eq!(current_streak(&set, day("2024-06-10")), MAX_WALK_DAYS as u32);
    }

    fn entry_for(date: &str, level: FailureLevel) -> Entry {
        Entry {
            id: 0,
            user_id: 1,
            date: day(date),
            had_failure: level.is_failure(),
            failure_level: Some(level),
            note: None,
            morning_flag: false,
            created_at: "2024-06-10T12:00:00Z".parse().unwrap(),
            updated_at: "2024-06-10T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn runs_break_on_failures_and_gaps_and_mark_ongoing() {
        let entries = vec![
            entry_for("2024-06-01", FailureLevel::Clean),
            entry_for("2024-06-02", FailureLevel::Clean),
            entry_for("2024-06-03", FailureLevel::Partial), // breaks run
            entry_for("2024-06-04", FailureLevel::Clean),
            // gap at 06-05 breaks the run too
            entry_for("2024-06-06", FailureLevel::Clean),
            entry_for("2024-06-07", FailureLevel::Clean),
        ];
        let runs = streak_runs(&entries);
        let lengths: Vec<u32> = runs.iter().map(|r| r.length).collect();
        assert_eq!(lengths, vec![2, 2, 1]);
        // Longest-first ordering puts the ongoing trailing run first here.
        assert!(runs[0].ongoing);
        assert_eq!(runs[0].end, day("2024-06-07"));
        assert!(!runs[1].ongoing);
        assert!(!runs[2].ongoing);
    }

    #[test]
    fn runs_empty_without_entries() {
        assert!(streak_runs(&[]).is_empty());
    }

    #[test]
    fn reset_all_progress_archives_then_wipes() {
        let db = Database::open_memory().unwrap();
        let time = FixedTimeSource::new("2024-06-10T12:00:00Z".parse().unwrap());
        let user = db.create_user("sam", Some("UTC"), time.now()).unwrap();
        let log = EntryLog::new(&db, &time);
        for d in ["2024-06-01", "2024-06-02", "2024-06-03"] {
            log.log(user.id, d, FailureLevel::Clean, None).unwrap();
        }

        let engine = StreakEngine::new(&db, &time);
        let record = engine.reset_all_progress(user.id).unwrap().unwrap();
        assert_eq!(record.streak_days, 3);
        assert_eq!(record.start_date, day("2024-06-01"));
        assert_eq!(record.end_date, day("2024-06-03"));
        assert!(db.entries_for_user(user.id).unwrap().is_empty());
        assert_eq!(db.best_streak_days(user.id).unwrap(), 3);

        // Nothing left to archive the second time around.
        assert!(engine.reset_all_progress(user.id).unwrap().is_none());
    }
}
