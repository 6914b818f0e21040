//! Daily clean-entry backfill.
//!
//! Once a day, near end-of-day, a scheduled caller backfills a clean entry
//! for every user who didn't log anything. The cadence (cron, systemd
//! timer) lives outside the core; this module is the operation it calls.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::day::DayKey;
use crate::entry::FailureLevel;
use crate::error::{CoreError, Result};
use crate::store::database::{Database, NewEntry};
use crate::time::TimeSource;

/// Note attached to backfilled entries.
pub const AUTO_TRACK_NOTE: &str = "Auto-tracked: Clean";

/// What a backfill run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTrackReport {
    pub day: DayKey,
    pub tracked: usize,
    pub users: Vec<String>,
}

/// Backfill a clean entry for every user without one on `day`.
///
/// Idempotent under races: if a live request creates the user's entry
/// between our query and our insert, the uniqueness constraint rejects the
/// duplicate and that user is skipped, not failed.
pub fn auto_track_clean(db: &Database, time: &dyn TimeSource, day: DayKey) -> Result<AutoTrackReport> {
    let missing = db.users_without_entry(day)?;
    let now = time.now();

    let mut users = Vec::new();
    for user in missing {
        let result = db.create_entry(
            &NewEntry {
                user_id: user.id,
                date: day,
                level: FailureLevel::Clean,
                note: Some(AUTO_TRACK_NOTE),
                morning_flag: false,
            },
            now,
        );
        match result {
            Ok(_) => users.push(user.name),
            // Lost the race to a live request; their entry stands.
            Err(CoreError::Conflict(_)) => continue,
            Err(err) => return Err(err),
        }
    }

    Ok(AutoTrackReport {
        day,
        tracked: users.len(),
        users,
    })
}

/// Next 23:59 local-time occurrence after `now`.
///
/// Falls back to [`crate::day::DEFAULT_TIMEZONE`] for unknown identifiers,
/// matching the day-bucketing policy.
pub fn next_run_at(now: DateTime<Utc>, tz_name: &str) -> DateTime<Utc> {
    let tz: Tz = tz_name.parse().unwrap_or(chrono_tz::America::Los_Angeles);
    let local_now = now.with_timezone(&tz);
    let target_time = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default();

    let mut date = local_now.date_naive();
    if local_now.time() >= target_time {
        date += Duration::days(1);
    }
    // DST edge: if 23:59 doesn't resolve cleanly, take the earliest valid
    // mapping; failing that, try successive days.
    for _ in 0..3 {
        if let Some(t) = tz
            .from_local_datetime(&date.and_time(target_time))
            .earliest()
        {
            return t.with_timezone(&Utc);
        }
        date += Duration::days(1);
    }
    now + Duration::days(1)
}
