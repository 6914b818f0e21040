//! Calendar-day bucketing.
//!
//! A [`DayKey`] identifies one calendar day in a specific timezone and is
//! exchanged everywhere as a `YYYY-MM-DD` string. Construction from an
//! instant goes through a true IANA conversion (via chrono-tz), never a
//! naive UTC truncation, so a log made at 11 PM Pacific and one at 1 AM UTC
//! the same evening land in the same bucket.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::time::TimeSource;

/// Fallback timezone for absent or unrecognized identifiers.
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// A canonical calendar-day key (`YYYY-MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a strict `YYYY-MM-DD` string.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidDayKey`] on any other format.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ValidationError::InvalidDayKey {
                input: input.to_string(),
            })
    }

    /// Bucket an instant into the calendar day it falls on in `tz_name`.
    ///
    /// An unrecognized timezone identifier falls back to
    /// [`DEFAULT_TIMEZONE`] with a logged warning. This is a deliberate
    /// lenient policy: a bad client cookie must not fail a log request.
    pub fn from_instant(instant: DateTime<Utc>, tz_name: &str) -> Self {
        let tz = resolve_tz(tz_name);
        Self(instant.with_timezone(&tz).date_naive())
    }

    /// Today's key in `tz_name` according to `time`.
    pub fn today(tz_name: &str, time: &dyn TimeSource) -> Self {
        Self::from_instant(time.now(), tz_name)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The previous calendar day.
    pub fn prev(&self) -> Self {
        Self(self.0 - Duration::days(1))
    }

    /// The next calendar day.
    pub fn next(&self) -> Self {
        Self(self.0 + Duration::days(1))
    }

    /// Signed whole-day difference `other - self`.
    pub fn days_until(&self, other: DayKey) -> i64 {
        (other.0 - self.0).num_days()
    }
}

/// Resolve an IANA identifier, falling back to [`DEFAULT_TIMEZONE`].
fn resolve_tz(tz_name: &str) -> Tz {
    match tz_name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            eprintln!(
                "Warning: unknown timezone '{tz_name}', falling back to {DEFAULT_TIMEZONE}"
            );
            DEFAULT_TIMEZONE
                .parse::<Tz>()
                .unwrap_or(chrono_tz::America::Los_Angeles)
        }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DayKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedTimeSource;
    use proptest::prelude::*;

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn pacific_evening_and_utc_morning_share_a_bucket() {
        // 2024-06-01 23:30 Pacific == 2024-06-02 06:30 UTC.
        let late_pacific = instant("2024-06-02T06:30:00Z");
        let key = DayKey::from_instant(late_pacific, "America/Los_Angeles");
        assert_eq!(key.to_string(), "2024-06-01");
        // Same real-world evening, logged against UTC, is the next day.
        let key_utc = DayKey::from_instant(late_pacific, "UTC");
        assert_eq!(key_utc.to_string(), "2024-06-02");
    }

    #[test]
    fn unknown_timezone_falls_back_to_default() {
        let t = instant("2024-06-02T06:30:00Z");
        let bad = DayKey::from_instant(t, "Not/A_Zone");
        let fallback = DayKey::from_instant(t, DEFAULT_TIMEZONE);
        assert_eq!(bad, fallback);
    }

    #[test]
    fn parse_accepts_only_strict_format() {
        assert!(DayKey::parse("2024-06-01").is_ok());
        assert!(DayKey::parse("2024-6-1").is_err());
        assert!(DayKey::parse("06/01/2024").is_err());
        assert!(DayKey::parse("2024-06-01T00:00:00Z").is_err());
        assert!(DayKey::parse("2024-13-01").is_err());
        assert!(DayKey::parse("").is_err());
    }

    #[test]
    fn neighbors_and_distance() {
        let d = DayKey::parse("2024-03-01").unwrap();
        assert_eq!(d.prev().to_string(), "2024-02-29"); // leap year
        assert_eq!(d.next().to_string(), "2024-03-02");
        assert_eq!(d.days_until(d.next()), 1);
        assert_eq!(d.next().days_until(d), -1);
    }

    #[test]
    fn today_uses_injected_time() {
        let time = FixedTimeSource::new(instant("2024-06-02T06:30:00Z"));
        assert_eq!(
            DayKey::today("America/Los_Angeles", &time).to_string(),
            "2024-06-01"
        );
        time.advance_secs(3 * 3600);
        assert_eq!(
            DayKey::today("America/Los_Angeles", &time).to_string(),
            "2024-06-02"
        );
    }

    #[test]
    fn serde_round_trips_as_string() {
        let d = DayKey::parse("2024-06-01").unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "\"2024-06-01\"");
        assert_eq!(serde_json::from_str::<DayKey>(&json).unwrap(), d);
    }

    proptest! {
        // today(tz) never regresses as real time advances, DST included.
        #[test]
        fn today_is_non_decreasing(
            base in 0i64..2_000_000_000,
            step in 0i64..(3 * 86_400),
            tz in prop::sample::select(vec![
                "UTC",
                "America/Los_Angeles",
                "Europe/Berlin",
                "Asia/Ho_Chi_Minh",
                "Pacific/Kiritimati",
            ]),
        ) {
            let t1 = DateTime::<Utc>::from_timestamp(base, 0).unwrap();
            let t2 = DateTime::<Utc>::from_timestamp(base + step, 0).unwrap();
            prop_assert!(DayKey::from_instant(t1, tz) <= DayKey::from_instant(t2, tz));
        }
    }
}
