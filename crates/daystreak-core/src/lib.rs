//! # Daystreak Core Library
//!
//! Core business logic for Daystreak, a personal habit tracker. It follows
//! a CLI-first philosophy: every operation is available through the
//! standalone `daystreak` binary, which is a thin layer over this library.
//!
//! ## Architecture
//!
//! - **Day bucketing**: instants become `YYYY-MM-DD` keys through a true
//!   IANA timezone conversion; all day math happens on [`DayKey`]
//! - **Streak engine**: current and longest streaks recomputed from the
//!   full entry history on every call
//! - **Clock engine**: a single abstinence timer per user, persisted as
//!   one start instant; resets archive the interval and fail the day
//! - **Storage**: SQLite entries/archives and TOML configuration
//!
//! Engines read time through the [`TimeSource`] capability rather than the
//! wall clock, so day-boundary and elapsed-time logic is testable.
//!
//! ## Key Components
//!
//! - [`DayKey`]: canonical calendar-day value
//! - [`StreakEngine`] / [`ClockEngine`]: per-user derived state
//! - [`build_summary`]: one consistent dashboard report
//! - [`Database`]: entry, user, and archive persistence

pub mod autotrack;
pub mod clock;
pub mod day;
pub mod entry;
pub mod error;
pub mod store;
pub mod streak;
pub mod summary;
pub mod time;

pub use autotrack::{auto_track_clean, next_run_at, AutoTrackReport};
pub use clock::{ClockEngine, ClockResetOutcome, ClockStatus};
pub use day::{DayKey, DEFAULT_TIMEZONE};
pub use entry::{Entry, EntryCategory, EntryLog, FailureLevel};
pub use error::{ConfigError, CoreError, DatabaseError, StateConflict, ValidationError};
pub use store::{CategoryCounts, ClockHistoryRecord, Config, Database, StreakHistoryRecord, User};
pub use streak::{StreakEngine, StreakRun};
pub use summary::{build_summary, Summary};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
