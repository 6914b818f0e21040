mod config;
pub mod database;
pub mod migrations;

pub use config::{AutoTrackConfig, Config};
pub use database::{CategoryCounts, ClockHistoryRecord, Database, StreakHistoryRecord, User};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/daystreak[-dev]/` based on DAYSTREAK_ENV.
///
/// Set DAYSTREAK_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DAYSTREAK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("daystreak-dev")
    } else {
        base_dir.join("daystreak")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
