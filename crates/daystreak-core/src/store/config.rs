//! TOML-based application configuration.
//!
//! Stores the default timezone (used when a user has none set) and the
//! auto-track behavior. Stored at `~/.config/daystreak/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::day::DEFAULT_TIMEZONE;
use crate::error::{ConfigError, Result};

use super::data_dir;

/// Auto-track (daily backfill) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTrackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Note written on backfilled entries.
    #[serde(default = "default_auto_track_note")]
    pub note: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/daystreak/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA identifier used when a user has no timezone of their own.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub auto_track: AutoTrackConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.into()
}
fn default_auto_track_note() -> String {
    crate::autotrack::AUTO_TRACK_NOTE.into()
}

impl Default for AutoTrackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            note: default_auto_track_note(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            auto_track: AutoTrackConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults if absent.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_toml(&raw)
    }

    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))?)
    }

    /// Save the configuration.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.default_timezone, DEFAULT_TIMEZONE);
        assert!(config.auto_track.enabled);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = Config::from_toml("default_timezone = \"Europe/Berlin\"").unwrap();
        assert_eq!(config.default_timezone, "Europe/Berlin");
        assert!(config.auto_track.enabled);
        assert_eq!(config.auto_track.note, crate::autotrack::AUTO_TRACK_NOTE);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = Config::default();
        config.auto_track.enabled = false;
        let raw = toml::to_string_pretty(&config).unwrap();
        let back = Config::from_toml(&raw).unwrap();
        assert!(!back.auto_track.enabled);
        assert_eq!(back.default_timezone, config.default_timezone);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        assert!(Config::from_toml("default_timezone = [1, 2]").is_err());
    }
}
