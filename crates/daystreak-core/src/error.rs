//! Core error types for daystreak-core.
//!
//! Three failure classes are kept distinct on purpose: validation errors
//! (user-correctable, rejected before any store call), state conflicts
//! (the operation is well-formed but the current state forbids it), and
//! store errors (persistence failures, propagated to the caller).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for daystreak-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// State conflicts (start-when-running, duplicate day, ...)
    #[error("{0}")]
    Conflict(#[from] StateConflict),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Uniqueness or foreign-key constraint violated
    #[error("Constraint violated: {0}")]
    ConstraintViolated(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Row not found
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl DatabaseError {
    /// Whether this error is a uniqueness/foreign-key violation.
    pub fn is_constraint(&self) -> bool {
        matches!(self, DatabaseError::ConstraintViolated(_))
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors. Raised before any store call; user-correctable.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Malformed calendar-day key
    #[error("Invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDayKey { input: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// State conflicts. The request was well-formed but the current state
/// forbids it; no mutation is applied.
#[derive(Error, Debug)]
pub enum StateConflict {
    /// Clock start requested while a clock is already running
    #[error("Clock is already running")]
    ClockAlreadyRunning,

    /// Clock edit requires a running clock
    #[error("Clock is not running")]
    ClockNotRunning,

    /// An entry already exists for this (user, date)
    #[error("An entry already exists for {date}")]
    DuplicateEntry { date: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, msg) => match inner.code {
                rusqlite::ErrorCode::DatabaseLocked => DatabaseError::Locked,
                rusqlite::ErrorCode::ConstraintViolation => DatabaseError::ConstraintViolated(
                    msg.clone().unwrap_or_else(|| inner.to_string()),
                ),
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
