pub mod autotrack;
pub mod clock;
pub mod entry;
pub mod summary;
pub mod user;

use daystreak_core::{Config, Database, FailureLevel, User};

/// Look a user up by name, with a friendly error for typos.
pub(crate) fn resolve_user(db: &Database, name: &str) -> Result<User, Box<dyn std::error::Error>> {
    match db.find_user(name)? {
        Some(user) => Ok(user),
        None => Err(format!("unknown user '{name}' (try: daystreak user list)").into()),
    }
}

/// The user's timezone, or the configured default.
pub(crate) fn timezone_for(user: &User, config: &Config) -> String {
    user.timezone
        .clone()
        .unwrap_or_else(|| config.default_timezone.clone())
}

/// Parse a failure level from the command line.
pub(crate) fn parse_level(raw: &str) -> Result<FailureLevel, Box<dyn std::error::Error>> {
    match raw {
        "clean" | "0" => Ok(FailureLevel::Clean),
        "partial" | "1" => Ok(FailureLevel::Partial),
        "full" | "2" => Ok(FailureLevel::Full),
        _ => Err(format!("unknown level '{raw}' (expected clean, partial, or full)").into()),
    }
}
