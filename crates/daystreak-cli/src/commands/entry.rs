use clap::Subcommand;
use daystreak_core::{Config, Database, EntryLog, StreakEngine, SystemTimeSource};

use super::{parse_level, resolve_user, timezone_for};

#[derive(Subcommand)]
pub enum EntryAction {
    /// Log (or overwrite) an entry for a specific day
    Log {
        user: String,
        /// Day in YYYY-MM-DD
        date: String,
        /// clean, partial, or full
        #[arg(long, default_value = "clean")]
        level: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Quick check-in for today
    Today {
        user: String,
        /// clean, partial, or full
        #[arg(long, default_value = "clean")]
        level: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Print one day's entry as JSON
    Show { user: String, date: String },
    /// Set or clear the morning flag on a day
    Morning {
        user: String,
        date: String,
        #[arg(long)]
        clear: bool,
    },
    /// Delete one day's entry
    Delete { user: String, date: String },
    /// Print a month of entries as JSON
    Calendar {
        user: String,
        year: i32,
        month: u32,
    },
    /// Archive the streak and wipe every entry
    ResetAll { user: String },
}

pub fn run(action: EntryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;
    let time = SystemTimeSource;
    let log = EntryLog::new(&db, &time);

    match action {
        EntryAction::Log {
            user,
            date,
            level,
            note,
        } => {
            let user = resolve_user(&db, &user)?;
            let entry = log.log(user.id, &date, parse_level(&level)?, note.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        EntryAction::Today { user, level, note } => {
            let user = resolve_user(&db, &user)?;
            let tz = timezone_for(&user, &config);
            let entry = log.check_in_today(user.id, &tz, parse_level(&level)?, note.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        EntryAction::Show { user, date } => {
            let user = resolve_user(&db, &user)?;
            let date = daystreak_core::DayKey::parse(&date)?;
            match db.find_entry(user.id, date)? {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                None => println!("No entry for {date}"),
            }
        }
        EntryAction::Morning { user, date, clear } => {
            let user = resolve_user(&db, &user)?;
            let entry = log.set_morning_flag(user.id, &date, !clear)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        EntryAction::Delete { user, date } => {
            let user = resolve_user(&db, &user)?;
            let entry = log.delete(user.id, &date)?;
            println!("Deleted entry for {}", entry.date);
        }
        EntryAction::Calendar { user, year, month } => {
            let user = resolve_user(&db, &user)?;
            let entries = log.month(user.id, year, month)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        EntryAction::ResetAll { user } => {
            let user = resolve_user(&db, &user)?;
            let engine = StreakEngine::new(&db, &time);
            match engine.reset_all_progress(user.id)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("Nothing to reset"),
            }
        }
    }
    Ok(())
}
