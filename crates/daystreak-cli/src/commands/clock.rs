use clap::Subcommand;
use daystreak_core::{ClockEngine, Config, Database, SystemTimeSource};

use super::{resolve_user, timezone_for};

#[derive(Subcommand)]
pub enum ClockAction {
    /// Start the clock
    Start { user: String },
    /// Print clock status as JSON
    Status { user: String },
    /// Rewind the running clock to a chosen elapsed time
    Edit {
        user: String,
        #[arg(long, default_value = "0")]
        days: u32,
        #[arg(long, default_value = "0")]
        hours: u32,
        #[arg(long, default_value = "0")]
        minutes: u32,
    },
    /// Reset the clock: archive the run and fail the day
    Reset { user: String },
    /// Print archived runs as JSON
    History { user: String },
    /// Print the best duration in seconds, live run included
    Best { user: String },
    /// Delete one archived run by id
    DeleteRecord { user: String, id: i64 },
    /// Delete all archived runs
    ClearHistory { user: String },
}

pub fn run(action: ClockAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;
    let time = SystemTimeSource;
    let clock = ClockEngine::new(&db, &time);

    match action {
        ClockAction::Start { user } => {
            let user = resolve_user(&db, &user)?;
            let started = clock.start(user.id)?;
            println!("Clock started at {}", started.to_rfc3339());
        }
        ClockAction::Status { user } => {
            let user = resolve_user(&db, &user)?;
            let status = clock.status(user.id)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        ClockAction::Edit {
            user,
            days,
            hours,
            minutes,
        } => {
            let user = resolve_user(&db, &user)?;
            let new_start = clock.edit(user.id, days, hours, minutes)?;
            println!("Clock start moved to {}", new_start.to_rfc3339());
        }
        ClockAction::Reset { user } => {
            let user = resolve_user(&db, &user)?;
            let tz = timezone_for(&user, &config);
            let outcome = clock.reset(user.id, &tz)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ClockAction::History { user } => {
            let user = resolve_user(&db, &user)?;
            let history = db.clock_history(user.id)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        ClockAction::Best { user } => {
            let user = resolve_user(&db, &user)?;
            println!("{}", clock.best_duration_seconds(user.id)?);
        }
        ClockAction::DeleteRecord { user, id } => {
            let user = resolve_user(&db, &user)?;
            db.delete_clock_history(id, user.id)?;
            println!("Deleted clock record {id}");
        }
        ClockAction::ClearHistory { user } => {
            let user = resolve_user(&db, &user)?;
            let n = db.delete_all_clock_history(user.id)?;
            println!("Deleted {n} clock records");
        }
    }
    Ok(())
}
