use clap::Subcommand;
use daystreak_core::{build_summary, Config, Database, SystemTimeSource};

use super::{resolve_user, timezone_for};

#[derive(Subcommand)]
pub enum SummaryAction {
    /// Full progress report as JSON
    Show { user: String },
    /// Archived streaks (from full resets) as JSON
    History { user: String },
}

pub fn run(action: SummaryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;
    let time = SystemTimeSource;

    match action {
        SummaryAction::Show { user } => {
            let user = resolve_user(&db, &user)?;
            let tz = timezone_for(&user, &config);
            let summary = build_summary(&db, &time, user.id, &tz)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        SummaryAction::History { user } => {
            let user = resolve_user(&db, &user)?;
            let history = db.streak_history(user.id)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }
    Ok(())
}
