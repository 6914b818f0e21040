use clap::Subcommand;
use daystreak_core::{
    auto_track_clean, next_run_at, Config, Database, DayKey, SystemTimeSource, TimeSource,
};

#[derive(Subcommand)]
pub enum AutotrackAction {
    /// Backfill a clean entry for every user without one
    Run {
        /// Day to backfill (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Run even when auto-track is disabled in the config
        #[arg(long)]
        force: bool,
    },
    /// Print the next scheduled run time (23:59 local)
    Next,
}

pub fn run(action: AutotrackAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let time = SystemTimeSource;

    match action {
        AutotrackAction::Run { date, force } => {
            if !config.auto_track.enabled && !force {
                println!("Auto-track is disabled (use --force to run anyway)");
                return Ok(());
            }
            let db = Database::open()?;
            let day = match date {
                Some(raw) => DayKey::parse(&raw)?,
                None => DayKey::today(&config.default_timezone, &time),
            };
            let report = auto_track_clean(&db, &time, day)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        AutotrackAction::Next => {
            let next = next_run_at(time.now(), &config.default_timezone);
            println!("{}", next.to_rfc3339());
        }
    }
    Ok(())
}
