use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "daystreak", version, about = "Daystreak habit tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Daily log entries
    Entry {
        #[command(subcommand)]
        action: commands::entry::EntryAction,
    },
    /// Abstinence clock control
    Clock {
        #[command(subcommand)]
        action: commands::clock::ClockAction,
    },
    /// Progress summary
    Summary {
        #[command(subcommand)]
        action: commands::summary::SummaryAction,
    },
    /// Daily clean-entry backfill
    Autotrack {
        #[command(subcommand)]
        action: commands::autotrack::AutotrackAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action),
        Commands::Entry { action } => commands::entry::run(action),
        Commands::Clock { action } => commands::clock::run(action),
        Commands::Summary { action } => commands::summary::run(action),
        Commands::Autotrack { action } => commands::autotrack::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
