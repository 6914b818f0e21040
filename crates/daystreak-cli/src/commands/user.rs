use clap::Subcommand;
use daystreak_core::{Database, SystemTimeSource, TimeSource};

use super::resolve_user;

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user
    Add {
        name: String,
        /// IANA timezone, e.g. Europe/Berlin
        #[arg(long)]
        timezone: Option<String>,
    },
    /// List all users as JSON
    List,
    /// Delete a user and everything they own
    Remove { name: String },
    /// Change a user's timezone
    SetTimezone { name: String, timezone: String },
}

pub fn run(action: UserAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let time = SystemTimeSource;

    match action {
        UserAction::Add { name, timezone } => {
            let user = db.create_user(&name, timezone.as_deref(), time.now())?;
            println!("User created: {} (id {})", user.name, user.id);
        }
        UserAction::List => {
            let users = db.list_users()?;
            println!("{}", serde_json::to_string_pretty(&users)?);
        }
        UserAction::Remove { name } => {
            let user = resolve_user(&db, &name)?;
            db.delete_user(user.id)?;
            println!("User removed: {name}");
        }
        UserAction::SetTimezone { name, timezone } => {
            let user = resolve_user(&db, &name)?;
            db.set_user_timezone(user.id, &timezone)?;
            println!("Timezone for {name} set to {timezone}");
        }
    }
    Ok(())
}
