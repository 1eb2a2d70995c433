//! User commands

use clap::{Args, Subcommand};
use uowmap_core::{Entity, EntityId, Shared};
use uowmap_store::{open_session, SqliteProvider, User, Users};

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user and print its id
    Add { name: String },
    /// Print a user as JSON
    Get { id: String },
    /// Change a user's name
    Rename { id: String, name: String },
    /// Remove a user
    Delete { id: String },
}

pub fn execute(args: UserArgs, provider: &SqliteProvider) -> Result<(), Box<dyn std::error::Error>> {
    let mut uow = open_session(provider);
    let mut users: Users<'_> = uow.repository();

    match args.command {
        UserCommand::Add { name } => {
            if name.trim().is_empty() {
                return Err("Name must not be empty".into());
            }
            let user = users.add(User::create(name))?;
            let id = user.borrow().id();
            uow.commit()?;
            println!("{}", id);
        }
        UserCommand::Get { id } => {
            let user = find(&mut users, &id)?;
            let json = serde_json::to_string_pretty(&*user.borrow())?;
            println!("{}", json);
        }
        UserCommand::Rename { id, name } => {
            if name.trim().is_empty() {
                return Err("Name must not be empty".into());
            }
            let user = find(&mut users, &id)?;
            user.borrow_mut().rename(name);
            let summary = uow.commit()?;
            println!("Renamed {} ({} updated)", id, summary.updated);
        }
        UserCommand::Delete { id } => {
            let user = find(&mut users, &id)?;
            users.delete(&user)?;
            uow.commit()?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

fn find(users: &mut Users<'_>, raw_id: &str) -> Result<Shared<User>, Box<dyn std::error::Error>> {
    let id = EntityId::parse_str(raw_id).map_err(|e| format!("Invalid user id '{}': {}", raw_id, e))?;
    users
        .get_by_id(id)?
        .ok_or_else(|| format!("User {} not found", raw_id).into())
}
