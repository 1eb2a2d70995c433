//! uowmap CLI
//!
//! Command-line access to the user store, one unit of work per invocation

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uowmap_core::logging_facility::{init, Profile};
use uowmap_store::SqliteProvider;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "uowmap")]
#[command(about = "uowmap - Unit of Work over a SQLite user store", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "UOWMAP_DB", default_value = ".uowmap/store.db")]
    db: PathBuf,

    /// TOML store config; takes precedence over --db
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// User operations
    User(commands::user::UserArgs),
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        init(Profile::Development);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = commands::store_config(&cli.db, cli.config.as_deref())?;
    let provider = SqliteProvider::new(config)?;

    match cli.command {
        Commands::User(args) => commands::user::execute(args, &provider),
    }
}
