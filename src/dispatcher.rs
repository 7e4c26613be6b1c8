//! Command dispatcher that routes parsed CLI commands to their handlers.
//!
//! Handlers open the database themselves (creating the schema on first use)
//! and print either tables or JSON depending on `json_output`.

mod accounts;
mod formats;
mod imports;
mod inspect;
mod transactions;

use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

use crate::cli::Commands;
use crate::config::Config;
use crate::db;

/// Route a parsed command to its handler
pub fn dispatch_command(command: Commands, json_output: bool) -> Result<()> {
    let config = Config::load()?;
    debug!("Loaded configuration: {:?}", config);

    match command {
        Commands::Import {
            file,
            format_id,
            account_id,
            dry_run,
        } => imports::dispatch_import(
            &config,
            &file,
            format_id,
            account_id,
            dry_run,
            json_output,
        ),
        Commands::Accounts { action } => accounts::dispatch_accounts(&config, action, json_output),
        Commands::Formats { action } => formats::dispatch_formats(&config, action, json_output),
        Commands::Transactions { action } => {
            transactions::dispatch_transactions(&config, action, json_output)
        }
        Commands::Inspect {
            file,
            rows,
            all_sheets,
        } => inspect::dispatch_inspect(&file, rows, all_sheets),
    }
}

/// Open the configured database, creating the schema if needed
fn open_database(config: &Config) -> Result<Connection> {
    let path = config.db_path();
    db::init_database(path.clone())?;
    db::open_db(path)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
