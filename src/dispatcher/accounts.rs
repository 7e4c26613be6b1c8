use anyhow::Result;
use colored::Colorize;

use super::{open_database, print_json};
use crate::cli::formatters::format_accounts_table;
use crate::cli::AccountCommands;
use crate::config::Config;
use crate::db;

pub fn dispatch_accounts(config: &Config, action: AccountCommands, json_output: bool) -> Result<()> {
    let conn = open_database(config)?;

    match action {
        AccountCommands::Add { name, bank } => {
            let id = db::insert_account(&conn, &name, bank.as_deref())?;
            if json_output {
                return print_json(&serde_json::json!({ "success": true, "id": id }));
            }
            println!("\n{} Account added successfully!", "✓".green().bold());
            println!("  Account ID: {}", id);
            println!("  Name:       {}", name.cyan().bold());
            if let Some(bank) = bank {
                println!("  Bank:       {}", bank);
            }
            println!();
            Ok(())
        }
        AccountCommands::List => {
            let accounts = db::list_accounts(&conn)?;
            if json_output {
                return print_json(&accounts);
            }
            println!("{}", format_accounts_table(&accounts));
            Ok(())
        }
    }
}
