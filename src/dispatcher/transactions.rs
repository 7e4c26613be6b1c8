use anyhow::{anyhow, Result};
use colored::Colorize;

use super::{open_database, print_json};
use crate::cli::formatters::format_transactions_table;
use crate::cli::TransactionCommands;
use crate::config::Config;
use crate::db;

pub fn dispatch_transactions(
    config: &Config,
    action: TransactionCommands,
    json_output: bool,
) -> Result<()> {
    match action {
        TransactionCommands::List { account_id, limit } => {
            let conn = open_database(config)?;
            let account = db::get_account(&conn, account_id)?
                .ok_or_else(|| anyhow!("Account {} not found", account_id))?;

            let transactions = db::list_transactions(&conn, account_id, limit)?;
            if json_output {
                return print_json(&transactions);
            }

            println!(
                "\n{} Transactions for {}\n",
                "📒".cyan().bold(),
                account.name.yellow().bold()
            );
            print!("{}", format_transactions_table(&transactions));
            Ok(())
        }
    }
}
