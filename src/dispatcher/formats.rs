use anyhow::{anyhow, Result};
use colored::Colorize;

use super::{open_database, print_json};
use crate::cli::formatters::{format_format_detail, format_formats_table};
use crate::cli::FormatCommands;
use crate::config::Config;
use crate::db::{self, FormatDescriptor};

pub fn dispatch_formats(config: &Config, action: FormatCommands, json_output: bool) -> Result<()> {
    let conn = open_database(config)?;

    match action {
        FormatCommands::Add {
            name,
            bank,
            start_row,
            date,
            narration,
            withdrawal,
            deposit,
        } => {
            let format = FormatDescriptor {
                id: None,
                name,
                bank_name: bank,
                data_start_row: start_row,
                date_column: date,
                narration_column: narration,
                withdrawal_column: withdrawal,
                deposit_column: deposit,
            };
            let id = db::insert_format(&conn, &format)?;

            if json_output {
                return print_json(&serde_json::json!({ "success": true, "id": id }));
            }
            println!("\n{} Format saved with ID {}", "✓".green().bold(), id);
            print!("{}", format_format_detail(&FormatDescriptor { id: Some(id), ..format }));
            Ok(())
        }

        FormatCommands::List => {
            let formats = db::list_formats(&conn)?;
            if json_output {
                return print_json(&formats);
            }
            println!("{}", format_formats_table(&formats));
            Ok(())
        }

        FormatCommands::Show { id } => {
            let format = db::get_format(&conn, id)?
                .ok_or_else(|| anyhow!("Statement format {} not found", id))?;
            if json_output {
                return print_json(&format);
            }
            print!("{}", format_format_detail(&format));
            Ok(())
        }

        FormatCommands::Update {
            id,
            name,
            bank,
            start_row,
            date,
            narration,
            withdrawal,
            deposit,
        } => {
            let mut format = db::get_format(&conn, id)?
                .ok_or_else(|| anyhow!("Statement format {} not found", id))?;

            if let Some(name) = name {
                format.name = name;
            }
            if let Some(bank) = bank {
                format.bank_name = Some(bank);
            }
            if let Some(start_row) = start_row {
                format.data_start_row = start_row;
            }
            if let Some(date) = date {
                format.date_column = date;
            }
            if let Some(narration) = narration {
                format.narration_column = narration;
            }
            if let Some(withdrawal) = withdrawal {
                format.withdrawal_column = withdrawal;
            }
            if let Some(deposit) = deposit {
                format.deposit_column = deposit;
            }

            db::update_format(&conn, id, &format)?;
            if json_output {
                return print_json(&format);
            }
            println!("\n{} Format {} updated", "✓".green().bold(), id);
            print!("{}", format_format_detail(&format));
            Ok(())
        }

        FormatCommands::Remove { id } => {
            if !db::delete_format(&conn, id)? {
                return Err(anyhow!("Statement format {} not found", id));
            }
            if json_output {
                return print_json(&serde_json::json!({ "success": true, "id": id }));
            }
            println!("{} Format {} removed", "✓".green().bold(), id);
            Ok(())
        }
    }
}
