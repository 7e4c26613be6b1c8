use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::db::ColumnSpec;

pub mod formatters;

#[derive(Parser)]
#[command(name = "pocketbook")]
#[command(version, about = "Personal finance tracker with configurable bank statement imports")]
#[command(
    long_about = "Import bank statement spreadsheets into a local ledger. Each bank layout is described once as a statement format (which row the data starts on and which columns hold the date, narration, withdrawal and deposit) and reused for every upload."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a bank statement spreadsheet using a saved format
    Import {
        /// Path to the statement (xlsx, xlsm, xlsb, xls or ods)
        file: PathBuf,

        /// Statement format id (see `formats list`)
        #[arg(short, long = "format")]
        format_id: i64,

        /// Account id to import into (see `accounts list`)
        #[arg(short, long = "account")]
        account_id: i64,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Bank account management
    Accounts {
        #[command(subcommand)]
        action: AccountCommands,
    },

    /// Statement format management
    Formats {
        #[command(subcommand)]
        action: FormatCommands,
    },

    /// Imported transactions
    Transactions {
        #[command(subcommand)]
        action: TransactionCommands,
    },

    /// Show the first rows of a statement with column letters
    Inspect {
        /// Path to the statement
        file: PathBuf,

        /// Number of rows to show
        #[arg(short, long, default_value_t = 15)]
        rows: usize,

        /// Inspect every sheet, not just the first
        #[arg(long)]
        all_sheets: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Add a new account
    Add {
        /// Account name
        name: String,

        /// Bank name
        #[arg(long)]
        bank: Option<String>,
    },

    /// List all accounts
    List,
}

/// Column arguments accept `letter:C`, `name:Narration`, `index:2`, or the
/// shorthand `C` / `2` / `Narration`.
#[derive(Subcommand)]
pub enum FormatCommands {
    /// Save a new statement format
    Add {
        /// Format name (unique)
        name: String,

        /// Bank name
        #[arg(long)]
        bank: Option<String>,

        /// 1-indexed row where transaction data begins
        #[arg(long)]
        start_row: usize,

        /// Date column
        #[arg(long)]
        date: ColumnSpec,

        /// Narration/description column
        #[arg(long)]
        narration: ColumnSpec,

        /// Withdrawal/debit column
        #[arg(long)]
        withdrawal: ColumnSpec,

        /// Deposit/credit column
        #[arg(long)]
        deposit: ColumnSpec,
    },

    /// List saved formats
    List,

    /// Show a single format
    Show {
        /// Format id
        id: i64,
    },

    /// Change fields of a saved format
    Update {
        /// Format id
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        bank: Option<String>,

        #[arg(long)]
        start_row: Option<usize>,

        #[arg(long)]
        date: Option<ColumnSpec>,

        #[arg(long)]
        narration: Option<ColumnSpec>,

        #[arg(long)]
        withdrawal: Option<ColumnSpec>,

        #[arg(long)]
        deposit: Option<ColumnSpec>,
    },

    /// Delete a saved format
    Remove {
        /// Format id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// List transactions of an account, oldest first
    List {
        /// Account id
        #[arg(short, long = "account")]
        account_id: i64,

        /// Show at most this many transactions
        #[arg(short, long)]
        limit: Option<usize>,
    },
}
