//! Output formatting module for CLI display
//!
//! Data is fetched and computed by the dispatcher; everything here only turns
//! it into terminal text.

use colored::Colorize;
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::db::{Account, FormatDescriptor, Transaction, TransactionCandidate};
use crate::importers::{ImportResult, RejectedRow};
use crate::utils::{format_amount, format_amount_or_blank};

const PREVIEW_ROWS: usize = 10;

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "Row")]
    row: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Narration")]
    narration: String,
    #[tabled(rename = "Withdrawal")]
    withdrawal: String,
    #[tabled(rename = "Deposit")]
    deposit: String,
}

/// First rows of an import, as they will be stored
pub fn format_candidates_preview(candidates: &[TransactionCandidate]) -> String {
    let rows: Vec<TransactionRow> = candidates
        .iter()
        .take(PREVIEW_ROWS)
        .map(|c| TransactionRow {
            row: c.row_index.to_string(),
            date: c.occurred_at.format("%Y-%m-%d").to_string(),
            narration: truncate(&c.narration, 48),
            withdrawal: format_amount_or_blank(c.withdrawal_amount),
            deposit: format_amount_or_blank(c.deposit_amount),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.modify(Columns::new(3..), Alignment::right());

    let mut output = table.to_string();
    if candidates.len() > PREVIEW_ROWS {
        output.push_str(&format!(
            "\n... and {} more transactions",
            candidates.len() - PREVIEW_ROWS
        ));
    }
    output
}

/// Totals and rejected rows of an import
pub fn format_import_summary(result: &ImportResult, dry_run: bool) -> String {
    let mut output = String::new();

    if dry_run {
        output.push_str(&format!(
            "\n{} Dry run - no changes saved\n",
            "ℹ".blue().bold()
        ));
    } else {
        output.push_str(&format!("\n{} Import complete!\n", "✓".green().bold()));
    }

    output.push_str(&format!(
        "  {:<20} {}\n",
        "Transactions:",
        result.accepted_count.to_string().green()
    ));
    output.push_str(&format!(
        "  {:<20} {}\n",
        "Total withdrawals:",
        format_amount(result.total_withdrawals).red()
    ));
    output.push_str(&format!(
        "  {:<20} {}\n",
        "Total deposits:",
        format_amount(result.total_deposits).green()
    ));
    output.push_str(&format!(
        "  {:<20} {}\n",
        "Net:",
        colored_amount(result.net).bold()
    ));

    if !result.rejected_rows.is_empty() {
        output.push_str(&format!(
            "\n{} {} rows rejected:\n",
            "⚠".yellow().bold(),
            result.rejected_rows.len()
        ));
        output.push_str(&format_rejected_rows(&result.rejected_rows));
        output.push('\n');
    }

    output
}

fn format_rejected_rows(rows: &[RejectedRow]) -> String {
    #[derive(Tabled)]
    struct RejectionRow {
        #[tabled(rename = "Row")]
        row: usize,
        #[tabled(rename = "Reason")]
        reason: String,
        #[tabled(rename = "Detail")]
        detail: String,
    }

    let rows: Vec<RejectionRow> = rows
        .iter()
        .map(|r| RejectionRow {
            row: r.row_index,
            reason: r.reason.clone(),
            detail: r.detail.clone(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn format_accounts_table(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return format!(
            "{} No accounts yet\nCreate one using: {} accounts add <name>\n",
            "ℹ".blue().bold(),
            "pocketbook".bold()
        );
    }

    #[derive(Tabled)]
    struct AccountRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Bank")]
        bank: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<AccountRow> = accounts
        .iter()
        .map(|a| AccountRow {
            id: a.id.map(|id| id.to_string()).unwrap_or_default(),
            name: a.name.clone(),
            bank: a.bank_name.clone().unwrap_or_default(),
            created: a.created_at.format("%Y-%m-%d").to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn format_formats_table(formats: &[FormatDescriptor]) -> String {
    if formats.is_empty() {
        return format!(
            "{} No statement formats yet\nCreate one using: {} formats add <name> ...\n",
            "ℹ".blue().bold(),
            "pocketbook".bold()
        );
    }

    #[derive(Tabled)]
    struct FormatRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Bank")]
        bank: String,
        #[tabled(rename = "Start Row")]
        start_row: usize,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Narration")]
        narration: String,
        #[tabled(rename = "Withdrawal")]
        withdrawal: String,
        #[tabled(rename = "Deposit")]
        deposit: String,
    }

    let rows: Vec<FormatRow> = formats
        .iter()
        .map(|f| FormatRow {
            id: f.id.map(|id| id.to_string()).unwrap_or_default(),
            name: f.name.clone(),
            bank: f.bank_name.clone().unwrap_or_default(),
            start_row: f.data_start_row,
            date: f.date_column.to_string(),
            narration: f.narration_column.to_string(),
            withdrawal: f.withdrawal_column.to_string(),
            deposit: f.deposit_column.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn format_format_detail(format: &FormatDescriptor) -> String {
    let mut output = format!(
        "\n{} Statement format {}\n",
        "📄".cyan().bold(),
        format.name.yellow().bold()
    );
    if let Some(id) = format.id {
        output.push_str(&format!("  {:<12} {}\n", "ID:", id));
    }
    if let Some(bank) = &format.bank_name {
        output.push_str(&format!("  {:<12} {}\n", "Bank:", bank));
    }
    output.push_str(&format!("  {:<12} {}\n", "Start row:", format.data_start_row));
    for (field, spec) in format.columns() {
        output.push_str(&format!(
            "  {:<12} {}\n",
            format!("{}:", field),
            spec.to_string().cyan()
        ));
    }
    output
}

pub fn format_transactions_table(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return format!("{} No transactions found\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct LedgerRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Narration")]
        narration: String,
        #[tabled(rename = "Withdrawal")]
        withdrawal: String,
        #[tabled(rename = "Deposit")]
        deposit: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    let rows: Vec<LedgerRow> = transactions
        .iter()
        .map(|t| LedgerRow {
            id: t.id.map(|id| id.to_string()).unwrap_or_default(),
            date: t.occurred_at.format("%Y-%m-%d").to_string(),
            narration: truncate(&t.narration, 48),
            withdrawal: format_amount_or_blank(t.withdrawal_amount),
            deposit: format_amount_or_blank(t.deposit_amount),
            source: t.source_file.clone().unwrap_or_else(|| t.source.clone()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.modify(Columns::new(3..5), Alignment::right());

    let withdrawals: Decimal = transactions.iter().map(|t| t.withdrawal_amount).sum();
    let deposits: Decimal = transactions.iter().map(|t| t.deposit_amount).sum();

    format!(
        "{}\n{} transactions, withdrawals {}, deposits {}, net {}\n",
        table,
        transactions.len(),
        format_amount(withdrawals),
        format_amount(deposits),
        colored_amount(deposits - withdrawals)
    )
}

fn colored_amount(value: Decimal) -> colored::ColoredString {
    if value >= Decimal::ZERO {
        format_amount(value).green()
    } else {
        format_amount(value).red()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
