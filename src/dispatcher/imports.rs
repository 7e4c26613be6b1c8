use anyhow::{anyhow, Result};
use colored::Colorize;
use std::path::Path;
use tracing::info;

use super::{open_database, print_json};
use crate::cli::formatters::{format_candidates_preview, format_import_summary};
use crate::config::Config;
use crate::db::{self, SqliteStore};
use crate::error::ImportError;
use crate::importers::{
    read_statement_file, upload_file_name, ErrorResponse, FormatRegistry, ImportPipeline,
    StatementUpload,
};

pub fn dispatch_import(
    config: &Config,
    file: &Path,
    format_id: i64,
    account_id: i64,
    dry_run: bool,
    json_output: bool,
) -> Result<()> {
    info!("Importing statement {:?} with format {}", file, format_id);

    let mut conn = open_database(config)?;

    let account = db::get_account(&conn, account_id)?
        .ok_or_else(|| anyhow!("Account {} not found", account_id))?;
    let format = conn
        .find_format(format_id)?
        .ok_or_else(|| anyhow!("Statement format {} not found", format_id))?;

    let bytes = read_statement_file(file)?;
    let mut upload = StatementUpload::new(&bytes);
    if let Some(name) = upload_file_name(file) {
        upload = upload.with_file_name(name);
    }

    let pipeline = ImportPipeline::new(&format).with_normalizer(config.normalizer());
    let prepared = pipeline
        .prepare(upload, account_id)
        .map_err(|e| import_failed(e, json_output))?;

    if !json_output {
        println!(
            "\n{} Found {} transactions for {} using format {}\n",
            "✓".green().bold(),
            prepared.accepted().len(),
            account.name.cyan().bold(),
            format.name.yellow()
        );
        if !prepared.accepted().is_empty() {
            println!("{}", format_candidates_preview(prepared.accepted()));
        }
    }

    let result = if dry_run {
        prepared.into_result(Vec::new())
    } else {
        let mut store = SqliteStore::new(&mut conn);
        prepared
            .commit(&mut store)
            .map_err(|e| import_failed(e, json_output))?
    };

    if json_output {
        print_json(&result.response())
    } else {
        print!("{}", format_import_summary(&result, dry_run));
        Ok(())
    }
}

/// Emit the JSON error shape when requested and hand the error back to main
fn import_failed(err: ImportError, json_output: bool) -> anyhow::Error {
    if json_output {
        if let Ok(json) = serde_json::to_string_pretty(&ErrorResponse::from(&err)) {
            println!("{}", json);
        }
    }
    anyhow::Error::new(err)
}
