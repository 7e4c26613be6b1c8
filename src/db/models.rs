use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a format descriptor addresses one physical column
///
/// Textual form: `letter:C`, `name:Narration`, `index:2`. Without a prefix,
/// all digits parse as an index, one to three uppercase letters as a letter,
/// and anything else as a header name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnSpec {
    /// Spreadsheet column letter ("A", "B", ... "AA")
    Letter(String),
    /// Header text, matched case-insensitively after trimming
    Name(String),
    /// 0-based column ordinal
    Index(i64),
}

impl ColumnSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnSpec::Letter(_) => "letter",
            ColumnSpec::Name(_) => "name",
            ColumnSpec::Index(_) => "index",
        }
    }

    /// Value part of the textual form, without the kind prefix
    pub fn value(&self) -> String {
        match self {
            ColumnSpec::Letter(s) | ColumnSpec::Name(s) => s.clone(),
            ColumnSpec::Index(i) => i.to_string(),
        }
    }

    /// Rebuild a spec from its stored kind/value pair
    pub fn from_parts(kind: &str, value: &str) -> Result<Self, String> {
        match kind {
            "letter" => Ok(ColumnSpec::Letter(value.to_string())),
            "name" => Ok(ColumnSpec::Name(value.to_string())),
            "index" => value
                .trim()
                .parse::<i64>()
                .map(ColumnSpec::Index)
                .map_err(|_| format!("Invalid column index: '{}'", value)),
            other => Err(format!("Unknown column spec kind: '{}'", other)),
        }
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

impl FromStr for ColumnSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((prefix, rest)) = s.split_once(':') {
            let prefix = prefix.trim().to_ascii_lowercase();
            if matches!(prefix.as_str(), "letter" | "name" | "index") {
                return ColumnSpec::from_parts(&prefix, rest);
            }
        }

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Column spec cannot be empty".to_string());
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return trimmed
                .parse::<i64>()
                .map(ColumnSpec::Index)
                .map_err(|_| format!("Column index out of range: '{}'", trimmed));
        }
        if trimmed.len() <= 3 && trimmed.chars().all(|c| c.is_ascii_uppercase()) {
            return Ok(ColumnSpec::Letter(trimmed.to_string()));
        }
        Ok(ColumnSpec::Name(trimmed.to_string()))
    }
}

impl TryFrom<String> for ColumnSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnSpec> for String {
    fn from(spec: ColumnSpec) -> Self {
        spec.to_string()
    }
}

/// User-authored mapping from statement fields to spreadsheet columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub id: Option<i64>,
    pub name: String,
    pub bank_name: Option<String>,
    /// 1-indexed row where transaction data begins
    pub data_start_row: usize,
    pub date_column: ColumnSpec,
    pub narration_column: ColumnSpec,
    pub withdrawal_column: ColumnSpec,
    pub deposit_column: ColumnSpec,
}

impl FormatDescriptor {
    /// Check the invariants that do not depend on a sheet
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Format name cannot be empty".to_string());
        }
        if self.data_start_row < 1 {
            return Err("data_start_row must be at least 1".to_string());
        }
        Ok(())
    }

    /// The four column specs in field order
    pub fn columns(&self) -> [(&'static str, &ColumnSpec); 4] {
        [
            ("date", &self.date_column),
            ("narration", &self.narration_column),
            ("withdrawal", &self.withdrawal_column),
            ("deposit", &self.deposit_column),
        ]
    }
}

/// Bank account transactions are imported into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<i64>,
    pub name: String,
    pub bank_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A normalized statement row, ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    pub account_id: i64,
    pub occurred_at: NaiveDateTime,
    pub narration: String,
    pub withdrawal_amount: Decimal,
    pub deposit_amount: Decimal,
    /// 1-based row in the uploaded sheet
    pub row_index: usize,
}

/// Persisted ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<i64>,
    pub account_id: i64,
    pub occurred_at: NaiveDateTime,
    pub narration: String,
    pub withdrawal_amount: Decimal,
    pub deposit_amount: Decimal,
    pub source: String, // 'IMPORT', 'MANUAL'
    pub source_file: Option<String>,
    pub import_batch_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Audit record of one completed upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: Option<i64>,
    pub account_id: i64,
    pub format_id: Option<i64>,
    pub file_name: Option<String>,
    /// blake3 hex digest of the uploaded bytes
    pub file_hash: String,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub created_at: DateTime<Utc>,
}
