//! Error taxonomy for statement imports
//!
//! Fatal errors abort the whole import and surface as a single [`ImportError`].
//! Per-row problems are [`RowRejection`]s: the unparseable ones are reported
//! alongside a successful result, the filtered ones are dropped silently.
//! Application code outside the engine uses `anyhow` for context chaining.

use thiserror::Error;

/// Why a column specifier could not be turned into a position
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("invalid column spec: {0}")]
    InvalidColumnSpec(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("ambiguous column '{name}': header matches columns {positions:?}")]
    AmbiguousColumn { name: String, positions: Vec<usize> },

    #[error("{first} and {second} both resolve to column {position}")]
    DuplicateColumn {
        first: &'static str,
        second: &'static str,
        position: usize,
    },
}

impl ColumnError {
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnError::InvalidColumnSpec(_) => "InvalidColumnSpec",
            ColumnError::ColumnNotFound(_) => "ColumnNotFound",
            ColumnError::AmbiguousColumn { .. } => "AmbiguousColumn",
            ColumnError::DuplicateColumn { .. } => "DuplicateColumn",
        }
    }
}

/// Error raised by a transaction store while persisting a batch
#[derive(Error, Debug)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Fatal import errors. Nothing is persisted when one of these is returned.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unreadable file: {0}")]
    UnreadableFile(String),

    #[error("format resolution failed for {field} column: {source}")]
    FormatResolution {
        field: &'static str,
        #[source]
        source: ColumnError,
    },

    #[error("persistence failed, batch rolled back: {0}")]
    Persistence(#[from] StoreError),
}

impl ImportError {
    /// Stable identifier for the error kind, used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::UnreadableFile(_) => "UnreadableFile",
            ImportError::FormatResolution { .. } => "FormatResolutionError",
            ImportError::Persistence(_) => "PersistenceError",
        }
    }
}

/// Why a single row did not become a transaction candidate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    #[error("unparseable date: '{0}'")]
    UnparseableDate(String),

    #[error("unparseable {column} amount: '{value}'")]
    UnparseableAmount { column: &'static str, value: String },

    #[error("missing narration")]
    MissingNarration,

    #[error("blank row")]
    BlankRow,

    #[error("summary row: '{0}'")]
    SummaryRow(String),
}

impl RowRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            RowRejection::UnparseableDate(_) => "UnparseableDate",
            RowRejection::UnparseableAmount { .. } => "UnparseableAmount",
            RowRejection::MissingNarration => "MissingNarration",
            RowRejection::BlankRow => "BlankRow",
            RowRejection::SummaryRow(_) => "SummaryRow",
        }
    }

    /// Filtered rows are skipped silently and never reported as rejected
    pub fn is_filtered(&self) -> bool {
        matches!(self, RowRejection::BlankRow | RowRejection::SummaryRow(_))
    }
}

/// Result type alias for application code
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = ImportError::UnreadableFile("not a workbook".to_string());
        assert_eq!(err.to_string(), "unreadable file: not a workbook");
        assert_eq!(err.kind(), "UnreadableFile");
    }

    #[test]
    fn test_format_resolution_wraps_column_error() {
        let err = ImportError::FormatResolution {
            field: "narration",
            source: ColumnError::ColumnNotFound("Narration".to_string()),
        };
        assert_eq!(err.kind(), "FormatResolutionError");
        assert!(err.to_string().contains("narration column"));
        assert!(err.to_string().contains("column not found: Narration"));
    }

    #[test]
    fn test_filtered_rejections() {
        assert!(RowRejection::BlankRow.is_filtered());
        assert!(RowRejection::SummaryRow("Closing balance".into()).is_filtered());
        assert!(!RowRejection::UnparseableDate("31/13/2024".into()).is_filtered());
        assert!(!RowRejection::MissingNarration.is_filtered());
        assert_eq!(
            RowRejection::UnparseableAmount {
                column: "withdrawal",
                value: "abc".into()
            }
            .kind(),
            "UnparseableAmount"
        );
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(anyhow::Error::new(ImportError::UnreadableFile(
            "zip header".to_string(),
        )))
        .context("failed to import statement.xlsx");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to import statement.xlsx"));
        assert!(format!("{:?}", err).contains("zip header"));
    }
}
