// Import module - configurable bank statement importer

pub mod columns;
pub mod extractor;
pub mod memory;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod workbook;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub use columns::{letter_to_index, ColumnPositions};
pub use extractor::RawRow;
pub use normalizer::RecordNormalizer;
pub use pipeline::{
    FormatRegistry, ImportPipeline, ImportStage, PreparedImport, StatementUpload,
    TransactionStore,
};
pub use report::{ErrorResponse, ImportResponse, ImportResult, RejectedRow};

/// Read an uploaded statement file into memory
///
/// Whether the bytes form a workbook is decided by the pipeline, which
/// reports `UnreadableFile` otherwise.
pub fn read_statement_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    info!("Reading statement file: {:?}", path);
    std::fs::read(path).with_context(|| format!("Failed to read statement file {:?}", path))
}

/// File name component of a path, for the import audit trail
pub fn upload_file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
