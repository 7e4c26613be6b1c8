//! Statement import orchestration
//!
//! An import moves through `Resolving -> Extracting -> Normalizing ->
//! Persisting -> Completed`. Format problems fail during resolution before any
//! row is read. Unparseable rows are recorded and skipped. Accepted rows are
//! handed to the [`TransactionStore`] once, as a single atomic batch, after
//! the whole sheet has been normalized; nothing is written before that point.

use chrono::Utc;
use rust_decimal::Decimal;
use std::fmt;
use tracing::{debug, info, info_span, warn};

use crate::db::models::{FormatDescriptor, ImportBatch, TransactionCandidate};
use crate::error::{ImportError, RowRejection, StoreError};
use crate::importers::columns::resolve_all;
use crate::importers::extractor::extract;
use crate::importers::normalizer::RecordNormalizer;
use crate::importers::report::{ImportResult, RejectedRow};
use crate::importers::workbook::open_first_sheet;

/// Source of format descriptors
pub trait FormatRegistry {
    fn find_format(&self, id: i64) -> anyhow::Result<Option<FormatDescriptor>>;
}

/// Destination for normalized transactions
pub trait TransactionStore {
    /// Persist every candidate or none of them, returning the assigned ids in
    /// candidate order. A store that cannot produce one id per candidate must
    /// fail before committing.
    fn insert_batch(
        &mut self,
        batch: &ImportBatch,
        candidates: &[TransactionCandidate],
    ) -> Result<Vec<i64>, StoreError>;
}

/// Stages of a single import run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Resolving,
    Extracting,
    Normalizing,
    Persisting,
    Completed,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportStage::Resolving => "resolving",
            ImportStage::Extracting => "extracting",
            ImportStage::Normalizing => "normalizing",
            ImportStage::Persisting => "persisting",
            ImportStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

fn enter_stage(stage: ImportStage) {
    debug!(%stage, "import stage");
}

fn too_large(column: &'static str, amount: Decimal) -> RowRejection {
    RowRejection::UnparseableAmount {
        column,
        value: format!("{} (total too large)", amount),
    }
}

/// An uploaded statement file
#[derive(Debug, Clone, Copy)]
pub struct StatementUpload<'a> {
    pub bytes: &'a [u8],
    pub file_name: Option<&'a str>,
}

impl<'a> StatementUpload<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: &'a str) -> Self {
        self.file_name = Some(file_name);
        self
    }
}

/// Normalized rows of one upload, not yet persisted
#[derive(Debug, Clone)]
pub struct PreparedImport {
    account_id: i64,
    format_id: Option<i64>,
    file_name: Option<String>,
    file_hash: String,
    accepted: Vec<TransactionCandidate>,
    total_withdrawals: Decimal,
    total_deposits: Decimal,
    rejected_rows: Vec<RejectedRow>,
}

impl PreparedImport {
    /// Add a candidate to the batch, or reject it when a running total would
    /// leave the decimal range
    fn accept(&mut self, candidate: TransactionCandidate) -> Result<(), RowRejection> {
        let total_withdrawals = self
            .total_withdrawals
            .checked_add(candidate.withdrawal_amount)
            .ok_or_else(|| too_large("withdrawal", candidate.withdrawal_amount))?;
        let total_deposits = self
            .total_deposits
            .checked_add(candidate.deposit_amount)
            .ok_or_else(|| too_large("deposit", candidate.deposit_amount))?;

        self.total_withdrawals = total_withdrawals;
        self.total_deposits = total_deposits;
        self.accepted.push(candidate);
        Ok(())
    }

    pub fn accepted(&self) -> &[TransactionCandidate] {
        &self.accepted
    }

    pub fn rejected_rows(&self) -> &[RejectedRow] {
        &self.rejected_rows
    }

    /// Persist the accepted rows as one batch
    pub fn commit<S>(self, store: &mut S) -> Result<ImportResult, ImportError>
    where
        S: TransactionStore + ?Sized,
    {
        enter_stage(ImportStage::Persisting);
        let batch = ImportBatch {
            id: None,
            account_id: self.account_id,
            format_id: self.format_id,
            file_name: self.file_name.clone(),
            file_hash: self.file_hash.clone(),
            accepted_count: self.accepted.len(),
            rejected_count: self.rejected_rows.len(),
            created_at: Utc::now(),
        };

        let ids = store.insert_batch(&batch, &self.accepted).map_err(|e| {
            warn!("Persisting {} transactions failed: {}", self.accepted.len(), e);
            ImportError::Persistence(e)
        })?;

        enter_stage(ImportStage::Completed);
        info!(
            "Imported {} transactions ({} rows rejected)",
            ids.len(),
            self.rejected_rows.len()
        );
        Ok(self.into_result(ids))
    }

    /// Summarize without persisting
    pub fn into_result(self, transaction_ids: Vec<i64>) -> ImportResult {
        ImportResult {
            accepted_count: self.accepted.len(),
            total_withdrawals: self.total_withdrawals,
            total_deposits: self.total_deposits,
            net: self.total_deposits - self.total_withdrawals,
            rejected_rows: self.rejected_rows,
            transaction_ids,
        }
    }
}

/// Runs one format descriptor over uploaded statements
pub struct ImportPipeline<'a> {
    format: &'a FormatDescriptor,
    normalizer: RecordNormalizer,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(format: &'a FormatDescriptor) -> Self {
        Self {
            format,
            normalizer: RecordNormalizer::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: RecordNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Resolve, extract and normalize an upload without touching any store
    pub fn prepare(
        &self,
        upload: StatementUpload<'_>,
        account_id: i64,
    ) -> Result<PreparedImport, ImportError> {
        let span = info_span!("import", format = %self.format.name, account_id);
        let _guard = span.enter();

        enter_stage(ImportStage::Resolving);
        let sheet = open_first_sheet(upload.bytes)?;
        let positions = resolve_all(self.format, &sheet).map_err(|e| {
            warn!("Format '{}' does not fit sheet '{}': {}", self.format.name, sheet.name(), e);
            e
        })?;

        let mut prepared = PreparedImport {
            account_id,
            format_id: self.format.id,
            file_name: upload.file_name.map(str::to_string),
            file_hash: blake3::hash(upload.bytes).to_hex().to_string(),
            accepted: Vec::new(),
            total_withdrawals: Decimal::ZERO,
            total_deposits: Decimal::ZERO,
            rejected_rows: Vec::new(),
        };

        enter_stage(ImportStage::Extracting);
        let rows = extract(&sheet, positions, self.format.data_start_row);

        enter_stage(ImportStage::Normalizing);
        for raw in rows {
            let outcome = self
                .normalizer
                .normalize(&raw, account_id)
                .and_then(|candidate| prepared.accept(candidate));
            match outcome {
                Ok(()) => {}
                Err(rejection) if rejection.is_filtered() => {
                    debug!("Row {} filtered: {}", raw.row_index, rejection);
                }
                Err(rejection) => {
                    warn!("Rejected row {}: {}", raw.row_index, rejection);
                    prepared
                        .rejected_rows
                        .push(RejectedRow::new(raw.row_index, &rejection));
                }
            }
        }

        info!(
            "Normalized {} rows ({} rejected)",
            prepared.accepted.len(),
            prepared.rejected_rows.len()
        );
        Ok(prepared)
    }

    /// Dry run: the full summary, nothing persisted
    pub fn preview(
        &self,
        upload: StatementUpload<'_>,
        account_id: i64,
    ) -> Result<ImportResult, ImportError> {
        Ok(self.prepare(upload, account_id)?.into_result(Vec::new()))
    }

    /// Import an upload and persist the accepted rows as one batch
    pub fn run<S>(
        &self,
        upload: StatementUpload<'_>,
        account_id: i64,
        store: &mut S,
    ) -> Result<ImportResult, ImportError>
    where
        S: TransactionStore + ?Sized,
    {
        self.prepare(upload, account_id)?.commit(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ColumnSpec;
    use crate::importers::memory::MemoryStore;

    fn format() -> FormatDescriptor {
        FormatDescriptor {
            id: Some(1),
            name: "Test".into(),
            bank_name: None,
            data_start_row: 2,
            date_column: ColumnSpec::Letter("A".into()),
            narration_column: ColumnSpec::Letter("B".into()),
            withdrawal_column: ColumnSpec::Letter("C".into()),
            deposit_column: ColumnSpec::Letter("D".into()),
        }
    }

    #[test]
    fn test_unreadable_bytes_fail_before_resolution() {
        let format = format();
        let mut store = MemoryStore::new();
        let err = ImportPipeline::new(&format)
            .run(StatementUpload::new(b"not a workbook"), 1, &mut store)
            .unwrap_err();
        assert_eq!(err.kind(), "UnreadableFile");
        assert!(store.transactions().is_empty());
        assert!(store.batches().is_empty());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(ImportStage::Resolving.to_string(), "resolving");
        assert_eq!(ImportStage::Completed.to_string(), "completed");
    }

    fn empty_prepared() -> PreparedImport {
        PreparedImport {
            account_id: 1,
            format_id: None,
            file_name: None,
            file_hash: String::new(),
            accepted: Vec::new(),
            total_withdrawals: Decimal::ZERO,
            total_deposits: Decimal::ZERO,
            rejected_rows: Vec::new(),
        }
    }

    fn candidate(withdrawal: &str, deposit: &str) -> TransactionCandidate {
        TransactionCandidate {
            account_id: 1,
            occurred_at: chrono::NaiveDate::from_ymd_opt(2024, 2, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            narration: "x".into(),
            withdrawal_amount: withdrawal.parse().unwrap(),
            deposit_amount: deposit.parse().unwrap(),
            row_index: 2,
        }
    }

    /// Hands back one id fewer than it was given
    struct ShortStore;

    impl TransactionStore for ShortStore {
        fn insert_batch(
            &mut self,
            _batch: &ImportBatch,
            candidates: &[TransactionCandidate],
        ) -> Result<Vec<i64>, StoreError> {
            Ok((1..candidates.len() as i64).collect())
        }
    }

    #[test]
    fn test_prepared_import_net_sign_convention() {
        let mut prepared = empty_prepared();
        for (w, d) in [("4.50", "0"), ("0", "2000.00"), ("120.25", "0")] {
            prepared.accept(candidate(w, d)).unwrap();
        }
        let result = prepared.into_result(Vec::new());
        assert_eq!(result.accepted_count, 3);
        assert_eq!(result.total_withdrawals - result.total_deposits, -result.net);
        assert_eq!(result.net, "1875.25".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_accept_rejects_amount_that_overflows_total() {
        let huge = "50000000000000000000000000000";
        let mut prepared = empty_prepared();
        prepared.accept(candidate("0", huge)).unwrap();

        let rejection = prepared.accept(candidate("0", huge)).unwrap_err();
        assert_eq!(rejection.kind(), "UnparseableAmount");
        assert!(rejection.to_string().contains("deposit"));

        // the first row and its total are untouched
        assert_eq!(prepared.accepted().len(), 1);
        let result = prepared.into_result(Vec::new());
        assert_eq!(result.total_deposits, huge.parse::<Decimal>().unwrap());
        assert_eq!(result.net, result.total_deposits);
    }

    #[test]
    fn test_commit_never_fails_after_store_persisted() {
        let mut prepared = empty_prepared();
        prepared.accept(candidate("4.50", "0")).unwrap();
        prepared.accept(candidate("0", "2000.00")).unwrap();

        let result = prepared.commit(&mut ShortStore).unwrap();
        assert_eq!(result.accepted_count, 2);
        assert_eq!(result.transaction_ids, vec![1]);
    }
}
