//! In-memory format registry and transaction store
//!
//! Used to run the pipeline without a database, e.g. in tests.

use std::collections::BTreeMap;

use crate::db::models::{FormatDescriptor, ImportBatch, TransactionCandidate};
use crate::error::StoreError;
use crate::importers::pipeline::{FormatRegistry, TransactionStore};

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    formats: BTreeMap<i64, FormatDescriptor>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor and return its assigned id
    pub fn insert(&mut self, mut format: FormatDescriptor) -> i64 {
        let id = self.formats.keys().next_back().map_or(1, |last| last + 1);
        format.id = Some(id);
        self.formats.insert(id, format);
        id
    }
}

impl FormatRegistry for MemoryRegistry {
    fn find_format(&self, id: i64) -> anyhow::Result<Option<FormatDescriptor>> {
        Ok(self.formats.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: Vec<(i64, TransactionCandidate)>,
    batches: Vec<ImportBatch>,
    failure: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every batch insert fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn transactions(&self) -> &[(i64, TransactionCandidate)] {
        &self.transactions
    }

    pub fn batches(&self) -> &[ImportBatch] {
        &self.batches
    }
}

impl TransactionStore for MemoryStore {
    fn insert_batch(
        &mut self,
        batch: &ImportBatch,
        candidates: &[TransactionCandidate],
    ) -> Result<Vec<i64>, StoreError> {
        if let Some(message) = &self.failure {
            return Err(StoreError(message.clone()));
        }

        let first_id = self.transactions.len() as i64 + 1;
        let ids: Vec<i64> = (first_id..first_id + candidates.len() as i64).collect();
        self.transactions
            .extend(ids.iter().copied().zip(candidates.iter().cloned()));

        let mut batch = batch.clone();
        batch.id = Some(self.batches.len() as i64 + 1);
        self.batches.push(batch);
        Ok(ids)
    }
}
