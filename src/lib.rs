//! Pocketbook - personal finance ledger with configurable statement imports
//!
//! Bank statement spreadsheets are imported through user-authored format
//! descriptors: the engine in [`importers`] resolves the descriptor's columns
//! against the uploaded sheet, extracts and normalizes every data row, and
//! persists the accepted rows as one atomic batch.

pub mod cli;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod importers;
pub mod utils;
