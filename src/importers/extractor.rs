//! Lazy row extraction from a statement sheet
//!
//! [`RowExtractor`] walks the sheet once, from the descriptor's first data row
//! downwards, yielding the four mapped cells of each row as text. The first
//! row that is empty across all four columns ends the sequence; trailing blank
//! rows after the last transaction are common in exported statements.

use std::iter::FusedIterator;
use tracing::debug;

use crate::importers::columns::ColumnPositions;
use crate::importers::workbook::{cell_text, date_cell_text, is_separator_text, Sheet};

/// The four raw cells of one statement row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based physical row number, for error reporting
    pub row_index: usize,
    pub date: String,
    pub narration: String,
    pub withdrawal: String,
    pub deposit: String,
}

impl RawRow {
    fn cells(&self) -> [&str; 4] {
        [
            self.date.as_str(),
            self.narration.as_str(),
            self.withdrawal.as_str(),
            self.deposit.as_str(),
        ]
    }

    /// Every mapped cell is empty or whitespace
    pub fn is_empty(&self) -> bool {
        self.cells().iter().all(|c| c.trim().is_empty())
    }

    /// Decoration line such as `*****` or `-----`
    pub fn is_separator(&self) -> bool {
        let filled: Vec<&str> = self
            .cells()
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect();
        !filled.is_empty() && filled.iter().all(|c| is_separator_text(c))
    }
}

/// Single-pass iterator over the data rows of a sheet
pub struct RowExtractor<'a> {
    sheet: &'a Sheet,
    positions: ColumnPositions,
    /// 0-based index of the next physical row to read
    next_row: usize,
    finished: bool,
}

/// Start extracting rows at the 1-indexed `start_row`
pub fn extract(sheet: &Sheet, positions: ColumnPositions, start_row: usize) -> RowExtractor<'_> {
    RowExtractor {
        sheet,
        positions,
        next_row: start_row.max(1) - 1,
        finished: false,
    }
}

impl RowExtractor<'_> {
    fn read_row(&self, row: usize) -> RawRow {
        let p = &self.positions;
        RawRow {
            row_index: row + 1,
            date: self
                .sheet
                .cell(row, p.date)
                .map(date_cell_text)
                .unwrap_or_default(),
            narration: self.sheet.cell(row, p.narration).map(cell_text).unwrap_or_default(),
            withdrawal: self.sheet.cell(row, p.withdrawal).map(cell_text).unwrap_or_default(),
            deposit: self.sheet.cell(row, p.deposit).map(cell_text).unwrap_or_default(),
        }
    }
}

impl Iterator for RowExtractor<'_> {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        while !self.finished {
            if self.next_row >= self.sheet.height() {
                self.finished = true;
                break;
            }

            let raw = self.read_row(self.next_row);
            self.next_row += 1;

            if raw.is_empty() {
                debug!("Row {} is blank, end of statement data", raw.row_index);
                self.finished = true;
                break;
            }
            if raw.is_separator() {
                debug!("Skipping separator row {}", raw.row_index);
                continue;
            }
            return Some(raw);
        }
        None
    }
}

impl FusedIterator for RowExtractor<'_> {}
