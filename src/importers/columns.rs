//! Column resolution for format descriptors
//!
//! Turns each [`ColumnSpec`] of a descriptor into a concrete 0-based column
//! position within a sheet. Resolution happens once per import, before any
//! data row is read.

use itertools::Itertools;
use tracing::{debug, warn};

use crate::db::models::{ColumnSpec, FormatDescriptor};
use crate::error::{ColumnError, ImportError};
use crate::importers::workbook::{is_separator_text, Sheet};

/// Resolved positions of the four statement fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPositions {
    pub date: usize,
    pub narration: usize,
    pub withdrawal: usize,
    pub deposit: usize,
}

impl ColumnPositions {
    fn fields(&self) -> [(&'static str, usize); 4] {
        [
            ("date", self.date),
            ("narration", self.narration),
            ("withdrawal", self.withdrawal),
            ("deposit", self.deposit),
        ]
    }
}

/// Convert a spreadsheet column letter to a 0-based index
///
/// Bijective base 26: A=0, Z=25, AA=26, AZ=51, BA=52.
pub fn letter_to_index(letter: &str) -> Result<usize, ColumnError> {
    let letter = letter.trim();
    if letter.is_empty() || !letter.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ColumnError::InvalidColumnSpec(format!(
            "'{}' is not a column letter",
            letter
        )));
    }

    let mut number: usize = 0;
    for c in letter.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        number = number
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .ok_or_else(|| {
                ColumnError::InvalidColumnSpec(format!("column letter '{}' is too large", letter))
            })?;
    }
    Ok(number - 1)
}

/// Convert a 0-based index back to its column letter
pub fn index_to_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Resolve a single column spec against an optional header row
pub fn resolve(
    spec: &ColumnSpec,
    header_row: Option<&[String]>,
    sheet_width: usize,
) -> Result<usize, ColumnError> {
    match spec {
        ColumnSpec::Letter(letter) => letter_to_index(letter),
        ColumnSpec::Index(index) => {
            if *index < 0 {
                return Err(ColumnError::InvalidColumnSpec(format!(
                    "column index {} is negative",
                    index
                )));
            }
            let position = *index as usize;
            if position >= sheet_width {
                return Err(ColumnError::InvalidColumnSpec(format!(
                    "column index {} is outside the sheet (width {})",
                    index, sheet_width
                )));
            }
            Ok(position)
        }
        ColumnSpec::Name(name) => {
            let wanted = name.trim().to_lowercase();
            if wanted.is_empty() {
                return Err(ColumnError::InvalidColumnSpec(
                    "column name cannot be empty".to_string(),
                ));
            }
            let header = header_row.ok_or_else(|| {
                ColumnError::ColumnNotFound(format!("'{}' (no header row above the data)", name))
            })?;

            let matches: Vec<usize> = header
                .iter()
                .positions(|cell| cell.trim().to_lowercase() == wanted)
                .collect();

            match matches.as_slice() {
                [] => Err(ColumnError::ColumnNotFound(format!("'{}'", name))),
                [position] => Ok(*position),
                _ => Err(ColumnError::AmbiguousColumn {
                    name: name.clone(),
                    positions: matches,
                }),
            }
        }
    }
}

/// Header position whose text equals a letter spec, when that is not the
/// letter's own column
///
/// Shorthand values such as `AMT` parse as letters, so a header literally
/// named `AMT` is easy to miss.
pub fn letter_shadowed_by_header(spec: &ColumnSpec, header: &[String]) -> Option<usize> {
    let ColumnSpec::Letter(letter) = spec else {
        return None;
    };
    let own = letter_to_index(letter).ok()?;
    header
        .iter()
        .position(|cell| cell.trim().eq_ignore_ascii_case(letter.trim()))
        .filter(|&position| position != own)
}

/// Find the header row for a descriptor
///
/// The header is the nearest row above `data_start_row` that has content and
/// is not a separator line. A descriptor whose data starts on row 1 has none.
pub fn find_header_row(sheet: &Sheet, data_start_row: usize) -> Option<Vec<String>> {
    let first_data_idx = data_start_row.saturating_sub(1).min(sheet.height());
    (0..first_data_idx).rev().map(|row| sheet.row_texts(row)).find(|cells| {
        let filled: Vec<&String> = cells.iter().filter(|c| !c.trim().is_empty()).collect();
        !filled.is_empty() && !filled.iter().all(|c| is_separator_text(c))
    })
}

/// Resolve all four columns of a descriptor, failing fast on the first problem
pub fn resolve_all(
    format: &FormatDescriptor,
    sheet: &Sheet,
) -> Result<ColumnPositions, ImportError> {
    let header = find_header_row(sheet, format.data_start_row);
    let width = sheet.width();

    let mut resolved = [0usize; 4];
    for (slot, (field, spec)) in resolved.iter_mut().zip(format.columns()) {
        *slot = resolve(spec, header.as_deref(), width)
            .map_err(|source| ImportError::FormatResolution { field, source })?;
        if let Some(named) = header
            .as_deref()
            .and_then(|cells| letter_shadowed_by_header(spec, cells))
        {
            warn!(
                "{} column '{}' is read as column {}, but column {} has that header; use name: to match the header",
                field,
                spec,
                index_to_letter(*slot),
                index_to_letter(named)
            );
        }
    }

    let positions = ColumnPositions {
        date: resolved[0],
        narration: resolved[1],
        withdrawal: resolved[2],
        deposit: resolved[3],
    };

    let fields = positions.fields();
    for (i, &(first, position)) in fields.iter().enumerate() {
        if let Some(&(second, _)) = fields[i + 1..].iter().find(|(_, p)| *p == position) {
            return Err(ImportError::FormatResolution {
                field: second,
                source: ColumnError::DuplicateColumn {
                    first,
                    second,
                    position,
                },
            });
        }
    }

    debug!("Resolved columns: {:?}", positions);
    Ok(positions)
}
