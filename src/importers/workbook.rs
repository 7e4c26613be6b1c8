//! Spreadsheet access for statement uploads
//!
//! Opens an uploaded workbook from memory (xlsx, xlsm, xlsb, xls, ods are
//! auto-detected by calamine) and exposes the first worksheet through
//! [`Sheet`], addressed with 0-based absolute coordinates.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::io::Cursor;
use tracing::{debug, info};

use crate::error::ImportError;

/// Largest serial Excel accepts as a date (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// One worksheet of an uploaded statement
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    range: Range<Data>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, range: Range<Data>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of physical rows, counted from the top of the sheet
    pub fn height(&self) -> usize {
        if self.range.is_empty() {
            return 0;
        }
        self.range.end().map(|(row, _)| row as usize + 1).unwrap_or(0)
    }

    /// Number of physical columns, counted from column A
    pub fn width(&self) -> usize {
        if self.range.is_empty() {
            return 0;
        }
        self.range.end().map(|(_, col)| col as usize + 1).unwrap_or(0)
    }

    /// Cell at a 0-based absolute position; `None` outside the used range
    pub fn cell(&self, row: usize, col: usize) -> Option<&Data> {
        let row = u32::try_from(row).ok()?;
        let col = u32::try_from(col).ok()?;
        self.range.get_value((row, col))
    }

    /// Text of a cell, empty when the cell is missing
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).map(cell_text).unwrap_or_default()
    }

    /// Text of every cell in a row, across the full sheet width
    pub fn row_texts(&self, row: usize) -> Vec<String> {
        (0..self.width()).map(|col| self.text(row, col)).collect()
    }

    /// Build a sheet from literal rows, starting at A1
    #[cfg(test)]
    pub(crate) fn from_rows(rows: Vec<Vec<Data>>) -> Self {
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if height == 0 || width == 0 {
            return Self::new("Sheet1", Range::empty());
        }
        let mut range = Range::new((0, 0), (height as u32 - 1, width as u32 - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        Self::new("Sheet1", range)
    }
}

/// Open an uploaded workbook and load its first worksheet
///
/// The workbook reader lives only for the duration of this call, so the
/// underlying handle is released before any row is processed.
pub fn open_first_sheet(bytes: &[u8]) -> Result<Sheet, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ImportError::UnreadableFile(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::UnreadableFile("workbook contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::UnreadableFile(format!("sheet '{}': {}", sheet_name, e)))?;

    let sheet = Sheet::new(sheet_name, range);
    info!(
        "Loaded sheet '{}' ({} rows x {} columns)",
        sheet.name(),
        sheet.height(),
        sheet.width()
    );
    Ok(sheet)
}

/// List every sheet name together with its loaded range
pub fn open_all_sheets(bytes: &[u8]) -> Result<Vec<Sheet>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ImportError::UnreadableFile(e.to_string()))?;

    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        match workbook.worksheet_range(&name) {
            Ok(range) => sheets.push(Sheet::new(name, range)),
            Err(e) => debug!("Skipping unreadable sheet '{}': {}", name, e),
        }
    }
    Ok(sheets)
}

/// Render a cell as statement text
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a cell that holds a date
///
/// Bare numbers in a date column are Excel serials (legacy .xls files often
/// lose the date number format).
pub fn date_cell_text(cell: &Data) -> String {
    let serial = match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        _ => None,
    };
    match serial.and_then(excel_serial_to_datetime) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => cell_text(cell),
    }
}

/// Convert an Excel serial (1900 date system) to a date-time
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.floor() as i64;
    let seconds = ((serial - serial.floor()) * 86_400.0).round() as i64;
    let excel_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    excel_epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// True for decoration text made only of `*`, `-` and `=`
pub fn is_separator_text(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| matches!(c, '*' | '-' | '='))
}
