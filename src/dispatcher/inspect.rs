use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

use crate::importers::columns::index_to_letter;
use crate::importers::read_statement_file;
use crate::importers::workbook::{open_all_sheets, open_first_sheet, Sheet};

/// Print the top of a statement with spreadsheet coordinates, to help
/// choosing `--start-row` and the column arguments of `formats add`
pub fn dispatch_inspect(file_path: &Path, rows: usize, all_sheets: bool) -> Result<()> {
    println!(
        "{} Inspecting file: {}\n",
        "📊".cyan().bold(),
        file_path.display().to_string().green()
    );

    let bytes = read_statement_file(file_path)?;
    let sheets = if all_sheets {
        open_all_sheets(&bytes)?
    } else {
        vec![open_first_sheet(&bytes)?]
    };

    for sheet in &sheets {
        println!(
            "{} Sheet: {} ({} rows x {} columns)",
            "📌".cyan().bold(),
            sheet.name().yellow().bold(),
            sheet.height(),
            sheet.width()
        );
        if sheet.width() == 0 {
            println!("  (empty)\n");
            continue;
        }
        println!("{}\n", sheet_preview(sheet, rows));
    }

    println!(
        "{}",
        "Tip: columns can be given as a letter (C), a 0-based index (2) or a header name".blue()
    );
    Ok(())
}

fn sheet_preview(sheet: &Sheet, rows: usize) -> String {
    let mut builder = Builder::default();

    let mut header = vec![String::from("Row")];
    header.extend((0..sheet.width()).map(index_to_letter));
    builder.push_record(header);

    for row in 0..sheet.height().min(rows) {
        let mut record = vec![(row + 1).to_string()];
        record.extend(sheet.row_texts(row));
        builder.push_record(record);
    }

    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Data;

    #[test]
    fn test_preview_shows_letters_and_row_numbers() {
        let sheet = Sheet::from_rows(vec![
            vec![Data::String("Date".into()), Data::String("Narration".into())],
            vec![Data::String("2024-01-05".into()), Data::String("COFFEE".into())],
            vec![Data::String("2024-01-06".into()), Data::String("RENT".into())],
        ]);

        let text = sheet_preview(&sheet, 2);
        assert!(text.contains("Row"));
        assert!(text.contains(" A "));
        assert!(text.contains(" B "));
        assert!(text.contains("COFFEE"));
        assert!(!text.contains("RENT"));
    }
}
