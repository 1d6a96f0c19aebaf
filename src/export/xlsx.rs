use rust_xlsxwriter::{Format, Workbook};
use serde_json::{Map, Value};

use crate::database::models::repair_case::OLD_CASE_EXPORT_COLUMNS;

use super::{ExportError, FileDownload};

/// Longest string a spreadsheet cell can hold.
pub const MAX_CELL_CHARS: usize = 32_767;

pub const OLD_CASES_SHEET: &str = "Old Repair Cases";
pub const OLD_CASES_FILENAME: &str = "old_repair_cases.xlsx";
pub const OLD_CASES_EMPTY_FILENAME: &str = "old_repair_cases_empty.xlsx";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Nested objects and arrays are written as their JSON text.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Cell::Empty,
            Some(Value::Bool(b)) => Cell::Bool(*b),
            Some(Value::Number(n)) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Some(Value::String(s)) => Cell::Text(s.clone()),
            Some(other) => Cell::Text(other.to_string()),
        }
    }
}

/// Single-sheet workbook with a bold header row. No headers gives a blank sheet.
pub fn render_sheet(sheet_name: &str, headers: &[&str], rows: &[Vec<Cell>]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(r, c, truncate_cell(s))?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Cases absent from the latest partner listing, every stored column.
pub fn old_cases_download(rows: &[Map<String, Value>]) -> Result<FileDownload, ExportError> {
    if rows.is_empty() {
        let bytes = render_sheet(OLD_CASES_SHEET, &[], &[])?;
        return Ok(FileDownload::xlsx(OLD_CASES_EMPTY_FILENAME, bytes));
    }

    let headers: Vec<&str> = OLD_CASE_EXPORT_COLUMNS.iter().map(|(_, header)| *header).collect();
    let cells: Vec<Vec<Cell>> = rows
        .iter()
        .map(|row| {
            OLD_CASE_EXPORT_COLUMNS
                .iter()
                .map(|(column, _)| Cell::from_json(row.get(*column)))
                .collect()
        })
        .collect();

    let bytes = render_sheet(OLD_CASES_SHEET, &headers, &cells)?;
    Ok(FileDownload::xlsx(OLD_CASES_FILENAME, bytes))
}

fn truncate_cell(s: &str) -> &str {
    match s.char_indices().nth(MAX_CELL_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
