use ::csv::{QuoteStyle, WriterBuilder};

use crate::database::CaseCsvRow;

use super::{ExportError, FileDownload};

pub const CASE_CSV_HEADERS: [&str; 7] = [
    "Fallnummer",
    "Kunde",
    "Produkt",
    "Versicherung",
    "Versicherungsnr.",
    "Status",
    "Erstelldatum",
];

pub const CASE_CSV_FILENAME: &str = "reparaturfaelle_export.csv";
pub const CASE_CSV_EMPTY_FILENAME: &str = "reparaturfaelle_export_empty.csv";

/// Render the case export; every field quoted, dates as `YYYY-MM-DD`.
pub fn render_cases(rows: &[CaseCsvRow]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    wtr.write_record(CASE_CSV_HEADERS)?;
    for row in rows {
        let created = row
            .fetched_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        wtr.write_record([
            row.case_number.as_deref().unwrap_or_default(),
            row.customer_name.as_deref().unwrap_or_default(),
            row.product_name.as_deref().unwrap_or_default(),
            row.insurance_name.as_deref().unwrap_or_default(),
            row.insurance_contract_number.as_deref().unwrap_or_default(),
            row.status.as_deref().unwrap_or_default(),
            created.as_str(),
        ])?;
    }

    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

pub fn cases_download(rows: &[CaseCsvRow]) -> Result<FileDownload, ExportError> {
    let filename = if rows.is_empty() {
        CASE_CSV_EMPTY_FILENAME
    } else {
        CASE_CSV_FILENAME
    };
    Ok(FileDownload::csv(filename, render_cases(rows)?))
}
