pub mod csv;
pub mod partner_export;
pub mod xlsx;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::database::DatabaseError;
use crate::partner::PartnerError;

pub use partner_export::{export_partner_cases, PartnerExport};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0}")]
    NoData(String),

    #[error(transparent)]
    Partner(#[from] PartnerError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered file sent as an attachment.
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl FileDownload {
    pub fn csv(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: CSV_CONTENT_TYPE,
            bytes,
        }
    }

    pub fn xlsx(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: XLSX_CONTENT_TYPE,
            bytes,
        }
    }
}

impl IntoResponse for FileDownload {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        let disposition = HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(self.content_type)),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}
