use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::export::{self, csv, xlsx, FileDownload};
use crate::filter::CaseFilter;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvExportQuery {
    pub insurance_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartnerExportRequest {
    pub case_numbers: Vec<String>,
}

/// GET /routes/export-repair-cases-csv?insuranceName=
pub async fn export_cases_csv(
    State(state): State<AppState>,
    Query(query): Query<CsvExportQuery>,
) -> Result<FileDownload, ApiError> {
    let filter = CaseFilter::for_export(query.insurance_name);
    let rows = state.cases.select_csv_rows(&filter).await?;
    tracing::info!("Exporting {} cases as CSV", rows.len());
    Ok(csv::cases_download(&rows)?)
}

/// GET /routes/export-old-repair-cases-excel
pub async fn export_old_cases_excel(State(state): State<AppState>) -> Result<FileDownload, ApiError> {
    let rows = state.cases.select_absent_cases().await?;
    tracing::info!("Exporting {} old cases as XLSX", rows.len());
    Ok(xlsx::old_cases_download(&rows)?)
}

/// POST /routes/export-specific-old-cases-from-reparline-excel
pub async fn export_partner_cases_excel(
    State(state): State<AppState>,
    Json(body): Json<PartnerExportRequest>,
) -> Result<FileDownload, ApiError> {
    let result = export::export_partner_cases(state.partner.as_ref(), &body.case_numbers, &state.config.export).await?;
    tracing::info!(
        "Partner export: {} found, {} not found",
        result.found.len(),
        result.not_found.len()
    );
    Ok(result.into_download()?)
}
