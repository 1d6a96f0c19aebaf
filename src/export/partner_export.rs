use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::partner::{PartnerApi, PartnerError};

use super::xlsx::{render_sheet, Cell};
use super::{ExportError, FileDownload};

pub const PARTNER_EXPORT_SHEET: &str = "Alte Servicefälle";
pub const PARTNER_EXPORT_FILENAME: &str = "alte_servicefaelle_export.xlsx";

/// Payload key and German column header, in sheet order.
pub const PARTNER_EXPORT_COLUMNS: [(&str, &str); 12] = [
    ("caseNumber", "Servicefall-Nr."),
    ("customerName", "Kundenname"),
    ("productName", "Produktbezeichnung"),
    ("manufacturer", "Hersteller"),
    ("serialNumber", "Seriennummer"),
    ("status", "Status"),
    ("storeName", "Filialname"),
    ("insuranceName", "Versicherungsname"),
    ("insuranceContractNumber", "Versicherungsscheinnummer"),
    ("totalRepairCost", "Reparaturkosten"),
    ("creationDate", "Erstellungsdatum"),
    ("lastStatusDate", "Letzte Statusänderung"),
];

/// Cases fetched by number plus the numbers that could not be fetched.
#[derive(Debug, Default)]
pub struct PartnerExport {
    pub found: Vec<Value>,
    pub not_found: Vec<String>,
}

impl PartnerExport {
    pub fn into_download(self) -> Result<FileDownload, ExportError> {
        if self.found.is_empty() {
            let mut message = "No data found for the provided case numbers.".to_string();
            if !self.not_found.is_empty() {
                message.push_str(&format!(
                    " Cases not found or error fetching: {}.",
                    self.not_found.join(", ")
                ));
            }
            return Err(ExportError::NoData(message));
        }

        let headers: Vec<&str> = PARTNER_EXPORT_COLUMNS.iter().map(|(_, header)| *header).collect();
        let rows: Vec<Vec<Cell>> = self
            .found
            .iter()
            .map(|case| {
                PARTNER_EXPORT_COLUMNS
                    .iter()
                    .map(|(key, _)| Cell::from_json(case.get(*key)))
                    .collect()
            })
            .collect();

        let bytes = render_sheet(PARTNER_EXPORT_SHEET, &headers, &rows)?;
        Ok(FileDownload::xlsx(PARTNER_EXPORT_FILENAME, bytes))
    }
}

/// Fetch each case number from the partner, `chunk_size` at a time with a pause
/// between chunks. Missing credentials abort; every other failure is recorded.
pub async fn export_partner_cases(
    partner: &dyn PartnerApi,
    case_numbers: &[String],
    config: &ExportConfig,
) -> Result<PartnerExport, ExportError> {
    let chunk_size = config.chunk_size.max(1);
    let pause = Duration::from_secs(config.chunk_pause_secs);
    let total = case_numbers.len();
    let chunk_count = total.div_ceil(chunk_size);
    info!("Exporting {} case numbers from the partner API", total);

    let mut export = PartnerExport::default();
    for (idx, chunk) in case_numbers.chunks(chunk_size).enumerate() {
        let chunk_number = idx + 1;
        info!(
            "Processing chunk {} of {}. Cases {}-{} of {}.",
            chunk_number,
            chunk_count,
            idx * chunk_size + 1,
            (idx * chunk_size + chunk.len()),
            total
        );

        for raw in chunk {
            let number = raw.trim();
            if number.is_empty() {
                debug!("Skipping empty case number");
                continue;
            }

            match partner.fetch_case_by_number(number).await {
                Ok(Some(case)) => export.found.push(case),
                Ok(None) => {
                    debug!(case_number = number, "Case not found at partner");
                    export.not_found.push(number.to_string());
                }
                Err(PartnerError::NotConfigured) => return Err(PartnerError::NotConfigured.into()),
                Err(e) => {
                    warn!(case_number = number, "Failed to fetch case: {}", e);
                    export.not_found.push(number.to_string());
                }
            }
        }

        info!(
            "Finished chunk {}. {} cases fetched so far, {} not found.",
            chunk_number,
            export.found.len(),
            export.not_found.len()
        );

        if chunk_number < chunk_count && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    Ok(export)
}
