use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Columns returned by the case list and detail endpoints, in select order.
pub const REPAIR_CASE_COLUMNS: &str = "\"case_id\", \"case_number\", \"customer_name\", \"customer_email\", \
\"customer_city\", \"product_name\", \"manufacturer\", \"symptoms\", \"store_name\", \"status\", \"warranty\", \
\"service_type\", \"currency\", \"fetched_at\", \"last_api_update\", \"raw_api_detail\", \
\"insurance_contract_number\", \"insurance_is_active\", \"insurance_name\", \"insurance_deductible\", \
\"insurance_settlement_amount\", \"customer_company_name\", \"customer_number\", \"customer_first_name\", \
\"customer_last_name\", \"customer_phone_main\", \"customer_zip_code\", \"product_serial_number\", \
\"total_repair_cost\"";

/// A mirrored repair case as served to the front end.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RepairCase {
    #[serde(with = "case_id_text")]
    pub case_id: i64,
    pub case_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_city: Option<String>,
    pub product_name: Option<String>,
    pub manufacturer: Option<String>,
    pub symptoms: Option<String>,
    pub store_name: Option<String>,
    pub status: Option<String>,
    pub warranty: Option<String>,
    pub service_type: Option<String>,
    pub currency: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_api_update: Option<DateTime<Utc>>,
    pub raw_api_detail: Option<Value>,
    pub insurance_contract_number: Option<String>,
    pub insurance_is_active: Option<bool>,
    pub insurance_name: Option<String>,
    pub insurance_deductible: Option<f64>,
    pub insurance_settlement_amount: Option<f64>,
    pub customer_company_name: Option<String>,
    pub customer_number: Option<String>,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub customer_phone_main: Option<String>,
    pub customer_zip_code: Option<String>,
    pub product_serial_number: Option<String>,
    pub total_repair_cost: Option<f64>,
}

// Clients treat the case id as an opaque string.
mod case_id_text {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(case_id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(case_id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
        }
    }
}

/// Row shape of the CSV export.
#[derive(Debug, Clone, FromRow)]
pub struct CaseCsvRow {
    pub case_number: Option<String>,
    pub customer_name: Option<String>,
    pub product_name: Option<String>,
    pub insurance_name: Option<String>,
    pub insurance_contract_number: Option<String>,
    pub status: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

pub const CASE_CSV_COLUMNS: &str = "\"case_number\", \"customer_name\", \"product_name\", \"insurance_name\", \
\"insurance_contract_number\", \"status\", \"fetched_at\"";

/// Every stored column with the header used in the old-cases workbook.
pub const OLD_CASE_EXPORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("case_id", "caseId"),
    ("case_number", "caseNumber"),
    ("customer_name", "customerName"),
    ("customer_email", "customerEmail"),
    ("customer_city", "customerCity"),
    ("product_name", "productName"),
    ("manufacturer", "manufacturer"),
    ("symptoms", "symptoms"),
    ("insurance_status_old", "insuranceStatus_old"),
    ("store_name", "storeName"),
    ("status", "status"),
    ("warranty", "warranty"),
    ("service_type", "serviceType"),
    ("currency", "currency"),
    ("raw_api_detail", "rawApiDetail"),
    ("fetched_at", "fetchedAt"),
    ("last_api_update", "lastApiUpdate"),
    ("insurance_contract_number", "insuranceContractNumber"),
    ("insurance_is_active", "insuranceIsActive"),
    ("insurance_name", "insuranceName"),
    ("insurance_deductible", "insuranceDeductible"),
    ("insurance_settlement_amount", "insuranceSettlementAmount"),
    ("customer_company_name", "customerCompanyName"),
    ("customer_number", "customerNumber"),
    ("customer_first_name", "customerFirstName"),
    ("customer_last_name", "customerLastName"),
    ("customer_phone_main", "customerPhoneMain"),
    ("customer_zip_code", "customerZipCode"),
    ("product_serial_number", "productSerialNumber"),
    ("total_repair_cost", "totalRepairCost"),
    ("is_present_in_last_api_sync", "isPresentInLastApiSync"),
    ("source_type", "sourceType"),
];
