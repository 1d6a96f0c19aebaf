use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::database::{CaseRow, CaseValue};

/// Trimmed string, or `None` when missing or blank. Numbers are rendered as text.
pub fn clean_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// An insurance case has an `Insurance` object whose `InsuranceIsActivated` is truthy.
pub fn is_insurance_case(payload: &Value) -> bool {
    match payload.get("Insurance") {
        Some(insurance @ Value::Object(_)) => is_truthy(insurance.get("InsuranceIsActivated")),
        _ => false,
    }
}

pub fn customer_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    match (first, last) {
        (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

/// `Status` of the last booking if non-empty, otherwise the top-level `Status`.
pub fn latest_status(payload: &Value) -> Option<String> {
    payload
        .get("Bookings")
        .and_then(Value::as_array)
        .and_then(|bookings| bookings.last())
        .and_then(|booking| clean_text(booking.get("Status")))
        .or_else(|| clean_text(payload.get("Status")))
}

/// Sum of `Positions[].PriceGross`; `None` when there are no positions, a price
/// cannot be read as a number, or the sum is zero.
pub fn total_repair_cost(payload: &Value) -> Option<f64> {
    let positions = payload.get("Positions").and_then(Value::as_array)?;
    if positions.is_empty() {
        return None;
    }

    let mut total = 0.0;
    for position in positions {
        let price = match position.get("PriceGross") {
            None | Some(Value::Null) => 0.0,
            Some(Value::Number(n)) => n.as_f64()?,
            Some(Value::String(s)) if s.trim().is_empty() => 0.0,
            Some(Value::String(s)) => s.trim().parse::<f64>().ok()?,
            Some(Value::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Some(_) => return None,
        };
        total += price;
    }

    if total == 0.0 {
        None
    } else {
        Some(total)
    }
}

/// SHA-256 over the payload serialized with sorted keys.
pub fn fingerprint(payload: &Value) -> String {
    let canonical = canonical_json(payload);
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn canonical_json(payload: &Value) -> String {
    serde_json::to_string(&sorted(payload)).unwrap_or_default()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<&String, Value> = map.iter().map(|(k, v)| (k, sorted(v))).collect();
            Value::Object(ordered.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map a partner payload to the full set of stored columns, NULLs included.
pub fn map_case(case_id: i64, payload: &Value, hash: &str, run_started: DateTime<Utc>) -> CaseRow {
    // Missing or null sections read as empty.
    let empty = Value::Null;
    let customer = payload.get("Customer").unwrap_or(&empty);
    let product = payload.get("Product").unwrap_or(&empty);
    let insurance = payload.get("Insurance").unwrap_or(&empty);
    let symptoms = payload.get("Symptoms").unwrap_or(&empty);
    let store = payload.get("Store").unwrap_or(&empty);
    let service = payload.get("Service").unwrap_or(&empty);

    let first_name = clean_text(customer.get("FirstName"));
    let last_name = clean_text(customer.get("LastName"));

    let mut row = CaseRow::new(case_id);
    let mut text = |column: &'static str, value: Option<String>| row.set(column, CaseValue::Text(value));

    text("case_number", clean_text(payload.get("CaseNumber")));
    text("customer_name", customer_name(first_name.as_deref(), last_name.as_deref()));
    text("customer_email", clean_text(customer.get("Email")));
    text("customer_city", clean_text(customer.get("City")));
    text("product_name", clean_text(product.get("ProductName")));
    text("manufacturer", clean_text(product.get("Manufacturer")));
    text("symptoms", clean_text(symptoms.get("Comment")));
    text("store_name", clean_text(store.get("Current")));
    text("status", latest_status(payload));
    text("warranty", clean_text(payload.get("Warranty")));
    text("service_type", clean_text(service.get("Servicetype")));
    text("currency", clean_text(payload.get("Currency")));
    text("insurance_contract_number", clean_text(insurance.get("ContractNumber")));
    text("insurance_name", clean_text(insurance.get("Name")));
    text("customer_company_name", clean_text(customer.get("CompanyName")));
    text("customer_number", clean_text(customer.get("CustomerNumber")));
    text("customer_first_name", first_name);
    text("customer_last_name", last_name);
    text("customer_phone_main", clean_text(customer.get("PhoneMain")));
    text("customer_zip_code", clean_text(customer.get("ZipCode")));
    text("product_serial_number", clean_text(product.get("SerialNumber")));
    text("raw_api_hash", Some(hash.to_string()));

    row.set("insurance_is_active", CaseValue::Bool(true));
    row.set("insurance_deductible", CaseValue::Float(number(insurance.get("Retention"))));
    row.set("insurance_settlement_amount", CaseValue::Float(number(insurance.get("SettlementAmount"))));
    row.set("total_repair_cost", CaseValue::Float(total_repair_cost(payload)));
    row.set("raw_api_detail", CaseValue::Json(payload.clone()));
    row.set("last_api_update", CaseValue::Timestamp(run_started));
    row.set("is_present_in_last_api_sync", CaseValue::Bool(true));
    row
}
