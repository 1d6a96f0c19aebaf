use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A typed column value for the upsert. NULLs keep their column type so Postgres
/// accepts them for numeric and timestamp columns alike.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseValue {
    Text(Option<String>),
    Float(Option<f64>),
    Bool(bool),
    BigInt(i64),
    Timestamp(DateTime<Utc>),
    Json(Value),
}

impl CaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CaseValue::Text(None) | CaseValue::Float(None) | CaseValue::Json(Value::Null))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CaseValue::Text(Some(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            CaseValue::Float(f) => *f,
            _ => None,
        }
    }
}

/// One repair case ready to be written, keyed on `case_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRow {
    case_id: i64,
    columns: Vec<(&'static str, CaseValue)>,
}

impl CaseRow {
    pub fn new(case_id: i64) -> Self {
        Self {
            case_id,
            columns: vec![("case_id", CaseValue::BigInt(case_id))],
        }
    }

    pub fn case_id(&self) -> i64 {
        self.case_id
    }

    pub fn set(&mut self, column: &'static str, value: CaseValue) {
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CaseValue> {
        self.columns.iter().find(|(name, _)| *name == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> &[(&'static str, CaseValue)] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Drop every column the table does not have; returns the dropped names.
    pub fn retain_known(&mut self, known: &HashSet<String>) -> Vec<&'static str> {
        let mut dropped = Vec::new();
        self.columns.retain(|(name, _)| {
            let keep = known.contains(*name);
            if !keep {
                dropped.push(*name);
            }
            keep
        });
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_column() {
        let mut row = CaseRow::new(7);
        row.set("status", CaseValue::Text(Some("offen".into())));
        row.set("status", CaseValue::Text(None));
        assert_eq!(row.columns().len(), 2);
        assert!(row.get("status").map(CaseValue::is_null).unwrap_or(false));
    }

    #[test]
    fn retain_known_reports_dropped_columns() {
        let mut row = CaseRow::new(7);
        row.set("status", CaseValue::Text(Some("offen".into())));
        row.set("raw_api_hash", CaseValue::Text(Some("abc".into())));

        let known: HashSet<String> = ["case_id", "status"].iter().map(|s| s.to_string()).collect();
        let dropped = row.retain_known(&known);
        assert_eq!(dropped, vec!["raw_api_hash"]);
        assert!(row.get("raw_api_hash").is_none());

        let dropped = row.retain_known(&HashSet::new());
        assert_eq!(dropped.len(), 2);
        assert!(row.is_empty());
    }
}
