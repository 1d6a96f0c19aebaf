use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Postgres, Row};

use crate::database::manager::DatabaseError;
use crate::database::models::{CaseRow, CaseValue};
use crate::database::repository::REPAIR_CASES_TABLE;

/// What the store remembers about the last payload written for a case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredFingerprint {
    pub hash: Option<String>,
    pub payload: Option<Value>,
}

/// Write side used by the sync worker.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Column names of the case table.
    async fn columns(&self) -> Result<HashSet<String>, DatabaseError>;

    async fn stored_fingerprint(&self, case_id: i64) -> Result<Option<StoredFingerprint>, DatabaseError>;

    /// Insert or update keyed on `case_id`, writing every column in `row`.
    async fn upsert(&self, row: &CaseRow) -> Result<(), DatabaseError>;

    /// Mark exactly `present` as seen in the latest listing. Returns rows changed.
    async fn reconcile_presence(&self, present: &[i64]) -> Result<u64, DatabaseError>;
}

#[derive(Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn columns(&self) -> Result<HashSet<String>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT column_name::TEXT AS column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(REPAIR_CASES_TABLE)
        .fetch_all(&self.pool)
        .await?;

        let mut columns = HashSet::with_capacity(rows.len());
        for row in rows {
            columns.insert(row.try_get::<String, _>("column_name")?);
        }
        Ok(columns)
    }

    async fn stored_fingerprint(&self, case_id: i64) -> Result<Option<StoredFingerprint>, DatabaseError> {
        let query = format!(
            "SELECT \"raw_api_hash\", \"raw_api_detail\" FROM \"{}\" WHERE \"case_id\" = $1",
            REPAIR_CASES_TABLE
        );
        let row = sqlx::query(&query).bind(case_id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(StoredFingerprint {
                hash: row.try_get("raw_api_hash")?,
                payload: row.try_get("raw_api_detail")?,
            })),
            None => Ok(None),
        }
    }

    async fn upsert(&self, row: &CaseRow) -> Result<(), DatabaseError> {
        let query = upsert_sql(row)?;
        let mut q = sqlx::query(&query);
        for (_, value) in row.columns() {
            q = bind_case_value(q, value);
        }
        q.execute(&self.pool).await?;
        Ok(())
    }

    async fn reconcile_presence(&self, present: &[i64]) -> Result<u64, DatabaseError> {
        let query = format!(
            "UPDATE \"{table}\" SET \"is_present_in_last_api_sync\" = (\"case_id\" = ANY($1)) \
             WHERE \"is_present_in_last_api_sync\" IS DISTINCT FROM (\"case_id\" = ANY($1))",
            table = REPAIR_CASES_TABLE
        );
        let result = sqlx::query(&query).bind(present).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn upsert_sql(row: &CaseRow) -> Result<String, DatabaseError> {
    if row.get("case_id").is_none() {
        return Err(DatabaseError::QueryError("upsert without case_id column".to_string()));
    }

    let names: Vec<String> = row.columns().iter().map(|(name, _)| format!("\"{}\"", name)).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("${}", i)).collect();
    let updates: Vec<String> = row
        .columns()
        .iter()
        .filter(|(name, _)| *name != "case_id")
        .map(|(name, _)| format!("\"{0}\" = EXCLUDED.\"{0}\"", name))
        .collect();

    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    Ok(format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) ON CONFLICT (\"case_id\") {}",
        REPAIR_CASES_TABLE,
        names.join(", "),
        placeholders.join(", "),
        conflict
    ))
}

fn bind_case_value<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &CaseValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        CaseValue::Text(s) => q.bind(s.clone()),
        CaseValue::Float(f) => q.bind(*f),
        CaseValue::Bool(b) => q.bind(*b),
        CaseValue::BigInt(i) => q.bind(*i),
        CaseValue::Timestamp(t) => q.bind(*t),
        CaseValue::Json(v) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_updates_everything_but_the_key() {
        let mut row = CaseRow::new(42);
        row.set("status", CaseValue::Text(None));
        row.set("total_repair_cost", CaseValue::Float(Some(12.5)));

        let sql = upsert_sql(&row).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"repair_cases\" (\"case_id\", \"status\", \"total_repair_cost\") VALUES ($1, $2, $3) \
             ON CONFLICT (\"case_id\") DO UPDATE SET \"status\" = EXCLUDED.\"status\", \
             \"total_repair_cost\" = EXCLUDED.\"total_repair_cost\""
        );
    }

    #[test]
    fn key_only_row_does_nothing_on_conflict() {
        let sql = upsert_sql(&CaseRow::new(1)).unwrap();
        assert!(sql.ends_with("ON CONFLICT (\"case_id\") DO NOTHING"));
    }

    #[test]
    fn row_without_key_is_rejected() {
        let mut row = CaseRow::new(1);
        row.retain_known(&HashSet::new());
        assert!(upsert_sql(&row).is_err());
    }
}
