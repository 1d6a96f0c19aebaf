use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::database::models::repair_case::{CASE_CSV_COLUMNS, OLD_CASE_EXPORT_COLUMNS, REPAIR_CASE_COLUMNS};
use crate::database::models::{CaseCsvRow, RepairCase};
use crate::database::query_builder::{bind_params, bind_params_as};
use crate::filter::CaseFilter;

pub const REPAIR_CASES_TABLE: &str = "repair_cases";

/// Read side of the `repair_cases` table.
#[derive(Clone)]
pub struct CaseRepository {
    pool: PgPool,
}

impl CaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self, filter: &CaseFilter) -> Result<i64, DatabaseError> {
        let sql = filter.to_count_sql(REPAIR_CASES_TABLE);
        let row = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    pub async fn select_page(&self, filter: &CaseFilter) -> Result<Vec<RepairCase>, DatabaseError> {
        let sql = filter.to_page_sql(REPAIR_CASES_TABLE, REPAIR_CASE_COLUMNS);
        let rows = bind_params_as(sqlx::query_as::<_, RepairCase>(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn select_404(&self, case_id: i64) -> Result<RepairCase, DatabaseError> {
        let query = format!(
            "SELECT {} FROM \"{}\" WHERE \"case_id\" = $1",
            REPAIR_CASE_COLUMNS, REPAIR_CASES_TABLE
        );
        sqlx::query_as::<_, RepairCase>(&query)
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Repair case not found".to_string()))
    }

    pub async fn select_csv_rows(&self, filter: &CaseFilter) -> Result<Vec<CaseCsvRow>, DatabaseError> {
        let sql = filter.to_select_sql(REPAIR_CASES_TABLE, CASE_CSV_COLUMNS);
        let rows = bind_params_as(sqlx::query_as::<_, CaseCsvRow>(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Cases that were missing from the most recent partner listing, as JSON objects.
    pub async fn select_absent_cases(&self) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let columns: Vec<String> = OLD_CASE_EXPORT_COLUMNS
            .iter()
            .map(|(column, _)| format!("\"{}\"", column))
            .collect();
        let query = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT {} FROM \"{}\" WHERE \"is_present_in_last_api_sync\" = FALSE ORDER BY \"case_id\") t",
            columns.join(", "),
            REPAIR_CASES_TABLE
        );

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match row.try_get::<Value, _>("row")? {
                Value::Object(map) => out.push(map),
                other => {
                    return Err(DatabaseError::QueryError(format!("unexpected row format: {}", other)));
                }
            }
        }
        Ok(out)
    }
}
