use serde::Deserialize;

use super::error::FilterError;
use super::filter_order::{FilterOrder, SortField};
use super::types::{SortDirection, SqlParam, SqlResult, ALL_INSURANCES, EXCLUDED_INSURANCE, INACTIVE_STATUSES};

/// Query string accepted by `GET /routes/cases`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseListParams {
    pub insurance_name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub show_active_only: Option<bool>,
    pub time_range_months: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

/// Validated case filter. Builds the WHERE clause with numbered placeholders;
/// column names only ever come from constants and `SortField`.
#[derive(Debug, Clone)]
pub struct CaseFilter {
    insurance_name: Option<String>,
    show_active_only: bool,
    time_range_months: Option<i32>,
    search: Option<String>,
    sort_field: SortField,
    sort_direction: SortDirection,
    page: i64,
    limit: i64,
}

impl CaseFilter {
    pub fn from_params(params: CaseListParams, max_limit: i64, default_limit: i64) -> Result<Self, FilterError> {
        let page = params.page.unwrap_or(1);
        if page < 1 {
            return Err(FilterError::InvalidPage);
        }

        let limit = params.limit.unwrap_or(default_limit);
        if limit < 1 || limit > max_limit {
            return Err(FilterError::InvalidLimit { max: max_limit });
        }

        if matches!(params.time_range_months, Some(months) if months < 0) {
            return Err(FilterError::InvalidTimeRange);
        }

        Ok(Self {
            insurance_name: params.insurance_name,
            show_active_only: params.show_active_only.unwrap_or(true),
            time_range_months: params.time_range_months,
            search: params.search,
            sort_field: SortField::from_param(params.sort_by.as_deref()),
            sort_direction: SortDirection::from_param(Some(params.sort_direction.as_deref().unwrap_or("desc"))),
            page,
            limit,
        })
    }

    /// Core filter plus the optional insurance restriction; used by the CSV export.
    pub fn for_export(insurance_name: Option<String>) -> Self {
        Self {
            insurance_name,
            show_active_only: false,
            time_range_months: None,
            search: None,
            sort_field: SortField::LastApiUpdate,
            sort_direction: SortDirection::Desc,
            page: 1,
            limit: 0,
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows skipped before this page. Saturates so an absurd page reads past the end.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 || self.limit <= 0 {
            0
        } else {
            (total_count + self.limit - 1) / self.limit
        }
    }

    pub fn to_where_sql(&self) -> SqlResult {
        let mut filter_where = CaseWhere::new();
        filter_where.build(self);
        filter_where.finish()
    }

    pub fn to_count_sql(&self, table: &str) -> SqlResult {
        let where_result = self.to_where_sql();
        SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", table, where_result.query),
            params: where_result.params,
        }
    }

    /// Paged select of `columns` ordered by the requested sort.
    pub fn to_page_sql(&self, table: &str, columns: &str) -> SqlResult {
        let mut filter_where = CaseWhere::new();
        filter_where.build(self);
        let limit = filter_where.param(SqlParam::BigInt(self.limit));
        let offset = filter_where.param(SqlParam::BigInt(self.offset()));
        let where_result = filter_where.finish();

        let query = [
            format!("SELECT {}", columns),
            format!("FROM \"{}\"", table),
            format!("WHERE {}", where_result.query),
            FilterOrder::generate(self.sort_field, self.sort_direction),
            format!("LIMIT {} OFFSET {}", limit, offset),
        ]
        .join(" ");

        SqlResult { query, params: where_result.params }
    }

    /// Unpaged select in the requested order; used for exports.
    pub fn to_select_sql(&self, table: &str, columns: &str) -> SqlResult {
        let where_result = self.to_where_sql();
        SqlResult {
            query: format!(
                "SELECT {} FROM \"{}\" WHERE {} {}",
                columns,
                table,
                where_result.query,
                FilterOrder::generate(self.sort_field, self.sort_direction)
            ),
            params: where_result.params,
        }
    }

    fn insurance_restriction(&self) -> Option<String> {
        let name = self.insurance_name.as_deref()?.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("null") || name == ALL_INSURANCES {
            return None;
        }
        Some(name.to_lowercase())
    }

    fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        Some(format!("%{}%", escape_like(&term.to_lowercase())))
    }
}

struct CaseWhere {
    params: Vec<SqlParam>,
    conditions: Vec<String>,
}

impl CaseWhere {
    fn new() -> Self {
        Self { params: vec![], conditions: vec![] }
    }

    fn build(&mut self, filter: &CaseFilter) {
        self.conditions.push(format!(
            "\"insurance_is_active\" = TRUE AND COALESCE(LOWER(\"insurance_name\"), '') <> '{}'",
            EXCLUDED_INSURANCE
        ));

        if let Some(name) = filter.insurance_restriction() {
            let p = self.param(SqlParam::Text(name));
            self.conditions.push(format!("LOWER(\"insurance_name\") = {}", p));
        }

        if filter.show_active_only {
            let placeholders: Vec<String> = INACTIVE_STATUSES
                .iter()
                .map(|s| self.param(SqlParam::Text(s.to_string())))
                .collect();
            self.conditions.push(format!("LOWER(\"status\") NOT IN ({})", placeholders.join(", ")));
        }

        if let Some(months) = filter.time_range_months.filter(|m| *m > 0) {
            let p = self.param(SqlParam::Int(months));
            self.conditions.push(format!("\"last_api_update\" >= NOW() - make_interval(months => {})", p));
        }

        if let Some(pattern) = filter.search_pattern() {
            let p = self.param(SqlParam::Text(pattern));
            let columns = [
                "case_number",
                "customer_name",
                "product_name",
                "insurance_contract_number",
                "status",
                "insurance_name",
            ];
            let likes: Vec<String> = columns
                .iter()
                .map(|c| format!("LOWER(\"{}\") LIKE {}", c, p))
                .collect();
            self.conditions.push(format!("({})", likes.join(" OR ")));
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn finish(self) -> SqlResult {
        SqlResult {
            query: self.conditions.join(" AND "),
            params: self.params,
        }
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
