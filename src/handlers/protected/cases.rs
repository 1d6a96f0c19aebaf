use axum::extract::{Path, Query, State};
use serde::Serialize;

use crate::app::AppState;
use crate::database::RepairCase;
use crate::error::ApiError;
use crate::filter::{CaseFilter, CaseListParams};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct CasePage {
    pub cases: Vec<RepairCase>,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// GET /routes/cases - filtered, sorted, paginated case list
pub async fn list_cases(State(state): State<AppState>, Query(params): Query<CaseListParams>) -> ApiResult<CasePage> {
    let filter = CaseFilter::from_params(
        params,
        state.config.api.cases_max_limit,
        state.config.api.cases_default_limit,
    )?;

    let total_count = state.cases.count(&filter).await?;
    let cases = if total_count > filter.offset() {
        state.cases.select_page(&filter).await?
    } else {
        Vec::new()
    };

    Ok(ApiResponse::success(CasePage {
        cases,
        total_count,
        page: filter.page(),
        limit: filter.limit(),
        total_pages: filter.total_pages(total_count),
    }))
}

/// GET /routes/repair-case/:case_id - one case with its raw partner payload
pub async fn get_repair_case(State(state): State<AppState>, Path(case_id): Path<String>) -> ApiResult<RepairCase> {
    let case_id: i64 = case_id
        .trim()
        .parse()
        .map_err(|_| ApiError::not_found("Repair case not found"))?;

    let case = state.cases.select_404(case_id).await?;
    Ok(ApiResponse::success(case))
}
