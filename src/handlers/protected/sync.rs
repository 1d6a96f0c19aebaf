use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::sync::{SyncOutcome, SyncStatus};

#[derive(Debug, Serialize)]
pub struct SyncStarted {
    pub message: &'static str,
    pub run_id: uuid::Uuid,
}

#[derive(Debug, Serialize)]
pub struct SingleSyncResult {
    pub message: String,
    pub result: SyncOutcome,
}

/// POST /routes/sync-insurance-cases - start a full sync in the background
pub async fn trigger_sync(State(state): State<AppState>) -> ApiResult<SyncStarted> {
    let guard = state.tracker.try_begin().ok_or_else(|| {
        ApiError::conflict("A sync is already in progress. Please wait for it to complete.")
    })?;
    let run_id = guard.run_id();
    tracing::info!(%run_id, "Insurance case sync requested");

    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        if let Err(e) = engine.run_full(&guard).await {
            tracing::error!(%run_id, "Sync aborted: {}", e);
        }
        // guard drops here and releases the slot
    });

    Ok(ApiResponse::success(SyncStarted {
        message: "Simple insurance case sync process started in the background.",
        run_id,
    }))
}

/// GET /routes/sync-status
pub async fn sync_status(State(state): State<AppState>) -> ApiResponse<SyncStatus> {
    ApiResponse::success(state.tracker.status())
}

/// POST /routes/test-single-sync/:case_id - run the per-case pipeline inline
pub async fn test_single_sync(State(state): State<AppState>, Path(case_id): Path<i64>) -> ApiResult<SingleSyncResult> {
    tracing::info!(case_id, "Single case sync requested");
    let result = state.engine.sync_single(case_id).await;
    Ok(ApiResponse::success(SingleSyncResult {
        message: format!("Sync test for case {} completed.", case_id),
        result,
    }))
}
