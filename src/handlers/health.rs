use axum::{extract::State, http::StatusCode};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::DatabaseManager;
use crate::middleware::ApiResponse;

/// GET /_healthz - liveness plus a database ping
pub async fn healthz(State(state): State<AppState>) -> ApiResponse<Value> {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok"
        })),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            ApiResponse::with_status(
                json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
