use axum::{extract::State, Extension};
use serde::Serialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, AuthUser};

#[derive(Debug, Serialize)]
pub struct AuthCheck {
    pub uid: String,
    pub email: String,
    pub message: &'static str,
}

/// GET /routes/minimal-auth-works - confirm the bearer token is accepted
pub async fn minimal_auth_works(Extension(user): Extension<AuthUser>) -> ApiResponse<AuthCheck> {
    tracing::info!(uid = %user.uid, "Auth check");
    ApiResponse::success(AuthCheck {
        uid: user.uid,
        email: user.email.unwrap_or_else(|| "N/A".to_string()),
        message: "Access granted to /minimal-auth-works",
    })
}

#[derive(Debug, Serialize)]
pub struct AdminCheck {
    pub uid: String,
    pub email: Option<String>,
    pub is_admin_match: bool,
    pub configured_admin_uids: Vec<String>,
}

/// GET /routes/me-admin - report whether the caller is on the admin allow-list
pub async fn me_admin(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResponse<AdminCheck> {
    ApiResponse::success(AdminCheck {
        is_admin_match: state.config.is_admin(&user.uid),
        configured_admin_uids: state.config.auth.admin_uids.clone(),
        uid: user.uid,
        email: user.email,
    })
}
