use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::identity::{IdentityError, IdentityProvider, NewUser, UserPage};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub message: &'static str,
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page_token: Option<String>,
}

/// Provider first, then the allow-list: an unconfigured server answers 500 to everyone.
fn admin_provider(state: &AppState, user: &AuthUser, action: &str) -> Result<Arc<dyn IdentityProvider>, ApiError> {
    let provider = state
        .identity
        .clone()
        .ok_or_else(|| ApiError::from(IdentityError::NotConfigured))?;

    if !state.config.is_admin(&user.uid) {
        tracing::warn!(uid = %user.uid, "Non-admin attempted to {}", action);
        return Err(ApiError::forbidden(format!(
            "Forbidden: You do not have permission to {}.",
            action
        )));
    }
    Ok(provider)
}

/// POST /routes/create-firebase-user
pub async fn create_firebase_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewUser>,
) -> ApiResult<CreateUserResponse> {
    let provider = admin_provider(&state, &user, "create users")?;

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    tracing::info!(uid = %user.uid, "Admin creating user {}", body.email);
    let created = provider.create_user(&body).await?;
    tracing::info!("Created user {:?} ({})", created.email, created.uid);

    Ok(ApiResponse::success(CreateUserResponse {
        message: "User created successfully.",
        uid: created.uid,
        email: created.email,
    }))
}

/// GET /routes/list-firebase-users?page_token=
pub async fn list_firebase_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<UserPage> {
    let provider = admin_provider(&state, &user, "list users")?;
    let page = provider.list_users(query.page_token.as_deref()).await?;
    Ok(ApiResponse::success(page))
}
