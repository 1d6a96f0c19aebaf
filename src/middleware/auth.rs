use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::auth::AuthError;
use crate::error::ApiError;

pub use crate::auth::AuthUser;

/// Bearer token middleware for every `/routes/*` endpoint.
///
/// Rejects with 401 when the header is missing or the token fails verification,
/// and with 503 when no verifier is configured. On success the `AuthUser` is
/// available to handlers through `Extension<AuthUser>`.
pub async fn firebase_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let verifier = match state.verifier.as_ref() {
        Some(verifier) => verifier,
        None => return ApiError::from(AuthError::NotConfigured).into_response(),
    };

    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    match verifier.verify(&token).await {
        Ok(user) => {
            tracing::debug!(uid = %user.uid, "Authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!("Token rejected: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    let (scheme, token) = auth_str
        .split_once(' ')
        .ok_or_else(|| "Authorization header must use Bearer token format".to_string())?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authorization header must use Bearer token format".to_string());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err("Empty bearer token".to_string());
    }
    Ok(token.to_string())
}
