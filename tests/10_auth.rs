mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{get, post, FakeIdentity, TestApp, ADMIN_TOKEN, ADMIN_UID, USER_TOKEN};

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let app = TestApp::new().router()?;

    let res = get(&app, "/routes/minimal-auth-works", None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()?["detail"], "Missing Authorization header");

    let res = get(&app, "/routes/minimal-auth-works", Some("forged")).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unconfigured_auth_answers_service_unavailable() -> Result<()> {
    let app = TestApp::new().without_verifier().router()?;

    let res = get(&app, "/routes/minimal-auth-works", Some(ADMIN_TOKEN)).await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn minimal_auth_reports_the_caller() -> Result<()> {
    let app = TestApp::new().router()?;

    let res = get(&app, "/routes/minimal-auth-works", Some(USER_TOKEN)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json()?;
    assert_eq!(body["uid"], "user-uid");
    assert_eq!(body["email"], "N/A");
    assert_eq!(body["message"], "Access granted to /minimal-auth-works");
    Ok(())
}

#[tokio::test]
async fn me_admin_matches_the_allow_list() -> Result<()> {
    let app = TestApp::new().router()?;

    let body = get(&app, "/routes/me-admin", Some(ADMIN_TOKEN)).await?.json()?;
    assert_eq!(body["is_admin_match"], true);
    assert_eq!(body["configured_admin_uids"], json!([ADMIN_UID]));

    let body = get(&app, "/routes/me-admin", Some(USER_TOKEN)).await?.json()?;
    assert_eq!(body["is_admin_match"], false);
    Ok(())
}

#[tokio::test]
async fn user_admin_without_provider_is_a_server_error() -> Result<()> {
    let app = TestApp::new().router()?;

    let res = get(&app, "/routes/list-firebase-users", Some(ADMIN_TOKEN)).await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn non_admins_cannot_manage_users() -> Result<()> {
    let app = TestApp::new().with_identity(Arc::new(FakeIdentity::default())).router()?;

    let res = post(
        &app,
        "/routes/create-firebase-user",
        Some(USER_TOKEN),
        Some(json!({ "email": "new@repairdesk.test", "password": "secret123" })),
    )
    .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.json()?["detail"], "Forbidden: You do not have permission to create users.");

    let res = get(&app, "/routes/list-firebase-users", Some(USER_TOKEN)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.json()?["detail"], "Forbidden: You do not have permission to list users.");
    Ok(())
}

#[tokio::test]
async fn admin_creates_and_lists_users() -> Result<()> {
    let identity = Arc::new(FakeIdentity::default());
    let app = TestApp::new().with_identity(Arc::clone(&identity)).router()?;
    let new_user = json!({ "email": "new@repairdesk.test", "password": "secret123" });

    let res = post(&app, "/routes/create-firebase-user", Some(ADMIN_TOKEN), Some(new_user.clone())).await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json()?;
    assert_eq!(body["message"], "User created successfully.");
    assert_eq!(body["email"], "new@repairdesk.test");

    let res = post(&app, "/routes/create-firebase-user", Some(ADMIN_TOKEN), Some(new_user)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()?["detail"], "Email new@repairdesk.test already exists.");

    let body = get(&app, "/routes/list-firebase-users", Some(ADMIN_TOKEN)).await?.json()?;
    assert_eq!(body["users"][0]["uid"], ADMIN_UID);
    assert_eq!(body["next_page_token"], "page-2");

    let body = get(&app, "/routes/list-firebase-users?page_token=page-2", Some(ADMIN_TOKEN)).await?.json()?;
    assert!(body["next_page_token"].is_null());
    Ok(())
}

#[tokio::test]
async fn create_user_requires_email_and_password() -> Result<()> {
    let app = TestApp::new().with_identity(Arc::new(FakeIdentity::default())).router()?;

    let res = post(
        &app,
        "/routes/create-firebase-user",
        Some(ADMIN_TOKEN),
        Some(json!({ "email": "  ", "password": "secret123" })),
    )
    .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}
