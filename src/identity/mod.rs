//! Firebase user administration over the Identity Toolkit REST API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::IdentityConfig;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/firebase";

/// Users returned per page by `list_users`.
pub const USER_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider is not configured")]
    NotConfigured,

    #[error("invalid service account: {0}")]
    Credentials(String),

    #[error("Email {0} already exists")]
    EmailExists(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatedUser {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserMetadata {
    pub creation_timestamp_ms: Option<i64>,
    pub last_sign_in_timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub metadata: UserMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<CreatedUser, IdentityError>;

    async fn list_users(&self, page_token: Option<&str>) -> Result<UserPage, IdentityError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccount {
    project_id: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Service-account backed Firebase admin client.
pub struct FirebaseAdmin {
    http: reqwest::Client,
    base_url: String,
    account: ServiceAccount,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl FirebaseAdmin {
    pub fn from_config(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let raw = config.service_account_json.as_deref().ok_or(IdentityError::NotConfigured)?;
        Self::from_service_account_json(raw)
    }

    pub fn from_service_account_json(raw: &str) -> Result<Self, IdentityError> {
        let account: ServiceAccount =
            serde_json::from_str(raw).map_err(|e| IdentityError::Credentials(e.to_string()))?;
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| IdentityError::Credentials(e.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: IDENTITY_TOOLKIT_BASE.to_string(),
            account,
            signing_key,
            token: Mutex::new(None),
        })
    }

    /// Override the Identity Toolkit base URL.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn accounts_url(&self) -> String {
        format!("{}/projects/{}/accounts", self.base_url, self.account.project_id)
    }

    async fn access_token(&self) -> Result<String, IdentityError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
        }

        let token_uri = self.account.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: SCOPES,
            aud: token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| IdentityError::Credentials(e.to_string()))?;

        let resp = self
            .http
            .post(token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| IdentityError::Request(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Credentials(format!("token exchange failed ({status}): {body}")));
        }

        let token = resp
            .json::<TokenResponse>()
            .await
            .map_err(|e| IdentityError::Decode(format!("token response: {e}")))?;

        // Refresh a minute before expiry.
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn provider_error(resp: reqwest::Response) -> IdentityError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        IdentityError::Provider {
            status,
            message: provider_message(&body),
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAdmin {
    async fn create_user(&self, user: &NewUser) -> Result<CreatedUser, IdentityError> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .post(self.accounts_url())
            .bearer_auth(token)
            .json(&json!({ "email": user.email, "password": user.password }))
            .send()
            .await
            .map_err(|e| IdentityError::Request(format!("create user request failed: {e}")))?;

        if !resp.status().is_success() {
            return match Self::provider_error(resp).await {
                IdentityError::Provider { message, .. } if message.starts_with("EMAIL_EXISTS") => {
                    Err(IdentityError::EmailExists(user.email.clone()))
                }
                other => Err(other),
            };
        }

        let body = resp
            .json::<Value>()
            .await
            .map_err(|e| IdentityError::Decode(format!("create user: {e}")))?;
        created_user_from_response(&body, &user.email)
    }

    async fn list_users(&self, page_token: Option<&str>) -> Result<UserPage, IdentityError> {
        let token = self.access_token().await?;
        let mut req = self
            .http
            .get(format!("{}:batchGet", self.accounts_url()))
            .bearer_auth(token)
            .query(&[("maxResults", USER_PAGE_SIZE.to_string())]);

        if let Some(page_token) = page_token.filter(|t| !t.is_empty()) {
            req = req.query(&[("nextPageToken", page_token)]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| IdentityError::Request(format!("list users request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Self::provider_error(resp).await);
        }

        let body = resp
            .json::<Value>()
            .await
            .map_err(|e| IdentityError::Decode(format!("list users: {e}")))?;
        Ok(user_page_from_response(&body))
    }
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn created_user_from_response(body: &Value, requested_email: &str) -> Result<CreatedUser, IdentityError> {
    let uid = body
        .get("localId")
        .and_then(Value::as_str)
        .ok_or_else(|| IdentityError::Decode("create user response has no localId".to_string()))?;
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or(requested_email);

    Ok(CreatedUser {
        uid: uid.to_string(),
        email: Some(email.to_string()),
    })
}

fn user_page_from_response(body: &Value) -> UserPage {
    let users = body
        .get("users")
        .and_then(Value::as_array)
        .map(|users| users.iter().filter_map(user_record).collect())
        .unwrap_or_default();

    let next_page_token = body
        .get("nextPageToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    UserPage { users, next_page_token }
}

fn user_record(value: &Value) -> Option<UserRecord> {
    let uid = value.get("localId")?.as_str()?.to_string();
    Some(UserRecord {
        uid,
        email: value.get("email").and_then(Value::as_str).map(str::to_string),
        email_verified: value.get("emailVerified").and_then(Value::as_bool).unwrap_or(false),
        disabled: value.get("disabled").and_then(Value::as_bool).unwrap_or(false),
        metadata: UserMetadata {
            creation_timestamp_ms: millis(value.get("createdAt")),
            last_sign_in_timestamp_ms: millis(value.get("lastLoginAt")),
        },
    })
}

// Timestamps arrive as decimal strings of epoch milliseconds.
fn millis(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_service_account_is_not_configured() {
        let config = IdentityConfig { service_account_json: None };
        assert!(matches!(FirebaseAdmin::from_config(&config), Err(IdentityError::NotConfigured)));
    }

    #[test]
    fn invalid_service_account_is_a_credentials_error() {
        assert!(matches!(
            FirebaseAdmin::from_service_account_json("{not json"),
            Err(IdentityError::Credentials(_))
        ));

        let raw = r#"{"project_id":"p","client_email":"a@p.iam","private_key":"nope"}"#;
        assert!(matches!(
            FirebaseAdmin::from_service_account_json(raw),
            Err(IdentityError::Credentials(_))
        ));
    }

    #[test]
    fn parses_user_page() {
        let body = json!({
            "users": [
                {
                    "localId": "u1",
                    "email": "a@shop.de",
                    "emailVerified": true,
                    "createdAt": "1700000000000",
                    "lastLoginAt": "1700000500000"
                },
                { "localId": "u2", "disabled": true },
                { "email": "no-uid@shop.de" }
            ],
            "nextPageToken": "next"
        });

        let page = user_page_from_response(&body);
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.users[0].metadata.creation_timestamp_ms, Some(1_700_000_000_000));
        assert!(page.users[0].email_verified);
        assert!(page.users[1].disabled);
        assert_eq!(page.users[1].metadata.last_sign_in_timestamp_ms, None);
        assert_eq!(page.next_page_token.as_deref(), Some("next"));

        let empty = user_page_from_response(&json!({}));
        assert!(empty.users.is_empty());
        assert!(empty.next_page_token.is_none());
    }

    #[test]
    fn reads_provider_error_message() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS"}}"#;
        assert_eq!(provider_message(body), "EMAIL_EXISTS");
        assert_eq!(provider_message("plain"), "plain");
    }

    #[test]
    fn created_user_falls_back_to_requested_email() {
        let user = created_user_from_response(&json!({"localId": "u9"}), "new@shop.de").unwrap();
        assert_eq!(user.uid, "u9");
        assert_eq!(user.email.as_deref(), Some("new@shop.de"));
        assert!(created_user_from_response(&json!({}), "x").is_err());
    }
}
