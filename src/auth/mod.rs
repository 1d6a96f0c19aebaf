use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::AuthConfig;

/// Authenticated caller, attached to request extensions by the auth middleware.
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

/// Claims carried by a Firebase ID token.
#[derive(Debug, Serialize, Deserialize)]
pub struct FirebaseClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl From<FirebaseClaims> for AuthUser {
    fn from(claims: FirebaseClaims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication is not configured")]
    NotConfigured,

    #[error("Could not load signing keys: {0}")]
    KeyFetch(String),

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("Token signed with unknown key {0}")]
    UnknownKey(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has no subject")]
    MissingSubject,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Minimum gap between key refetches triggered by unknown key ids.
const UNKNOWN_KEY_REFETCH_COOLDOWN: Duration = Duration::from_secs(60);

struct KeyCache {
    keys: HashMap<String, Jwk>,
    fetched_at: Option<Instant>,
}

/// Verifies Firebase ID tokens against Google's published signing keys.
pub struct FirebaseVerifier {
    http: reqwest::Client,
    project_id: String,
    jwks_url: String,
    cache_ttl: Duration,
    cache: RwLock<KeyCache>,
}

impl FirebaseVerifier {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let project_id = config.project_id.clone().ok_or(AuthError::NotConfigured)?;
        Ok(Self {
            http: reqwest::Client::new(),
            project_id,
            jwks_url: config.jwks_url.clone(),
            cache_ttl: Duration::from_secs(config.jwks_cache_secs),
            cache: RwLock::new(KeyCache {
                keys: HashMap::new(),
                fetched_at: None,
            }),
        })
    }

    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation
    }

    async fn key_for(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(found) = self.cached_key(&cache, kid) {
                return found;
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refetched while we waited for the lock.
        if let Some(found) = self.cached_key(&cache, kid) {
            return found;
        }

        // Stale cache or a rotated key: refetch once.
        let keys = self.fetch_keys().await?;
        cache.keys = keys;
        cache.fetched_at = Some(Instant::now());
        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    /// Answer from the cache when it can; `None` means a refetch is due.
    /// Unknown key ids only trigger a refetch once the cooldown has passed.
    fn cached_key(&self, cache: &KeyCache, kid: &str) -> Option<Result<Jwk, AuthError>> {
        let age = cache.fetched_at?.elapsed();
        if age >= self.cache_ttl {
            return None;
        }
        match cache.keys.get(kid) {
            Some(jwk) => Some(Ok(jwk.clone())),
            None if age < UNKNOWN_KEY_REFETCH_COOLDOWN => Some(Err(AuthError::UnknownKey(kid.to_string()))),
            None => None,
        }
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, Jwk>, AuthError> {
        let resp = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::KeyFetch(format!("JWKS endpoint returned {}", resp.status())));
        }

        let set = resp
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        tracing::debug!("Loaded {} token signing keys", set.keys.len());
        Ok(set.keys.into_iter().map(|k| (k.kid.clone(), k)).collect())
    }
}

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let jwk = self.key_for(&kid).await?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let data = decode::<FirebaseClaims>(token, &key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }

        Ok(AuthUser::from(data.claims))
    }
}
