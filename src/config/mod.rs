use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Admin UIDs allowed to manage identity-provider users when `ADMIN_UIDS` is unset.
pub const DEFAULT_ADMIN_UIDS: &[&str] = &["Nw88uBB9v0XgJO6JPQjOVMtByPD3", "k9hkGKW4R4Mqh85tuYMLeAdjmNf1"];

pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub identity: IdentityConfig,
    pub partner: PartnerConfig,
    pub sync: SyncConfig,
    pub export: ExportConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Firebase project id; doubles as the expected token audience.
    pub project_id: Option<String>,
    pub jwks_url: String,
    pub jwks_cache_secs: u64,
    pub admin_uids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(skip_serializing)]
    pub service_account_json: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerConfig {
    pub base_url: String,
    pub export_base_url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub request_timeout_secs: u64,
    pub list_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub progress_every: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub chunk_size: usize,
    pub chunk_pause_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub cases_max_limit: i64,
    pub cases_default_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub permissive_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        Self::for_environment(environment).with_env_overrides()
    }

    /// Profile defaults without any environment overrides applied.
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Auth overrides
        if let Ok(v) = env::var("FIREBASE_CONFIG") {
            match project_id_from_firebase_config(&v) {
                Some(project_id) => self.auth.project_id = Some(project_id),
                None => tracing::warn!("FIREBASE_CONFIG is not valid JSON or has no projectId"),
            }
        }
        if let Ok(v) = env::var("FIREBASE_PROJECT_ID") {
            self.auth.project_id = non_empty(v);
        }
        if let Ok(v) = env::var("AUTH_JWKS_URL") {
            self.auth.jwks_url = v;
        }
        if let Ok(v) = env::var("AUTH_JWKS_CACHE_SECS") {
            self.auth.jwks_cache_secs = v.parse().unwrap_or(self.auth.jwks_cache_secs);
        }
        if let Ok(v) = env::var("ADMIN_UIDS") {
            self.auth.admin_uids = split_list(&v);
        }

        // Identity provider
        if let Ok(v) = env::var("FIREBASE_SERVICE_ACCOUNT_JSON") {
            self.identity.service_account_json = non_empty(v);
        }

        // Partner API overrides
        if let Ok(v) = env::var("REPAIRLINE_API_BASE_URL") {
            self.partner.base_url = v;
        }
        if let Ok(v) = env::var("REPAIRLINE_EXPORT_BASE_URL") {
            self.partner.export_base_url = v;
        }
        if let Ok(v) = env::var("REPAIRLINE_API_USERNAME") {
            self.partner.username = non_empty(v);
        }
        if let Ok(v) = env::var("REPAIRLINE_API_PASSWORD") {
            self.partner.password = non_empty(v);
        }
        if let Ok(v) = env::var("REPAIRLINE_REQUEST_TIMEOUT_SECS") {
            self.partner.request_timeout_secs = v.parse().unwrap_or(self.partner.request_timeout_secs);
        }
        if let Ok(v) = env::var("REPAIRLINE_LIST_TIMEOUT_SECS") {
            self.partner.list_timeout_secs = v.parse().unwrap_or(self.partner.list_timeout_secs);
        }

        // Sync worker overrides
        if let Ok(v) = env::var("SYNC_MAX_WORKERS") {
            self.sync.max_workers = v.parse().unwrap_or(self.sync.max_workers).max(1);
        }
        if let Ok(v) = env::var("SYNC_MAX_RETRIES") {
            self.sync.max_retries = v.parse().unwrap_or(self.sync.max_retries).max(1);
        }
        if let Ok(v) = env::var("SYNC_RETRY_DELAY_MS") {
            self.sync.retry_delay_ms = v.parse().unwrap_or(self.sync.retry_delay_ms);
        }
        if let Ok(v) = env::var("SYNC_PROGRESS_EVERY") {
            self.sync.progress_every = v.parse().unwrap_or(self.sync.progress_every).max(1);
        }

        // Export overrides
        if let Ok(v) = env::var("EXPORT_CHUNK_SIZE") {
            self.export.chunk_size = v.parse().unwrap_or(self.export.chunk_size).max(1);
        }
        if let Ok(v) = env::var("EXPORT_CHUNK_PAUSE_SECS") {
            self.export.chunk_pause_secs = v.parse().unwrap_or(self.export.chunk_pause_secs);
        }

        // API overrides
        if let Some(v) = env::var("REPAIRDESK_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("CASES_MAX_LIMIT") {
            self.api.cases_max_limit = v.parse().unwrap_or(self.api.cases_max_limit);
        }
        if let Ok(v) = env::var("CASES_DEFAULT_LIMIT") {
            self.api.cases_default_limit = v.parse().unwrap_or(self.api.cases_default_limit);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
            self.security.permissive_cors = false;
        }

        self.clamp_case_limits();
        self
    }

    /// Keeps `1 <= cases_default_limit <= cases_max_limit`.
    fn clamp_case_limits(&mut self) {
        self.api.cases_max_limit = self.api.cases_max_limit.max(1);
        let default_limit = self.api.cases_default_limit.clamp(1, self.api.cases_max_limit);
        if default_limit != self.api.cases_default_limit {
            tracing::warn!(
                "CASES_DEFAULT_LIMIT {} is outside 1..={}, using {}",
                self.api.cases_default_limit,
                self.api.cases_max_limit,
                default_limit
            );
            self.api.cases_default_limit = default_limit;
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            auth: AuthConfig::default(),
            identity: IdentityConfig { service_account_json: None },
            partner: PartnerConfig::default(),
            sync: SyncConfig::default(),
            export: ExportConfig::default(),
            api: ApiConfig {
                port: 8000,
                cases_max_limit: 200,
                cases_default_limit: 50,
            },
            security: SecurityConfig {
                permissive_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                permissive_cors: false,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 30,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                permissive_cors: false,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            ..Self::development()
        }
    }

    pub fn is_admin(&self, uid: &str) -> bool {
        self.auth.admin_uids.iter().any(|admin| admin == uid)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            jwks_cache_secs: 3600,
            admin_uids: DEFAULT_ADMIN_UIDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for PartnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.system.repairline.de/v2/".to_string(),
            export_base_url: "http://api.system.repairline.de/".to_string(),
            username: None,
            password: None,
            request_timeout_secs: 30,
            list_timeout_secs: 300,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            max_retries: 3,
            retry_delay_ms: 1000,
            progress_every: 50,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            chunk_pause_secs: 2,
        }
    }
}

/// Pull `projectId` out of the web-client Firebase config JSON.
pub fn project_id_from_firebase_config(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    value
        .get("projectId")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(v: String) -> Option<String> {
    if v.trim().is_empty() { None } else { Some(v) }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
