use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::{FirebaseVerifier, TokenVerifier};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::{CaseRepository, CaseStore, PgCaseStore};
use crate::handlers;
use crate::identity::{FirebaseAdmin, IdentityError, IdentityProvider};
use crate::middleware::firebase_auth_middleware;
use crate::partner::{PartnerApi, RepairlineClient};
use crate::sync::{SyncEngine, SyncTracker};

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub cases: CaseRepository,
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub partner: Arc<dyn PartnerApi>,
    pub engine: Arc<SyncEngine>,
    pub tracker: Arc<SyncTracker>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pool: PgPool,
        verifier: Option<Arc<dyn TokenVerifier>>,
        identity: Option<Arc<dyn IdentityProvider>>,
        partner: Arc<dyn PartnerApi>,
        store: Arc<dyn CaseStore>,
    ) -> Self {
        let engine = SyncEngine::new(Arc::clone(&partner), store, config.sync.clone());
        Self {
            cases: CaseRepository::new(pool.clone()),
            config: Arc::new(config),
            pool,
            verifier,
            identity,
            partner,
            engine: Arc::new(engine),
            tracker: Arc::new(SyncTracker::new()),
        }
    }

    /// Wire the production implementations from configuration. Missing auth or
    /// identity settings leave those features disabled rather than failing startup.
    pub fn from_config(config: AppConfig, pool: PgPool) -> anyhow::Result<Self> {
        let verifier: Option<Arc<dyn TokenVerifier>> = match FirebaseVerifier::new(&config.auth) {
            Ok(verifier) => {
                info!("Token verification enabled for project {:?}", config.auth.project_id);
                Some(Arc::new(verifier))
            }
            Err(e) => {
                warn!("{}; protected routes will answer 503", e);
                None
            }
        };

        let identity: Option<Arc<dyn IdentityProvider>> = match FirebaseAdmin::from_config(&config.identity) {
            Ok(admin) => Some(Arc::new(admin)),
            Err(IdentityError::NotConfigured) => {
                warn!("FIREBASE_SERVICE_ACCOUNT_JSON not set; user administration disabled");
                None
            }
            Err(e) => {
                warn!("Identity provider not initialized: {}", e);
                None
            }
        };

        let client = RepairlineClient::new(&config.partner)?;
        if !client.is_configured() {
            warn!("REPAIRLINE_API_USERNAME/REPAIRLINE_API_PASSWORD not set; partner calls will fail");
        }

        let store = Arc::new(PgCaseStore::new(pool.clone()));
        Ok(Self::new(config, pool, verifier, identity, Arc::new(client), store))
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        // Auth checks
        .route("/routes/minimal-auth-works", get(handlers::protected::minimal_auth_works))
        .route("/routes/me-admin", get(handlers::protected::me_admin))
        // User administration
        .route("/routes/create-firebase-user", post(handlers::protected::create_firebase_user))
        .route("/routes/list-firebase-users", get(handlers::protected::list_firebase_users))
        // Case queries and exports
        .route("/routes/cases", get(handlers::protected::list_cases))
        .route("/routes/repair-case/:case_id", get(handlers::protected::get_repair_case))
        .route("/routes/export-repair-cases-csv", get(handlers::protected::export_cases_csv))
        .route("/routes/export-old-repair-cases-excel", get(handlers::protected::export_old_cases_excel))
        .route(
            "/routes/export-specific-old-cases-from-reparline-excel",
            post(handlers::protected::export_partner_cases_excel),
        )
        // Sync
        .route("/routes/sync-insurance-cases", post(handlers::protected::trigger_sync))
        .route("/routes/sync-status", get(handlers::protected::sync_status))
        .route("/routes/test-single-sync/:case_id", post(handlers::protected::test_single_sync))
        .route_layer(middleware::from_fn_with_state(state.clone(), firebase_auth_middleware));

    let cors = cors_layer(&state.config.security);

    Router::new()
        .route("/_healthz", get(handlers::health::healthz))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.permissive_cors {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
