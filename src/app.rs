use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, http::Method, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{SessionManager, XsrfTokenService};
use crate::config::AppConfig;
use crate::database::store::{EntityStore, MemoryStore};
use crate::handlers::api::api_route;
use crate::handlers::protected::{CurrentUserPermissions, FeatureApi, StageApi, TokenRefresh};
use crate::handlers::public::{page_routes, MockLogin};
use crate::middleware::security_headers_middleware;
use crate::permissions::{PermissionOracle, StaticPermissions};
use crate::services::{LogNotifier, Notifier, SpaShellRenderer, TemplateRenderer};

/// Everything a request may touch, shared read-only across workers
pub struct AppState {
    pub config: AppConfig,
    pub tokens: XsrfTokenService,
    pub sessions: SessionManager,
    pub store: Arc<dyn EntityStore>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub notifier: Arc<dyn Notifier>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn EntityStore>,
        permissions: Arc<dyn PermissionOracle>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let security = &config.security;
        let tokens = XsrfTokenService::new(
            &security.xsrf_secret,
            security.xsrf_token_timeout_secs,
            security.xsrf_refresh_timeout_secs,
        );
        let sessions = SessionManager::new(security.session_secret.clone(), security.session_lifetime_hours);
        Self {
            config,
            tokens,
            sessions,
            store,
            permissions,
            notifier,
            renderer,
        }
    }

    /// State over an empty in-memory store with the configured static permissions
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn EntityStore>) -> Self {
        let permissions = Arc::new(StaticPermissions::new(&config.permissions));
        Self::new(
            config,
            store,
            permissions,
            Arc::new(LogNotifier),
            Arc::new(SpaShellRenderer),
        )
    }
}

/// Full application router: API, pages and the global layers
pub fn router(state: Arc<AppState>) -> Router {
    let session_routes = Router::new()
        .route("/dev/mock_login", api_route(MockLogin))
        .route("/api/v0/currentuser/permissions", api_route(CurrentUserPermissions))
        .route("/api/v0/currentuser/token", api_route(TokenRefresh));

    let feature_routes = Router::new()
        .route("/api/v0/features/:feature_id", api_route(FeatureApi))
        .route(
            "/api/v0/features/:feature_id/stages/:stage_id",
            api_route(StageApi),
        )
        .layer(cors_layer(&state.config));

    Router::new()
        .merge(session_routes)
        .merge(feature_routes)
        .merge(page_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(security_headers_middleware))
                .layer(DefaultBodyLimit::max(state.config.server.max_request_size_bytes)),
        )
        .with_state(state)
}

/// Read-only cross-origin access to the feature API
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.security.cors_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect::<Vec<_>>(),
        )
    };
    CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(allow_origin)
}
