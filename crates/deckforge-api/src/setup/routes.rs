//! Route configuration and setup.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use deckforge_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::auth::{auth_middleware, AuthFailureLimiter, AuthState};
use crate::constants::{
    AUTH_FAILURE_WINDOW_SECS, AUTH_MAX_FAILURES, DOCS_PATH, MAX_REQUEST_BODY_BYTES, OPENAPI_PATH,
};
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
    master_api_key: String,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState {
        master_api_key,
        auth_failure_limiter: Some(Arc::new(AuthFailureLimiter::new(
            AUTH_MAX_FAILURES,
            AUTH_FAILURE_WINDOW_SECS,
        ))),
        trusted_proxy_count: config.trusted_proxy_count,
    });

    let http_concurrency_limit = config.http_concurrency_limit.max(1);
    tracing::info!(
        http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let app = public_routes()
        .merge(protected_routes(auth_state))
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_PATH).path(DOCS_PATH))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        .route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}

fn protected_routes(auth_state: Arc<AuthState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/generate-ppt",
            post(handlers::presentations::generate_presentation),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
}
