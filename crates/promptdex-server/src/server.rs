//! Router assembly and the HTTP server runner.

use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use promptdex_auth::{
    AuthState, MemoryPrincipalStore, PrincipalStore,
    http::{
        authorize_handler, callback_handler, login_handler, me_handler, register_handler,
    },
    security_gate,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, CorsConfig};

/// Builds the application router over a fresh in-memory store.
///
/// # Errors
///
/// Returns an error for invalid auth or CORS configuration.
pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    build_app_with_store(cfg, Arc::new(MemoryPrincipalStore::new()))
}

/// Builds the application router over the given principal store.
///
/// # Errors
///
/// Returns an error for invalid auth or CORS configuration.
pub fn build_app_with_store(
    cfg: &AppConfig,
    store: Arc<dyn PrincipalStore>,
) -> anyhow::Result<Router> {
    let auth = AuthState::from_config(cfg.auth.clone(), store)?;

    let app = Router::new()
        .route("/healthz", get(healthz))
        // Local credentials
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/me", get(me_handler))
        // Federated login
        .route("/oauth2/authorize/{provider}", get(authorize_handler))
        .route("/login/oauth2/code/{provider}", get(callback_handler))
        // The gate runs for every route, including unrouted paths the
        // business layer would mount under /api.
        .layer(middleware::from_fn_with_state(auth.clone(), security_gate))
        .layer(cors_layer(&cfg.cors)?)
        .layer(TraceLayer::new_for_http())
        .with_state(auth);

    Ok(app)
}

/// Runs the server until shutdown.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg)?;
    let addr = cfg.addr();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(cfg: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let origins = cfg
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::CACHE_CONTROL,
        ])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
