//! Route configuration and setup.

use crate::api_doc::ApiDoc;
use crate::handlers::{audit, documents, external, health};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use inkseal_core::constants::API_PREFIX;
use inkseal_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Room for multipart framing and the signature image next to a full-size PDF.
const MULTIPART_OVERHEAD_BYTES: usize = 2 * 1024 * 1024;

/// Full application router with CORS, body limits and request tracing.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let body_limit = config.max_document_size_bytes() + MULTIPART_OVERHEAD_BYTES;

    let app = app_router(state)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors);

    Ok(app)
}

/// Routes and tracing only; size limits are enforced by the lifecycle as well.
pub fn app_router(state: Arc<AppState>) -> Router {
    let document_routes = Router::new()
        .route(
            "/documents",
            post(documents::upload_document).get(documents::list_documents),
        )
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/documents/{id}/download", get(documents::download_document))
        .route("/documents/{id}/sign", post(documents::sign_document))
        .route("/documents/{id}/share", post(documents::share_document))
        .route("/documents/{id}/audit", get(audit::list_audit));

    let external_routes = Router::new()
        .route("/external/{token}", get(external::view_shared))
        .route("/external/{token}/download", get(external::download_shared))
        .route("/external/{token}/sign", post(external::sign_shared))
        .route("/external/{token}/reject", post(external::reject_shared));

    Router::new()
        .nest(API_PREFIX, document_routes.merge(external_routes))
        .route("/health", get(health::health_check))
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(TraceLayer::new_for_http())
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|_| anyhow::anyhow!("Invalid CORS origin: {}", o))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
