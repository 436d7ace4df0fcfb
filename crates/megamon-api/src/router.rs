//! Route definitions for the Mega Monitor HTTP API.
//!
//! Admin routes live under `/api`; mounted extension routes are served
//! through the catch-all dispatch under `/extensions/{name}`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_size_bytes as usize;
    let request_timeout =
        std::time::Duration::from_secs(state.config.server.request_timeout_seconds);

    let api_routes = Router::new()
        .merge(extension_routes())
        .merge(health_routes());

    let dynamic_routes = Router::new()
        .route("/extensions/{name}", any(handlers::proxy::dispatch_root))
        .route(
            "/extensions/{name}/{*rest}",
            any(handlers::proxy::dispatch),
        );

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .merge(dynamic_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Extension admin endpoints.
fn extension_routes() -> Router<AppState> {
    Router::new()
        .route("/extensions", get(handlers::extension::list))
        .route("/extensions/upload", post(handlers::extension::upload))
        .route("/extensions/widgets", get(handlers::extension::widgets))
        .route(
            "/extensions/providers/{capability}",
            get(handlers::extension::providers),
        )
        .route(
            "/extensions/{id}",
            get(handlers::extension::get)
                .patch(handlers::extension::update)
                .delete(handlers::extension::uninstall),
        )
        .route(
            "/extensions/{id}/component",
            get(handlers::extension::component),
        )
        .route(
            "/extensions/{id}/locales/{lang}",
            get(handlers::extension::locale_pack),
        )
}

/// Health check endpoints (no auth required).
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}

/// Build CORS layer from configuration.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    use http::Method;
    use tower_http::cors::Any;

    let cors_config = &state.config.server.cors;

    let mut cors = CorsLayer::new();

    if cors_config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<http::HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<Method> = cors_config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    cors = cors.allow_methods(methods);

    if cors_config.allowed_headers.contains(&"*".to_string()) {
        cors = cors.allow_headers(Any);
    }

    cors.max_age(std::time::Duration::from_secs(
        cors_config.max_age_seconds,
    ))
}
