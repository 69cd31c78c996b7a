//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod configuration;
mod schema_migration;

use crate::auth::admin_middleware;
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(admin_routes(state.clone()))
        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Configuration and schema-migration routes, admin only
fn admin_routes(state: SharedState) -> Router<SharedState> {
    Router::new()
        // UI configuration
        .route("/configuration/forms", get(configuration::list_forms))
        .route(
            "/configuration/form-schema",
            get(configuration::get_form_schema).post(configuration::save_form_schema),
        )
        .route("/configuration/overrides", get(configuration::list_overrides))
        // Schema migration
        .route("/schema-migration/check/{table}/{column}", get(schema_migration::check_column))
        .route("/schema-migration/add-column", post(schema_migration::add_column))
        .route("/schema-migration/sync-form", post(schema_migration::sync_form))
        .route("/schema-migration/tables", get(schema_migration::list_tables))
        .route("/schema-migration/tables/{table}/columns", get(schema_migration::list_columns))
        .route_layer(middleware::from_fn_with_state(state, admin_middleware))
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
