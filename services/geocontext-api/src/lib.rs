//! GeoContext API Service Library
//!
//! HTTP server answering point queries against the service, group and
//! collection registries, plus the registry listings, the map page and
//! operational endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod maintenance;
pub mod state;
pub mod worker;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Map page
        .route("/", get(handlers::map::map_handler))
        // Query
        .route("/api/v2/query", get(handlers::query::query_handler))
        // Registries
        .route(
            "/api/v2/registry",
            get(handlers::registry::registry_index_handler),
        )
        .route(
            "/api/v2/registry/:registry",
            get(handlers::registry::registry_entries_handler),
        )
        .route(
            "/api/v2/registry/:registry/:key",
            get(handlers::registry::registry_detail_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
