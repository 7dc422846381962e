//! API Route Configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{logging_middleware, rate_limit_middleware};

/// Scans in flight at once; each one fans out to every chain
const MAX_CONCURRENT_SCANS: usize = 4;

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/v1", v1_routes())
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // Middleware (order matters - bottom runs first)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(rate_limit_middleware))
}

fn v1_routes() -> Router<Arc<AppState>> {
    let scans = Router::new()
        .route("/scan", post(handlers::scan))
        .route_layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_SCANS));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/chains", get(handlers::list_chains))
        .route("/findings", get(handlers::get_findings))
        .route("/revoke", post(handlers::revoke))
        .merge(scans)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
