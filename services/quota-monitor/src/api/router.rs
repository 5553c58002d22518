use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers;
use super::ApiState;

pub fn create_router(state: Arc<ApiState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    Router::new()
        .route("/api/quota", get(handlers::list_windows))
        .route("/api/quota/stats", get(handlers::get_stats))
        .route("/api/quota/alerts", get(handlers::get_alerts))
        .route("/api/quota/errors", get(handlers::recent_errors))
        .route("/api/quota/reset", post(handlers::reset_quota))
        .route("/api/quota/cleanup", post(handlers::cleanup_quota))
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .layer(middleware)
}
