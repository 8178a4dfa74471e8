//! Route configuration and setup

use crate::auth::auth_middleware;
use crate::constants::{HEALTH_PATH, HTTP_CONCURRENCY_LIMIT, MULTIPART_OVERHEAD_BYTES, UPLOAD_PATH};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.pipeline.config().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    // Protected routes (require a bearer token); route_layer keeps unknown paths at 404
    let protected_routes = Router::new()
        .route(UPLOAD_PATH, post(handlers::video_upload::upload_video))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(axum::middleware::from_fn_with_state(
            state.token_validator.clone(),
            auth_middleware,
        ));

    Router::new()
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
