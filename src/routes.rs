//! Application routing configuration with middleware stack.
//!
//! # Routes
//!
//! | Method | Path           | Auth                     |
//! |--------|----------------|--------------------------|
//! | POST   | `/v1/messages` | when a scheme is enabled |
//! | GET    | `/health`      | never                    |
//!
//! Unknown paths get 404 `not_found_error`; known paths with another method
//! get 405 `method_not_allowed`. The stage order is described in
//! [`Pipeline`].

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tracing::info;

use crate::auth::AuthChain;
use crate::handlers;
use crate::middleware::Pipeline;
use crate::state::AppState;

/// Path of the relayed Messages API endpoint.
pub const MESSAGES_PATH: &str = "/v1/messages";

/// Path of the liveness probe.
pub const HEALTH_PATH: &str = "/health";

/// Build the application router from state, deriving the auth chain from
/// the configuration.
pub fn build_router(state: AppState) -> Router {
    let chain = AuthChain::from_config(&state.config.auth);
    build_router_with(state, Pipeline::new(chain))
}

/// Build the application router around an explicit pipeline.
pub fn build_router_with(state: AppState, pipeline: Pipeline) -> Router {
    let max_body = state.config.max_request_body_size;

    info!(stages = ?pipeline.names(), "Middleware pipeline configured");
    if pipeline.auth_enabled() {
        info!(path = MESSAGES_PATH, "Inbound authentication enabled");
    } else {
        info!("Inbound authentication disabled (no scheme configured)");
    }
    info!(
        max_size_mb = max_body / (1024 * 1024),
        "Request body size limit configured"
    );

    let messages = pipeline
        .protect(post(handlers::proxy_messages))
        .fallback(handlers::method_not_allowed);

    // Registered without `protect`, so the probe can never require auth.
    let health = get(handlers::health_check).fallback(handlers::method_not_allowed);

    let router = Router::new()
        .route(MESSAGES_PATH, messages)
        .route(HEALTH_PATH, health)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_body));

    pipeline.wrap(router).with_state(state)
}
