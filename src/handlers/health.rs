//! Liveness probe.
//!
//! `GET /health` is registered without the auth stage and never touches the
//! backend, so it answers 200 whenever the process is serving.

use axum::Json;
use serde::Serialize;

/// Body of a health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {"status": "ok"}
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
