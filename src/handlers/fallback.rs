//! Responses for requests that match no route.

use axum::http::Uri;

use crate::error::AppError;

/// Router-level fallback: no route has this path.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Per-route fallback: the path exists but not for this method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
