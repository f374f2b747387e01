//! Turns handler panics into a minimal 500 response.

use std::any::Any;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use crate::error::write_error;

/// Panic handler signature expected by [`CatchPanicLayer::custom`].
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response<Body>;

/// Build the panic-recovery layer.
pub fn layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    error!(panic = detail, "handler panicked");

    write_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "api_error",
        "An internal error occurred.",
    )
}
