//! Per-request state shared by the middleware stack and handlers.
//!
//! The request ID middleware creates a [`RequestContext`] and stores it in
//! the request extensions. Everything downstream reads it from there.

use std::sync::Arc;

use axum::http::Request;
use tracing::{Span, info_span};

/// Placeholder used when a request never passed through the request ID
/// middleware (e.g. unit tests driving a handler directly).
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Request identifier plus the tracing span that carries it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Arc<str>,
    span: Span,
}

impl RequestContext {
    /// Create a context whose span records `request_id` on every event.
    pub fn new(request_id: impl Into<Arc<str>>) -> Self {
        let request_id = request_id.into();
        let span = info_span!("request", request_id = %request_id);
        Self { request_id, span }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Span scoped to this request. Events emitted inside it carry the ID.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Extension trait to read the [`RequestContext`] from a request.
pub trait RequestContextExt {
    fn context(&self) -> Option<&RequestContext>;

    /// The resolved request ID, or [`UNKNOWN_REQUEST_ID`].
    fn request_id(&self) -> &str {
        self.context()
            .map(RequestContext::request_id)
            .unwrap_or(UNKNOWN_REQUEST_ID)
    }
}

impl<B> RequestContextExt for Request<B> {
    fn context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_context_from_extensions() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut().insert(RequestContext::new("abc123"));

        assert_eq!(req.request_id(), "abc123");
        assert_eq!(req.context().unwrap().request_id(), "abc123");
    }

    #[test]
    fn test_missing_context_is_unknown() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(req.context().is_none());
        assert_eq!(req.request_id(), UNKNOWN_REQUEST_ID);
    }
}
