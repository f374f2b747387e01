//! Request ID middleware.
//!
//! # Behavior
//!
//! - Reuses a client-supplied `X-Request-ID` header verbatim
//! - Generates a UUIDv4 when the header is missing, empty, or not valid text
//! - Writes the resolved ID to the `X-Request-ID` response header exactly once
//! - Stores a [`RequestContext`] in the request extensions and runs the rest
//!   of the stack inside its span, so every log line carries the ID
//!
//! # Client Usage
//!
//! ```bash
//! curl -H "X-Request-ID: my-correlation-id" http://localhost:8787/health
//! ```
//!
//! The same ID comes back in the response for correlation.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, debug};
use uuid::Uuid;

use crate::context::{RequestContext, UNKNOWN_REQUEST_ID};

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID layer for Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl RequestIdLayer {
    /// Create a new request ID layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Request ID service wrapper.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = extract_or_generate_request_id(&req);
        let header_value = HeaderValue::from_str(&request_id)
            .unwrap_or_else(|_| HeaderValue::from_static(UNKNOWN_REQUEST_ID));

        let context = RequestContext::new(request_id);
        let span = context.span().clone();
        req.extensions_mut().insert(context);

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                debug!("Processing request");
                let mut response = inner.call(req).await?;

                // `insert` replaces anything a handler may have set, so the
                // header appears exactly once.
                response.headers_mut().insert(REQUEST_ID_HEADER, header_value);

                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Extract request ID from headers or generate a new one.
fn extract_or_generate_request_id<B>(req: &Request<B>) -> String {
    if let Some(header_value) = req.headers().get(REQUEST_ID_HEADER)
        && let Ok(value) = header_value.to_str()
        && !value.is_empty()
    {
        return value.to_string();
    }

    Uuid::new_v4().to_string()
}
