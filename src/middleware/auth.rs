//! Inbound authentication middleware.
//!
//! Runs the configured [`AuthChain`] against each request. On failure the
//! request is answered with a 401 `authentication_error` and never reaches
//! the wrapped handler.
//!
//! # Usage
//!
//! ```bash
//! PROXY_API_KEY=your-secret-key cargo run
//! curl -H "x-api-key: your-secret-key" http://localhost:8787/v1/messages ...
//!
//! PROXY_BEARER_SECRET=token cargo run
//! curl -H "Authorization: Bearer token" http://localhost:8787/v1/messages ...
//! ```
//!
//! # Scope
//!
//! This layer is attached only to routes that need it (see
//! [`Pipeline::protect`](super::Pipeline::protect)). The health probe is
//! registered without it, so there is no bypass list to get wrong.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::auth::AuthChain;
use crate::context::RequestContextExt;
use crate::error::AppError;
use crate::metrics;

/// Authentication layer around a shared, immutable chain.
#[derive(Clone)]
pub struct AuthLayer {
    chain: Arc<AuthChain>,
}

impl AuthLayer {
    pub fn new(chain: Arc<AuthChain>) -> Self {
        Self { chain }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            chain: self.chain.clone(),
        }
    }
}

/// Authentication service wrapper.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    chain: Arc<AuthChain>,
}

impl<S> Service<Request<Body>> for AuthService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let chain = self.chain.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let result = chain.validate_request(&req);

            if result.is_valid() {
                debug!(auth_type = %result.kind, "authentication succeeded");
                return inner.call(req).await;
            }

            let reason = result
                .reason
                .unwrap_or_else(|| "authentication failed".to_string());

            warn!(
                request_id = req.request_id(),
                auth_type = %result.kind,
                error = %reason,
                "authentication failed"
            );
            metrics::record_auth_failure(result.kind.as_str());

            Ok(AppError::Authentication(reason).into_response())
        })
    }
}
