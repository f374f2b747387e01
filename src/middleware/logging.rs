//! Access logging middleware.
//!
//! Logs one line when a request arrives and one when its response head is
//! ready. Completion severity follows the status code:
//!
//! | Status    | Level   |
//! |-----------|---------|
//! | 500+      | `ERROR` |
//! | 400 - 499 | `WARN`  |
//! | otherwise | `INFO`  |
//!
//! For streamed responses the completion line is written when the stream
//! starts, not when it ends; `duration_ms` is time to first byte.
//!
//! This layer must sit inside [`RequestIdLayer`](super::RequestIdLayer) so
//! both lines are emitted within the request span and carry its ID.

use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::{Level, error, info, warn};

use crate::metrics;

/// Logged when the connection's peer address is not available.
const UNKNOWN_REMOTE_ADDR: &str = "unknown";

/// Access logging layer.
#[derive(Clone, Default)]
pub struct LoggingLayer;

impl LoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

#[derive(Clone)]
pub struct LoggingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for LoggingService<S>
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
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let remote_addr = remote_addr(&req);

        info!(
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            "{method} {path}"
        );

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;
            let status = response.status();
            let elapsed = start.elapsed();

            log_completion(&method, &path, status, elapsed);
            metrics::record_request(method.as_str(), status.as_u16(), elapsed.as_secs_f64());

            Ok(response)
        })
    }
}

/// Severity for a completed request with `status`.
pub fn completion_level(status: StatusCode) -> Level {
    match status.as_u16() {
        500.. => Level::ERROR,
        400..=499 => Level::WARN,
        _ => Level::INFO,
    }
}

fn log_completion(method: &Method, path: &str, status: StatusCode, elapsed: Duration) {
    let duration_ms = elapsed.as_secs_f64() * 1000.0;
    let reason = status.canonical_reason().unwrap_or("");
    let level = completion_level(status);
    let status = status.as_u16();

    match level {
        Level::ERROR => error!(
            method = %method,
            path,
            status,
            duration_ms,
            "request failed: {status} {reason}"
        ),
        Level::WARN => warn!(
            method = %method,
            path,
            status,
            duration_ms,
            "request rejected: {status} {reason}"
        ),
        _ => info!(
            method = %method,
            path,
            status,
            duration_ms,
            "request completed: {status} {reason}"
        ),
    }
}

/// Peer address from axum's `ConnectInfo`, if the server was started with it.
fn remote_addr<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| UNKNOWN_REMOTE_ADDR.to_string())
}
