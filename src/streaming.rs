//! Server-sent event detection and response framing.
//!
//! A Messages API request opts into streaming with `"stream": true` in its
//! JSON body. Detection is deliberately forgiving: anything that is not a
//! JSON object with a literal boolean `true` under `stream` is treated as a
//! regular request, and it is up to the backend to reject bad payloads.

use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

/// Content type of a server-sent event stream.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Tells nginx-style reverse proxies not to buffer the stream.
static X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Check whether a request body asks for a streamed response.
///
/// Parse failures, a missing field, and non-boolean values all yield
/// `false`; this never errors.
pub fn is_streaming_request(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("stream").and_then(Value::as_bool))
        .unwrap_or(false)
}

/// Apply SSE framing headers, replacing any existing values.
pub fn set_sse_headers(headers: &mut HeaderMap) {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform"));
    headers.insert(X_ACCEL_BUFFERING.clone(), HeaderValue::from_static("no"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
}
