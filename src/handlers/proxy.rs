//! Messages API relay.
//!
//! # Endpoint
//!
//! - `POST /v1/messages` - forward to the configured provider
//!
//! The body is buffered once, inspected for `"stream": true`, and sent to
//! the backend unchanged. Outbound headers are the provider's allow-listed
//! copy of the client's headers plus the backend credential; client
//! credentials never leave the relay.
//!
//! # Failure Mapping
//!
//! | Condition                          | Status | Kind                    |
//! |------------------------------------|--------|-------------------------|
//! | body over `MAX_REQUEST_BODY_SIZE`  | 413    | `request_too_large`     |
//! | streaming asked, not supported     | 400    | `invalid_request_error` |
//! | backend unreachable                | 502    | `api_error`             |
//! | backend connect timed out          | 504    | `timeout_error`         |
//! | backend answered                   | relayed as-is                    |

use axum::body::Body;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderName, Uri};
use axum::response::Response;
use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, info, instrument};

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::state::AppState;
use crate::streaming::{is_streaming_request, set_sse_headers};

/// Prefix of backend response headers passed back to the client.
const RELAYED_PREFIX: &str = "anthropic-";

/// Backend correlation header passed back to the client.
static UPSTREAM_REQUEST_ID: HeaderName = HeaderName::from_static("request-id");

/// Relay a Messages API call to the configured provider.
#[instrument(skip_all)]
pub async fn proxy_messages(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Response> {
    let body = body?;
    let provider = state.provider.as_ref();
    let streaming = is_streaming_request(&body);

    if streaming && !provider.supports_streaming() {
        return Err(AppError::InvalidRequest(format!(
            "Provider '{}' does not support streaming",
            provider.name()
        )));
    }

    let mut outbound = provider.forward_headers(&headers);
    provider.authenticate(&mut outbound, state.backend_key())?;

    let url = upstream_url(&state.messages_url, uri.query());
    debug!(
        provider = provider.name(),
        url = %url,
        streaming,
        bytes = body.len(),
        "Forwarding request"
    );

    let upstream = state
        .http
        .post(url)
        .headers(outbound)
        .body(body)
        .send()
        .await
        .map_err(|e| classify_upstream_error(provider.name(), &e))?;

    let status = upstream.status();
    metrics::record_upstream_request(provider.name(), status.as_u16(), streaming);
    info!(
        provider = provider.name(),
        status = status.as_u16(),
        streaming,
        "Upstream responded"
    );

    let mut relayed = relay_response_headers(upstream.headers());
    if streaming && status.is_success() {
        set_sse_headers(&mut relayed);
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = relayed;

    Ok(response)
}

/// Messages endpoint with the client's query string carried over.
fn upstream_url(messages_url: &Url, query: Option<&str>) -> Url {
    let mut url = messages_url.clone();
    url.set_query(query.filter(|q| !q.is_empty()));
    url
}

/// Select the backend response headers a client may see.
fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::new();

    for (name, value) in upstream {
        let keep = *name == CONTENT_TYPE
            || *name == RETRY_AFTER
            || *name == UPSTREAM_REQUEST_ID
            || name.as_str().starts_with(RELAYED_PREFIX);

        if keep {
            relayed.append(name.clone(), value.clone());
        }
    }

    relayed
}

fn classify_upstream_error(provider: &str, err: &reqwest::Error) -> AppError {
    if err.is_timeout() {
        metrics::record_upstream_error(provider, "timeout");
        AppError::UpstreamTimeout(err.to_string())
    } else if err.is_connect() {
        metrics::record_upstream_error(provider, "connect");
        AppError::Upstream(err.to_string())
    } else {
        metrics::record_upstream_error(provider, "request");
        AppError::Upstream(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderValue, StatusCode};

    use super::*;
    use crate::config::Config;
    use crate::providers::{Provider, ProviderError};

    /// Backend that cannot stream, to exercise the capability check.
    #[derive(Debug)]
    struct BatchOnly {
        base_url: Url,
    }

    impl Provider for BatchOnly {
        fn name(&self) -> &str {
            "batch-only"
        }

        fn base_url(&self) -> &Url {
            &self.base_url
        }

        fn authenticate(&self, headers: &mut HeaderMap, key: &str) -> Result<(), ProviderError> {
            let value = HeaderValue::from_str(key)
                .map_err(|_| ProviderError::InvalidHeaderValue { header: "x-api-key" })?;
            headers.insert("x-api-key", value);
            Ok(())
        }

        fn forward_headers(&self, _original: &HeaderMap) -> HeaderMap {
            HeaderMap::new()
        }

        fn supports_streaming(&self) -> bool {
            false
        }
    }

    fn state_with(provider: Arc<dyn Provider>) -> AppState {
        AppState::new(Config::default(), provider).unwrap()
    }

    fn unreachable_backend() -> Arc<dyn Provider> {
        Arc::new(BatchOnly {
            base_url: Url::parse("http://127.0.0.1:1").unwrap(),
        })
    }

    #[tokio::test]
    async fn test_streaming_rejected_for_batch_only_provider() {
        let state = state_with(unreachable_backend());
        let body = Bytes::from_static(br#"{"stream":true}"#);

        let result = proxy_messages(
            State(state),
            Uri::from_static("/v1/messages"),
            HeaderMap::new(),
            Ok(body),
        )
        .await;

        let err = result.err().expect("streaming must be rejected");
        assert_eq!(
            err.status_and_kind(),
            (StatusCode::BAD_REQUEST, "invalid_request_error")
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_bad_gateway() {
        let state = state_with(unreachable_backend());
        let body = Bytes::from_static(br#"{"stream":false}"#);

        let result = proxy_messages(
            State(state),
            Uri::from_static("/v1/messages"),
            HeaderMap::new(),
            Ok(body),
        )
        .await;

        let err = result.err().expect("backend is unreachable");
        assert_eq!(err.status_and_kind().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_upstream_url_keeps_query() {
        let base = Url::parse("https://api.example.test/v1/messages").unwrap();

        assert_eq!(
            upstream_url(&base, Some("beta=true")).as_str(),
            "https://api.example.test/v1/messages?beta=true"
        );
        assert_eq!(
            upstream_url(&base, None).as_str(),
            "https://api.example.test/v1/messages"
        );
        assert_eq!(
            upstream_url(&base, Some("")).as_str(),
            "https://api.example.test/v1/messages"
        );
    }

    #[test]
    fn test_relay_response_headers_allow_list() {
        let mut upstream = HeaderMap::new();
        upstream.insert("content-type", HeaderValue::from_static("application/json"));
        upstream.insert("anthropic-ratelimit-requests-remaining", HeaderValue::from_static("9"));
        upstream.insert("request-id", HeaderValue::from_static("req_123"));
        upstream.insert("retry-after", HeaderValue::from_static("5"));
        upstream.insert("set-cookie", HeaderValue::from_static("session=1"));
        upstream.insert("x-internal-host", HeaderValue::from_static("node-7"));
        upstream.insert("content-length", HeaderValue::from_static("42"));

        let relayed = relay_response_headers(&upstream);

        assert_eq!(relayed.len(), 4);
        assert_eq!(relayed["content-type"], "application/json");
        assert_eq!(relayed["anthropic-ratelimit-requests-remaining"], "9");
        assert_eq!(relayed["request-id"], "req_123");
        assert_eq!(relayed["retry-after"], "5");
        assert!(!relayed.contains_key("set-cookie"));
        assert!(!relayed.contains_key("content-length"));
    }
}
