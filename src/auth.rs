//! Inbound credential validation.
//!
//! # Schemes
//!
//! | Kind      | Source                          | Failure reasons                               |
//! |-----------|---------------------------------|-----------------------------------------------|
//! | `bearer`  | `Authorization: Bearer <token>` | `missing bearer token`, `invalid bearer token` |
//! | `api_key` | `x-api-key` header              | `missing x-api-key`, `invalid x-api-key`      |
//!
//! # Chain Semantics
//!
//! [`AuthChain`] tries authenticators in configuration order (bearer first,
//! then static key) and returns the first success. When every authenticator
//! fails, the **last** attempted failure is returned. With the default order
//! that means a request without any credential reports `missing x-api-key`.
//!
//! An empty chain authorizes everything without consulting anyone, but the
//! router never installs the auth middleware in that case anyway.
//!
//! # Timing
//!
//! Secrets are never compared byte by byte. Both sides are hashed with
//! SHA-256 and the fixed-length digests are compared with
//! [`subtle::ConstantTimeEq`], so neither the length of the expected secret
//! nor the length of a matching prefix leaks through response timing.

use std::fmt;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::AuthConfig;
use crate::context::RequestContextExt;

/// Header carrying the static proxy key.
pub const API_KEY_HEADER: &str = "x-api-key";

const BEARER_PREFIX: &[u8] = b"bearer ";

/// Credential scheme identifier, used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthKind {
    ApiKey,
    Bearer,
    /// No scheme configured; only produced by an empty chain.
    None,
}

impl AuthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::ApiKey => "api_key",
            AuthKind::Bearer => "bearer",
            AuthKind::None => "none",
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one request against one scheme (or a chain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub valid: bool,
    pub kind: AuthKind,
    /// Client-safe failure reason; `None` on success.
    pub reason: Option<String>,
}

impl AuthResult {
    pub fn success(kind: AuthKind) -> Self {
        Self {
            valid: true,
            kind,
            reason: None,
        }
    }

    pub fn failure(kind: AuthKind, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            kind,
            reason: Some(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Validator for a single credential scheme.
pub trait Authenticator: Send + Sync {
    fn kind(&self) -> AuthKind;

    fn validate(&self, headers: &HeaderMap) -> AuthResult;
}

/// SHA-256 digest of an expected secret, computed once at construction.
#[derive(Clone)]
struct SecretDigest([u8; 32]);

impl SecretDigest {
    fn of(secret: &[u8]) -> Self {
        Self(Sha256::digest(secret).into())
    }

    fn matches(&self, provided: &[u8]) -> bool {
        let provided = Sha256::digest(provided);
        provided.as_slice().ct_eq(&self.0).into()
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDigest(<redacted>)")
    }
}

/// Validates the `x-api-key` header against a configured key.
#[derive(Debug, Clone)]
pub struct ApiKeyAuthenticator {
    expected: SecretDigest,
}

impl ApiKeyAuthenticator {
    pub fn new(expected_key: &str) -> Self {
        Self {
            expected: SecretDigest::of(expected_key.as_bytes()),
        }
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn kind(&self) -> AuthKind {
        AuthKind::ApiKey
    }

    fn validate(&self, headers: &HeaderMap) -> AuthResult {
        let provided = headers
            .get(API_KEY_HEADER)
            .map(|v| v.as_bytes())
            .filter(|v| !v.is_empty());

        match provided {
            None => AuthResult::failure(self.kind(), format!("missing {API_KEY_HEADER}")),
            Some(key) if self.expected.matches(key) => AuthResult::success(self.kind()),
            Some(_) => AuthResult::failure(self.kind(), format!("invalid {API_KEY_HEADER}")),
        }
    }
}

/// Validates `Authorization: Bearer <token>`.
///
/// Without a configured secret every token is rejected: the relay always
/// presents its own backend key, so an unchecked token would grant access
/// to it.
#[derive(Debug, Clone)]
pub struct BearerAuthenticator {
    expected: Option<SecretDigest>,
}

impl BearerAuthenticator {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            expected: secret
                .filter(|s| !s.is_empty())
                .map(|s| SecretDigest::of(s.as_bytes())),
        }
    }
}

impl Authenticator for BearerAuthenticator {
    fn kind(&self) -> AuthKind {
        AuthKind::Bearer
    }

    fn validate(&self, headers: &HeaderMap) -> AuthResult {
        let Some(token) = extract_bearer_token(headers) else {
            return AuthResult::failure(self.kind(), "missing bearer token");
        };

        match &self.expected {
            Some(expected) if expected.matches(token) => AuthResult::success(self.kind()),
            _ => AuthResult::failure(self.kind(), "invalid bearer token"),
        }
    }
}

/// Extract the token from an `Authorization: Bearer` header.
///
/// The scheme name is matched case-insensitively; any other scheme counts
/// as no bearer token at all.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&[u8]> {
    let value = headers.get(AUTHORIZATION)?.as_bytes();
    let scheme = value.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value.get(BEARER_PREFIX.len()..)?.trim_ascii();
    (!token.is_empty()).then_some(token)
}

/// Ordered set of authenticators.
#[derive(Default)]
pub struct AuthChain {
    authenticators: Vec<Box<dyn Authenticator>>,
}

impl AuthChain {
    pub fn new(authenticators: Vec<Box<dyn Authenticator>>) -> Self {
        Self { authenticators }
    }

    /// Build the chain from configuration.
    ///
    /// Bearer goes first: it is the more specific scheme, and a client that
    /// sends both credentials should be judged on its bearer token.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut authenticators: Vec<Box<dyn Authenticator>> = Vec::new();

        if config.bearer_enabled() {
            authenticators.push(Box::new(BearerAuthenticator::new(
                config.bearer_secret.as_deref(),
            )));
        }

        if let Some(key) = config.api_key.as_deref() {
            authenticators.push(Box::new(ApiKeyAuthenticator::new(key)));
        }

        Self::new(authenticators)
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    /// Configured schemes in attempt order.
    pub fn kinds(&self) -> Vec<AuthKind> {
        self.authenticators.iter().map(|a| a.kind()).collect()
    }

    /// Validate `headers`, logging each attempt under `request_id`.
    pub fn validate(&self, headers: &HeaderMap, request_id: &str) -> AuthResult {
        let mut last_failure = None;

        for authenticator in &self.authenticators {
            let result = authenticator.validate(headers);
            if result.valid {
                debug!(
                    request_id,
                    auth_type = %result.kind,
                    "authentication attempt succeeded"
                );
                return result;
            }

            debug!(
                request_id,
                auth_type = %result.kind,
                reason = result.reason.as_deref().unwrap_or_default(),
                "authentication attempt failed"
            );
            last_failure = Some(result);
        }

        last_failure.unwrap_or_else(|| AuthResult::success(AuthKind::None))
    }

    /// Validate a request, taking the request ID from its context.
    pub fn validate_request<B>(&self, req: &Request<B>) -> AuthResult {
        self.validate(req.headers(), req.request_id())
    }
}

impl fmt::Debug for AuthChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthChain")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use axum::http::HeaderValue;

    use super::*;
    use crate::test_support::LogCapture;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    /// Authenticator that records when it was consulted.
    struct Recording {
        kind: AuthKind,
        inner: Box<dyn Authenticator>,
        log: Arc<Mutex<Vec<AuthKind>>>,
    }

    impl Authenticator for Recording {
        fn kind(&self) -> AuthKind {
            self.kind
        }

        fn validate(&self, headers: &HeaderMap) -> AuthResult {
            self.log.lock().unwrap().push(self.kind);
            self.inner.validate(headers)
        }
    }

    #[test]
    fn test_api_key_valid() {
        let auth = ApiKeyAuthenticator::new("secret-key");
        let result = auth.validate(&headers(&[("x-api-key", "secret-key")]));
        assert_eq!(result, AuthResult::success(AuthKind::ApiKey));
    }

    #[test]
    fn test_api_key_missing_and_empty() {
        let auth = ApiKeyAuthenticator::new("secret-key");

        let result = auth.validate(&HeaderMap::new());
        assert_eq!(result.reason.as_deref(), Some("missing x-api-key"));

        let result = auth.validate(&headers(&[("x-api-key", "")]));
        assert_eq!(result.reason.as_deref(), Some("missing x-api-key"));
    }

    #[test]
    fn test_api_key_invalid_reason_does_not_leak() {
        let auth = ApiKeyAuthenticator::new("secret-key");
        let result = auth.validate(&headers(&[("x-api-key", "secret-kez")]));

        assert!(!result.is_valid());
        assert_eq!(result.reason.as_deref(), Some("invalid x-api-key"));
    }

    #[test]
    fn test_single_bit_mutations_rejected() {
        let secret = "s3cr3t-Key_42";
        let api_key = ApiKeyAuthenticator::new(secret);
        let bearer = BearerAuthenticator::new(Some(secret));

        assert!(api_key.validate(&headers(&[("x-api-key", secret)])).is_valid());
        assert!(
            bearer
                .validate(&headers(&[("authorization", &format!("Bearer {secret}"))]))
                .is_valid()
        );

        for index in 0..secret.len() {
            for bit in 0..8 {
                let mut mutated = secret.as_bytes().to_vec();
                mutated[index] ^= 1 << bit;

                // The digest comparison itself must reject every mutation.
                assert!(!SecretDigest::of(secret.as_bytes()).matches(&mutated));

                // Mutations that are still sendable as a header must fail too.
                let Ok(value) = HeaderValue::from_bytes(&mutated) else {
                    continue;
                };
                let mut map = HeaderMap::new();
                map.insert(API_KEY_HEADER, value);
                assert!(!api_key.validate(&map).is_valid());

                let mut bearer_value = b"Bearer ".to_vec();
                bearer_value.extend_from_slice(&mutated);
                if let Ok(value) = HeaderValue::from_bytes(&bearer_value) {
                    let mut map = HeaderMap::new();
                    map.insert(AUTHORIZATION, value);
                    assert!(!bearer.validate(&map).is_valid());
                }
            }
        }
    }

    #[test]
    fn test_bearer_token_extraction() {
        let map = headers(&[("authorization", "bearer   tok-1  ")]);
        assert_eq!(extract_bearer_token(&map), Some(&b"tok-1"[..]));

        let map = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_bearer_token(&map), None);

        let map = headers(&[("authorization", "Bearer ")]);
        assert_eq!(extract_bearer_token(&map), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_with_secret() {
        let auth = BearerAuthenticator::new(Some("tok-secret"));

        assert!(
            auth.validate(&headers(&[("authorization", "Bearer tok-secret")]))
                .is_valid()
        );

        let result = auth.validate(&headers(&[("authorization", "Bearer tok-wrong")]));
        assert_eq!(result.reason.as_deref(), Some("invalid bearer token"));

        let result = auth.validate(&HeaderMap::new());
        assert_eq!(result.reason.as_deref(), Some("missing bearer token"));
    }

    #[test]
    fn test_bearer_without_secret_rejects_every_token() {
        for secret in [None, Some("")] {
            let auth = BearerAuthenticator::new(secret);

            let result = auth.validate(&headers(&[("authorization", "Bearer anything")]));
            assert!(!result.is_valid());
            assert_eq!(result.reason.as_deref(), Some("invalid bearer token"));

            assert!(!auth.validate(&HeaderMap::new()).is_valid());
        }
    }

    #[test]
    fn test_empty_chain_accepts_everything() {
        let chain = AuthChain::default();
        assert!(chain.is_empty());

        for map in [
            HeaderMap::new(),
            headers(&[("x-api-key", "whatever")]),
            headers(&[("authorization", "Bearer nope")]),
        ] {
            let result = chain.validate(&map, "req-1");
            assert_eq!(result, AuthResult::success(AuthKind::None));
        }
    }

    #[test]
    fn test_chain_falls_through_to_api_key_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = AuthChain::new(vec![
            Box::new(Recording {
                kind: AuthKind::Bearer,
                inner: Box::new(BearerAuthenticator::new(Some("bearer-secret"))),
                log: log.clone(),
            }),
            Box::new(Recording {
                kind: AuthKind::ApiKey,
                inner: Box::new(ApiKeyAuthenticator::new("static-secret")),
                log: log.clone(),
            }),
        ]);

        let result = chain.validate(&headers(&[("x-api-key", "static-secret")]), "req-1");

        assert_eq!(result, AuthResult::success(AuthKind::ApiKey));
        assert_eq!(*log.lock().unwrap(), vec![AuthKind::Bearer, AuthKind::ApiKey]);
        assert_eq!(chain.kinds(), vec![AuthKind::Bearer, AuthKind::ApiKey]);
    }

    #[test]
    fn test_chain_stops_at_first_success() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = AuthChain::new(vec![
            Box::new(Recording {
                kind: AuthKind::Bearer,
                inner: Box::new(BearerAuthenticator::new(Some("bearer-secret"))),
                log: log.clone(),
            }),
            Box::new(Recording {
                kind: AuthKind::ApiKey,
                inner: Box::new(ApiKeyAuthenticator::new("static-secret")),
                log: log.clone(),
            }),
        ]);

        let result = chain.validate(
            &headers(&[("authorization", "Bearer bearer-secret")]),
            "req-1",
        );

        assert_eq!(result.kind, AuthKind::Bearer);
        assert_eq!(*log.lock().unwrap(), vec![AuthKind::Bearer]);
    }

    #[test]
    fn test_chain_reports_last_failure() {
        let chain = AuthChain::new(vec![
            Box::new(BearerAuthenticator::new(Some("bearer-secret"))),
            Box::new(ApiKeyAuthenticator::new("static-secret")),
        ]);

        // A wrong bearer token and no static key: the static key scheme is
        // tried last, so its reason is what the client sees.
        let result = chain.validate(&headers(&[("authorization", "Bearer wrong")]), "req-1");
        assert!(!result.is_valid());
        assert_eq!(result.kind, AuthKind::ApiKey);
        assert_eq!(result.reason.as_deref(), Some("missing x-api-key"));

        let result = chain.validate(&headers(&[("x-api-key", "wrong")]), "req-2");
        assert_eq!(result.reason.as_deref(), Some("invalid x-api-key"));
    }

    #[test]
    fn test_from_config_orders_bearer_first() {
        let config = AuthConfig {
            api_key: Some("static".to_string()),
            allow_bearer: true,
            bearer_secret: Some("bearer".to_string()),
        };
        let chain = AuthChain::from_config(&config);
        assert_eq!(chain.kinds(), vec![AuthKind::Bearer, AuthKind::ApiKey]);

        let chain = AuthChain::from_config(&AuthConfig::default());
        assert!(chain.is_empty());
    }

    #[test]
    fn test_every_attempt_logged_without_credentials() {
        let capture = LogCapture::default();
        let _guard = capture.install();

        let chain = AuthChain::new(vec![
            Box::new(BearerAuthenticator::new(Some("bearer-secret"))),
            Box::new(ApiKeyAuthenticator::new("static-secret")),
        ]);

        let failed = chain.validate(
            &headers(&[
                ("authorization", "Bearer wrong-bearer-value"),
                ("x-api-key", "wrong-key-value"),
            ]),
            "req-fail",
        );
        assert!(!failed.is_valid());

        let passed = chain.validate(&headers(&[("x-api-key", "static-secret")]), "req-pass");
        assert!(passed.is_valid());

        let attempts: Vec<_> = capture
            .records()
            .into_iter()
            .filter(|r| r["level"] == "DEBUG")
            .collect();
        assert_eq!(attempts.len(), 4);

        let seen: Vec<(&str, &str)> = attempts
            .iter()
            .map(|r| {
                (
                    r["fields"]["request_id"].as_str().unwrap(),
                    r["fields"]["auth_type"].as_str().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            seen,
            vec![
                ("req-fail", "bearer"),
                ("req-fail", "api_key"),
                ("req-pass", "bearer"),
                ("req-pass", "api_key"),
            ]
        );

        let raw = capture.raw();
        for secret in [
            "bearer-secret",
            "static-secret",
            "wrong-bearer-value",
            "wrong-key-value",
        ] {
            assert!(!raw.contains(secret), "{secret} leaked into logs");
        }
    }

    #[test]
    fn test_validate_request_uses_context_id() {
        let chain = AuthChain::new(vec![Box::new(ApiKeyAuthenticator::new("k"))]);
        let req = Request::builder()
            .header("x-api-key", "k")
            .body(())
            .unwrap();
        assert!(chain.validate_request(&req).is_valid());
    }

    /// Median wall time of `iterations` validations of `candidate`.
    fn median_validation_time(auth: &ApiKeyAuthenticator, candidate: &str) -> Duration {
        let map = headers(&[("x-api-key", candidate)]);
        let mut samples: Vec<Duration> = (0..2_001)
            .map(|_| {
                let start = Instant::now();
                let result = auth.validate(std::hint::black_box(&map));
                std::hint::black_box(result);
                start.elapsed()
            })
            .collect();
        samples.sort();
        samples[samples.len() / 2]
    }

    #[test]
    fn test_comparison_time_independent_of_matching_prefix() {
        let secret = "k".repeat(64);
        let auth = ApiKeyAuthenticator::new(&secret);

        let no_match = format!("x{}", "k".repeat(63));
        let long_prefix = format!("{}x", "k".repeat(63));

        // Warm up caches and branch predictors.
        median_validation_time(&auth, &no_match);

        let t_none = median_validation_time(&auth, &no_match).as_nanos().max(1);
        let t_prefix = median_validation_time(&auth, &long_prefix).as_nanos().max(1);

        // Loose statistical bound: medians stay within a small factor of each
        // other regardless of how many leading bytes match.
        let ratio = t_prefix.max(t_none) as f64 / t_prefix.min(t_none) as f64;
        assert!(ratio < 5.0, "timing ratio {ratio} too large");
    }
}
