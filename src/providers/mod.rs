//! Backend provider abstraction.
//!
//! A [`Provider`] describes one backend that speaks (a variant of) the
//! Messages API: where it lives, how it wants to be authenticated, which
//! client headers it accepts, and whether it can stream.
//!
//! # Built-in Providers
//!
//! | Kind        | Default base URL                  | Auth header |
//! |-------------|-----------------------------------|-------------|
//! | `anthropic` | `https://api.anthropic.com`       | `x-api-key` |
//! | `zai`       | `https://api.z.ai/api/anthropic`  | `x-api-key` |
//!
//! Both share the key-in-header convention, so they are the same
//! [`KeyHeaderProvider`] type parameterized by a [`ProviderProfile`].
//!
//! # Lifecycle
//!
//! Providers are built once at startup by [`build_provider`] and shared as
//! `Arc<dyn Provider>`. They hold no mutable state, so concurrent requests
//! read them without synchronization.

pub mod anthropic;
pub mod key_header;
pub mod zai;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::HeaderMap;
use reqwest::Url;
use thiserror::Error;

pub use key_header::{KeyHeaderProvider, ProviderProfile};

/// Errors raised while constructing or using a provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unknown provider type '{0}' (expected one of: anthropic, zai)")]
    UnknownKind(String),

    #[error("backend key is not a valid value for header '{header}'")]
    InvalidHeaderValue { header: &'static str },
}

/// Capability interface every backend integration implements.
///
/// Call sites only ever see `dyn Provider`; nothing downcasts to a concrete
/// type.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Short label used in logs and metrics.
    fn name(&self) -> &str;

    /// Absolute base URL of the backend API.
    fn base_url(&self) -> &Url;

    /// Inject backend credentials for `key` into outbound `headers`.
    ///
    /// Only mutates headers. Calling it twice with the same key leaves the
    /// same result.
    fn authenticate(&self, headers: &mut HeaderMap, key: &str) -> Result<(), ProviderError>;

    /// Build the outbound header set from the client's headers.
    ///
    /// This is an allow-list: anything not explicitly accepted by the
    /// provider is dropped.
    fn forward_headers(&self, original: &HeaderMap) -> HeaderMap;

    /// Whether the backend can produce server-sent event streams.
    fn supports_streaming(&self) -> bool;

    /// Full URL of the Messages endpoint on this backend.
    fn messages_url(&self) -> Result<Url, ProviderError> {
        let base = self.base_url().as_str().trim_end_matches('/');
        let url = format!("{base}/v1/messages");
        Url::parse(&url).map_err(|e| ProviderError::InvalidBaseUrl {
            url,
            reason: e.to_string(),
        })
    }
}

/// Supported provider kinds, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    Zai,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Zai => "zai",
        }
    }

    fn profile(&self) -> &'static ProviderProfile {
        match self {
            ProviderKind::Anthropic => &anthropic::PROFILE,
            ProviderKind::Zai => &zai::PROFILE,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "zai" | "z.ai" => Ok(ProviderKind::Zai),
            other => Err(ProviderError::UnknownKind(other.to_string())),
        }
    }
}

/// Build the provider for `kind`.
///
/// An empty or missing `base_url` resolves to the kind's default here, at
/// construction, so no request ever sees an unresolved endpoint.
pub fn build_provider(
    kind: ProviderKind,
    name: &str,
    base_url: Option<&str>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider = KeyHeaderProvider::new(kind.profile(), name, base_url)?;
    Ok(Arc::new(provider))
}
