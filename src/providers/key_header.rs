//! Shared adapter for backends that take an API key in a request header.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use tracing::debug;

use super::{Provider, ProviderError, ProviderKind};

/// Static description of a key-in-header backend.
#[derive(Debug)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    /// Used when the configured base URL is empty.
    pub default_base_url: &'static str,
    /// Lowercase header that carries the backend key.
    pub auth_header: &'static str,
    /// Lowercase prefix of client headers forwarded to the backend.
    pub forward_prefix: &'static str,
    pub supports_streaming: bool,
}

/// Provider implementation driven entirely by a [`ProviderProfile`].
#[derive(Debug, Clone)]
pub struct KeyHeaderProvider {
    profile: &'static ProviderProfile,
    name: String,
    base_url: Url,
}

impl KeyHeaderProvider {
    /// Create a provider, resolving an empty base URL to the profile default.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidBaseUrl`] if the URL does not parse as
    /// an absolute `http`/`https` URL.
    pub fn new(
        profile: &'static ProviderProfile,
        name: &str,
        base_url: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let raw = base_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(profile.default_base_url);

        let base_url = Url::parse(raw).map_err(|e| ProviderError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", base_url.scheme()),
            });
        }

        let name = if name.trim().is_empty() {
            profile.kind.as_str().to_string()
        } else {
            name.trim().to_string()
        };

        Ok(Self {
            profile,
            name,
            base_url,
        })
    }
}

impl Provider for KeyHeaderProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn authenticate(&self, headers: &mut HeaderMap, key: &str) -> Result<(), ProviderError> {
        let mut value = HeaderValue::from_str(key).map_err(|_| ProviderError::InvalidHeaderValue {
            header: self.profile.auth_header,
        })?;
        value.set_sensitive(true);

        headers.insert(HeaderName::from_static(self.profile.auth_header), value);

        debug!(provider = %self.name, "added authentication header");
        Ok(())
    }

    fn forward_headers(&self, original: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();

        // Header names are stored lowercase, so a lowercase prefix match is
        // already case-insensitive with respect to what the client sent.
        for (name, value) in original {
            if name.as_str().starts_with(self.profile.forward_prefix) {
                headers.append(name.clone(), value.clone());
            }
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn supports_streaming(&self) -> bool {
        self.profile.supports_streaming
    }
}
