//! Shared application state for Axum handlers.
//!
//! Everything here is built once at startup and never mutated afterwards:
//! the provider, the backend key, and the outbound HTTP client are shared by
//! reference across all request tasks without locking.

use std::sync::Arc;

use axum::http::HeaderMap;
use reqwest::Url;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::providers::Provider;

/// Shared application state for Axum handlers.
///
/// Cloned per request; all fields are `Arc`s or cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Active backend provider
    pub provider: Arc<dyn Provider>,
    /// Outbound client, connection-pooled
    pub http: reqwest::Client,
    /// Resolved `<base>/v1/messages` endpoint
    pub messages_url: Url,
}

impl AppState {
    /// Build state for `provider`, creating the outbound HTTP client.
    ///
    /// Only the connect phase is bounded; response streams may legitimately
    /// run for minutes.
    ///
    /// The backend key is applied once to a scratch header map, so a key the
    /// provider cannot send fails here rather than on every request.
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> AppResult<Self> {
        let messages_url = provider.messages_url()?;

        provider
            .authenticate(&mut HeaderMap::new(), &config.provider.api_key)
            .map_err(|e| AppError::ConfigError(format!("Invalid PROVIDER_API_KEY: {e}")))?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.upstream_connect_timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        info!(
            provider = provider.name(),
            upstream = %messages_url,
            streaming = provider.supports_streaming(),
            "Upstream provider configured"
        );

        Ok(Self {
            config: Arc::new(config),
            provider,
            http,
            messages_url,
        })
    }

    /// Key the relay presents to the backend.
    pub fn backend_key(&self) -> &str {
        &self.config.provider.api_key
    }
}
