//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with defaults
//! suited to running the relay next to a local client. A `.env` file is
//! loaded first if present.
//!
//! # Inbound Authentication
//!
//! - `PROXY_API_KEY`: enables static-key auth via the `x-api-key` header
//! - `PROXY_ALLOW_BEARER`: enables `Authorization: Bearer` auth; requires
//!   `PROXY_BEARER_SECRET`
//! - `PROXY_BEARER_SECRET`: bearer secret (implies `PROXY_ALLOW_BEARER`)
//!
//! With none of these set, the relay accepts every request.
//!
//! # Backend Provider
//!
//! - `PROVIDER_TYPE`: `anthropic` (default) or `zai`
//! - `PROVIDER_NAME`: label for logs and metrics (default: the type)
//! - `PROVIDER_BASE_URL`: override the provider's default endpoint
//! - `PROVIDER_API_KEY`: key sent to the backend (required, must be a valid
//!   header value)

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;

use crate::error::{AppError, AppResult};
use crate::providers::ProviderKind;

/// Default maximum request body size (32 MiB). Conversations with images
/// get large quickly.
pub const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 32 * 1024 * 1024;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

/// Credentials clients must present to the relay.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Static key expected in `x-api-key`.
    pub api_key: Option<String>,
    /// Accept `Authorization: Bearer` tokens.
    pub allow_bearer: bool,
    /// Expected bearer token. Bearer auth without one rejects every token.
    pub bearer_secret: Option<String>,
}

impl AuthConfig {
    pub fn bearer_enabled(&self) -> bool {
        self.allow_bearer || self.bearer_secret.is_some()
    }

    /// True when at least one inbound scheme is configured.
    pub fn enabled(&self) -> bool {
        self.api_key.is_some() || self.bearer_enabled()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("allow_bearer", &self.allow_bearer)
            .field(
                "bearer_secret",
                &self.bearer_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// The backend the relay forwards to.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub name: String,
    /// `None` selects the provider's default endpoint.
    pub base_url: Option<String>,
    pub api_key: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Relay will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server bind address, IPv4 or IPv6 (default: 127.0.0.1)
    pub host: IpAddr,

    /// Server port (default: 8787)
    pub port: u16,

    /// Maximum request body size in bytes (default: 32 MiB)
    pub max_request_body_size: usize,

    // =========================================================================
    // Backend Configuration
    // =========================================================================
    pub provider: ProviderConfig,

    /// Timeout for establishing the upstream connection (default: 10s).
    /// There is no total timeout: streamed responses can run for minutes.
    pub upstream_connect_timeout: Duration,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    pub auth: AuthConfig,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level filter (e.g., "info", "llm_relay=debug")
    pub log_level: String,

    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a value fails to parse, a required
    /// variable is missing, or validation fails.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let kind: ProviderKind = match var("PROVIDER_TYPE") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid PROVIDER_TYPE: {e}")))?,
            None => ProviderKind::Anthropic,
        };

        let provider = ProviderConfig {
            kind,
            name: var("PROVIDER_NAME").unwrap_or_else(|| kind.as_str().to_string()),
            base_url: var("PROVIDER_BASE_URL"),
            api_key: var("PROVIDER_API_KEY").ok_or_else(|| {
                AppError::ConfigError("PROVIDER_API_KEY must be set".to_string())
            })?,
        };

        let auth = AuthConfig {
            api_key: var("PROXY_API_KEY"),
            allow_bearer: Self::parse_var(&var, "PROXY_ALLOW_BEARER", false)?,
            bearer_secret: var("PROXY_BEARER_SECRET"),
        };

        let config = Self {
            // Server
            host: Self::parse_var(&var, "HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: Self::parse_var(&var, "PORT", 8787)?,
            max_request_body_size: Self::parse_var(
                &var,
                "MAX_REQUEST_BODY_SIZE",
                DEFAULT_MAX_REQUEST_BODY_SIZE,
            )?,

            // Backend
            provider,
            upstream_connect_timeout: Duration::from_secs(Self::parse_var(
                &var,
                "UPSTREAM_CONNECT_TIMEOUT_SECS",
                10,
            )?),

            // Security
            auth,

            // Observability
            log_level: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format: Self::parse_var(&var, "LOG_FORMAT", LogFormat::Text)?,
            metrics_port: Self::parse_var(&var, "METRICS_PORT", 0)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.upstream_connect_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "UPSTREAM_CONNECT_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.provider.api_key.trim().is_empty() {
            return Err(AppError::ConfigError(
                "PROVIDER_API_KEY must not be empty".to_string(),
            ));
        }

        if HeaderValue::from_str(&self.provider.api_key).is_err() {
            return Err(AppError::ConfigError(
                "PROVIDER_API_KEY contains characters not allowed in an HTTP header".to_string(),
            ));
        }

        if self.auth.allow_bearer && self.auth.bearer_secret.is_none() {
            return Err(AppError::ConfigError(
                "PROXY_ALLOW_BEARER requires PROXY_BEARER_SECRET".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Check if inbound authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.auth.enabled()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_enabled()
            .then(|| SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse a variable into the specified type with a default value.
    fn parse_var<T, F>(var: &F, name: &str, default: T) -> AppResult<T>
    where
        F: Fn(&str) -> Option<String>,
        T: FromStr,
        T::Err: fmt::Display,
    {
        match var(name) {
            Some(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            None => Ok(default),
        }
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8787,
            max_request_body_size: DEFAULT_MAX_REQUEST_BODY_SIZE,
            provider: ProviderConfig {
                kind: ProviderKind::Anthropic,
                name: "anthropic".to_string(),
                base_url: None,
                api_key: "test-backend-key".to_string(),
            },
            upstream_connect_timeout: Duration::from_secs(10),
            auth: AuthConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_port: 0,
        }
    }
}
