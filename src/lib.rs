//! # LLM Relay
//!
//! An authenticating relay for the Anthropic Messages API. Clients talk to
//! the relay with a relay-issued credential; the relay forwards the call to
//! a configured backend provider with the backend's own key, streaming
//! server-sent events straight through.
//!
//! - **Providers**: Anthropic and Z.ai behind one `dyn Provider` interface
//! - **Security**: bearer / static-key chain, digest-based constant-time comparison
//! - **Observability**: request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pipeline (Request ID → Logging → Recover → Auth)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, messages relay)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Provider (header allow-list, backend credential)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Backend Messages API (HTTP / SSE)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_relay::{AppState, Config, build_provider, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let provider = build_provider(
//!         config.provider.kind,
//!         &config.provider.name,
//!         config.provider.base_url.as_deref(),
//!     )?;
//!
//!     let state = AppState::new(config, provider)?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! ```bash
//! PROVIDER_API_KEY=sk-backend PROXY_API_KEY=relay-secret cargo run
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod providers;
pub mod routes;
pub mod state;
pub mod streaming;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use auth::{AuthChain, AuthKind, AuthResult, Authenticator};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use middleware::Pipeline;
pub use providers::{Provider, ProviderKind, build_provider};
pub use routes::{build_router, build_router_with};
pub use state::AppState;
pub use streaming::{is_streaming_request, set_sse_headers};
