use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};

use llm_relay::config::LogFormat;
use llm_relay::{AppState, Config, build_provider, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration; logging format depends on it
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            utils::init_tracing(LogFormat::Text, "info");
            error!("Configuration error: {e}");
            return Err(exitcode::CONFIG);
        }
    };
    utils::init_tracing(config.log_format, &config.log_level);

    info!("Starting LLM Relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.host,
        port = %config.port,
        provider = %config.provider.kind,
        auth_enabled = config.auth_enabled(),
        "Configuration loaded"
    );

    // Build provider, state and router
    let provider = build_provider(
        config.provider.kind,
        &config.provider.name,
        config.provider.base_url.as_deref(),
    )
    .map_err(|e| {
        error!("Invalid provider configuration: {e}");
        exitcode::CONFIG
    })?;

    let metrics_addr = config.metrics_addr();
    let addr = config.server_addr();

    let state = AppState::new(config, provider).map_err(|e| {
        error!("Failed to build application state: {e}");
        exitcode::CONFIG
    })?;
    let app = build_router(state);

    if let Some(addr) = metrics_addr {
        metrics::try_init_metrics(addr);
    }

    // Start server
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health        - Health check");
    info!("  POST /v1/messages   - Relay to the backend provider");

    // Start server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}
