//! Chat Gateway - Main entry point
//!
//! Loads configuration from the environment, builds the gateway, and serves
//! the HTTP API until interrupted.

use anyhow::{Context, Result};
use chat_gateway::{
    build_router,
    core::{init_logging, init_metrics},
    AppState, Gateway, GatewayConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;

fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(worker_threads) = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
    {
        builder.worker_threads(worker_threads);
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    init_logging();
    init_metrics();

    let config = GatewayConfig::from_env()?;
    let bind = (config.server.host.clone(), config.server.port);

    if config.mock_mode {
        tracing::warn!("Mock mode enabled: completions are answered locally and auth is bypassed");
    }
    if config.upstream.api_key.is_none() && !config.mock_mode {
        tracing::warn!("GROK_KEY is not set; completion requests will fail with server_error");
    }
    tracing::info!(
        upstream = %config.upstream.url,
        timeout_secs = config.upstream.timeout_secs,
        auth_enabled = config.auth.api_token.is_some(),
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Gateway configured"
    );

    let gateway = Gateway::new(config)?;
    let state = Arc::new(AppState::new(gateway));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((bind.0.as_str(), bind.1))
        .await
        .with_context(|| format!("Failed to bind {}:{}", bind.0, bind.1))?;
    tracing::info!("Starting chat gateway on {}", listener.local_addr()?);
    tracing::info!("Completions: /completions, /api/v1/chat/completions");
    tracing::info!("Health: /health, /api/v1/chat/health");
    tracing::info!("Metrics endpoint: /metrics");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
