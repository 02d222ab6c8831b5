//! Binary entry point for the mcpgate server.

use anyhow::{Context, Result};
use clap::Parser;
use mcpgate::{Config, router};
use mcpgate_auth::auth::ValidatorAdapter;
use mcpgate_auth::auth::jwt::JwksProvider;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let validator =
        ValidatorAdapter::initialize(&config.provider_settings(), JwksProvider::connect);
    let app = router(&config, validator);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(
        server = %config.server_name,
        version = %config.server_version,
        "listening on http://{bind_addr} (MCP at /)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::error!("failed to listen for ctrl_c: {e}");
            std::future::pending::<()>().await;
        }
    }
}
