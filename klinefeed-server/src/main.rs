use anyhow::Context;
use klinefeed_core::config::AppConfig;
use klinefeed_core::logging::init_tracing;
use klinefeed_server::{app_router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Optional path to a TOML config file.
const CONFIG_ENV: &str = "KLINEFEED_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())
        .with_context(|| format!("loading configuration ({CONFIG_ENV}={config_path:?})"))?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .context("invalid bind address")?;

    // Blocking HTTP clients are built and warmed off the runtime.
    let state = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let state = AppState::from_config(config)?;
        match state.model.load() {
            Ok(()) => tracing::info!(model = state.model.name(), "model loaded"),
            Err(e) => tracing::warn!(
                model = state.model.name(),
                error = %e,
                "model not loaded at startup; train it via /update-model/"
            ),
        }
        Ok(state)
    })
    .await??;

    let app = app_router(state);

    tracing::info!("klinefeed server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully stopping");
}
