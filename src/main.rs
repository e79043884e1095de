use anyhow::{anyhow, Context, Result};
use tracing::info;

use recital::telemetry;
use recital::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    telemetry::init_tracing("recital", config.otlp_endpoint.as_deref())
        .map_err(|e| anyhow!("failed to initialize tracing: {}", e))?;

    tokio::fs::create_dir_all(config.static_dir.join("uploads"))
        .await
        .with_context(|| format!("failed to create {}", config.static_dir.display()))?;

    let app = recital::build_app(&config);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    info!(
        bind = %config.bind,
        model = %config.model,
        ollama = %config.ollama_url,
        static_dir = %config.static_dir.display(),
        "Recital listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if config.otlp_endpoint.is_some() {
        telemetry::shutdown_tracing();
    }
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
