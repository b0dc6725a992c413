use anyhow::Context;

use jobqueue_api::app::{build_app, services};
use jobqueue_engine::EngineConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobqueue_observability::init();

    let config = EngineConfig::from_env();
    let engine = services::build_engine(config).context("invalid engine configuration")?;
    engine.start().context("failed to start job workers")?;

    let app = build_app(engine.clone());

    let addr = std::env::var("JOBQUEUE_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    // Drains queued jobs; blocks until workers exit.
    tokio::task::spawn_blocking(move || engine.stop())
        .await
        .context("engine shutdown failed")?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutdown signal received");
}
