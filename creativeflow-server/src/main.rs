//! Binary entry point for the creativeflow HTTP server.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, rust_2018_idioms)]

use anyhow::Context;
use tracing::info;

use creativeflow::config::PipelineConfig;
use creativeflow::observability::{init_tracing, LogFormat};
use creativeflow::pipeline::CreativePipeline;
use creativeflow_server::{router, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let format = match std::env::var("LOG_FORMAT") {
        Ok(value) => value.parse::<LogFormat>()?,
        Err(_) => LogFormat::default(),
    };
    init_tracing(format)?;

    let pipeline_config = PipelineConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    info!(
        model = %pipeline_config.model.model,
        retry_attempts = pipeline_config.retry.max_attempts,
        "Pipeline configured"
    );

    let pipeline = CreativePipeline::from_config(pipeline_config)?;
    let listener = tokio::net::TcpListener::bind(server_config.addr())
        .await
        .with_context(|| format!("binding {}", server_config.addr()))?;
    info!(addr = %server_config.addr(), "Listening");

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
