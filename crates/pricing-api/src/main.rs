//! House price prediction service
//!
//! Binds the HTTP listener first, then loads the fitted pipeline. Requests
//! arriving before the load completes get 503.

use anyhow::{Context, Result};
use pricing_api::{api, config::ServerConfig, startup};
use pricing_lib::{
    observability::{ServiceMetrics, StructuredLogger},
    ModelSlot, PipelineConfig,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let server = ServerConfig::load()?;
    let pipeline = PipelineConfig::load(&server.config_path)
        .with_context(|| format!("loading {}", server.config_path.display()))?;
    info!(config = %server.config_path.display(), "Service configured");

    let logger = StructuredLogger::new("pricing-api");
    let state = Arc::new(api::AppState::new(
        ServiceMetrics::new(),
        logger.clone(),
        ModelSlot::new(),
        pipeline.metrics_path(),
    ));

    let addr = server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    logger.log_startup(api::SERVICE_VERSION, &addr);

    let mut server_handle = tokio::spawn(api::serve(listener, state.clone()));

    if let Err(err) =
        startup::load_into(&state, pipeline.model_path(), pipeline.descriptor_path()).await
    {
        error!(error = %format!("{err:#}"), "Startup failed");
        logger.log_shutdown("model load failed");
        server_handle.abort();
        return Err(err);
    }

    tokio::select! {
        result = &mut server_handle => {
            result.context("server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
