//! One-time model loading after the listener is bound

use crate::api::AppState;
use anyhow::{Context, Result};
use pricing_lib::{artifacts::load_model, health::Component};
use std::path::PathBuf;

/// Load the fitted pipeline on a blocking thread and install it.
///
/// Failure marks the model loader unhealthy and is returned so the caller
/// can stop the process; the slot stays empty so readiness stays false.
pub async fn load_into(state: &AppState, model_path: PathBuf, descriptor_path: PathBuf) -> Result<()> {
    if state.metrics_path.is_file() {
        state
            .health_registry
            .set_healthy(Component::MetricsStore)
            .await;
    } else {
        state
            .health_registry
            .set_degraded(Component::MetricsStore, "metrics.json not found")
            .await;
    }

    let load_path = model_path.clone();
    let loaded = tokio::task::spawn_blocking(move || load_model(&load_path, &descriptor_path))
        .await
        .context("model loading task panicked")?;

    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            state.logger.log_model_load_failed(&model_path, &err);
            state
                .health_registry
                .set_unhealthy(Component::ModelLoader, err.to_string())
                .await;
            return Err(err).context("failed to load model");
        }
    };

    let features = loaded.context.schema().features().to_vec();
    let checksum = loaded.descriptor.as_ref().map(|d| d.model_sha256.clone());
    if !state.model.install(loaded.context) {
        anyhow::bail!("a model is already installed");
    }

    state.metrics.set_model_loaded(features.len());
    state
        .logger
        .log_model_loaded(&loaded.model_path, &features, checksum.as_deref());
    state
        .health_registry
        .set_healthy(Component::ModelLoader)
        .await;
    Ok(())
}
