//! Local prediction with the saved model

use anyhow::{Context, Result};
use pricing_lib::{artifacts, PipelineConfig};
use serde_json::{json, Value};
use std::path::Path;

use crate::output::{format_value, print_info, print_json, print_success, OutputFormat};
use crate::PayloadSource;

/// Read the payload from `--file`, or the built-in sample.
pub fn load_payload(source: &PayloadSource) -> Result<Value> {
    match &source.file {
        Some(path) => read_payload_file(path),
        None => Ok(Value::Object(pricing_lib::sample_payload())),
    }
}

fn read_payload_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Payload file {} is not valid JSON", path.display()))
}

/// Predict one row with the model under `artifacts_dir`.
///
/// With `--sample` the request and response are also written to the
/// configured sample artifact paths.
pub fn predict_local(cfg: &PipelineConfig, source: &PayloadSource, format: OutputFormat) -> Result<()> {
    let loaded = artifacts::load_model(&cfg.model_path(), &cfg.descriptor_path())
        .context("Failed to load model")?;
    let payload = load_payload(source)?;

    let result = loaded.context.predict(&payload)?;
    let response = json!({
        "prediction": result.prediction,
        "expected_features": loaded.context.schema(),
        "generated_at_utc": result.generated_at,
    });

    if source.sample {
        let request_path = cfg.sample_request_path();
        let response_path = cfg.sample_response_path();
        artifacts::write_json(&request_path, &payload)?;
        artifacts::write_json(&response_path, &response)?;
        if let OutputFormat::Table = format {
            print_info(&format!(
                "Sample request and response written to {} and {}",
                request_path.display(),
                response_path.display()
            ));
        }
    }

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!("Prediction: {}", format_value(result.prediction)));
        }
    }

    Ok(())
}
