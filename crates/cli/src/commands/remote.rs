//! Commands that call a running prediction API

use anyhow::Result;
use colored::Colorize;
use serde_json::{Map, Value};

use crate::client::{ApiClient, HealthSummary, PredictResponse, SchemaResponse};
use crate::commands::predict::load_payload;
use crate::output::{
    color_status, format_value, print_json, print_rows, print_success, FieldRow, OutputFormat,
};
use crate::PayloadSource;

/// Request a prediction from the API
pub async fn predict(client: &ApiClient, source: &PayloadSource, format: OutputFormat) -> Result<()> {
    let payload = load_payload(source)?;
    let result: PredictResponse = client.post("predict", &payload).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&format!("Prediction: {}", format_value(result.prediction)));
        }
    }

    Ok(())
}

/// Show the features the served model expects, in order
pub async fn schema(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: SchemaResponse = client.get("schema").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Expected Features".bold());
            let rows: Vec<FieldRow> = result
                .expected_features
                .iter()
                .enumerate()
                .map(|(i, name)| FieldRow::new(format!("{}", i + 1), name))
                .collect();
            print_rows(&rows);
        }
    }

    Ok(())
}

pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: HealthSummary = client.get("health").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let model = if result.pipeline_loaded {
                "loaded"
            } else {
                "not loaded"
            };
            print_rows(&[
                FieldRow::new("Status", color_status(&result.status)),
                FieldRow::new("Model", color_status(model)),
                FieldRow::new("Expected features", result.expected_features_count),
                FieldRow::new("Metrics available", result.metrics_available),
                FieldRow::new("Time (UTC)", &result.time_utc),
            ]);
        }
    }

    Ok(())
}

/// Show the training metrics of the served model
pub async fn metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Map<String, Value> = client.get("metrics").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Training Metrics".bold());
            let rows: Vec<FieldRow> = result
                .iter()
                .map(|(key, value)| match value {
                    Value::Number(n) if n.is_f64() => {
                        FieldRow::new(key.as_str(), format_value(n.as_f64().unwrap_or(f64::NAN)))
                    }
                    Value::String(s) => FieldRow::new(key.as_str(), s),
                    other => FieldRow::new(key.as_str(), other),
                })
                .collect();
            print_rows(&rows);
        }
    }

    Ok(())
}
