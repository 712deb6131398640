//! Prediction orchestration
//!
//! Validates a payload against the expected schema, runs the opaque
//! pipeline on a single-row batch and classifies any failure.

use super::PipelineArtifact;
use crate::error::PredictError;
use crate::models::PredictionResult;
use crate::schema::ExpectedSchema;
use crate::validation::build_request_row_from_value;
use anyhow::anyhow;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Predict a single value for `payload`.
///
/// Availability is checked before any validation: an absent pipeline or
/// schema yields [`PredictError::NotReady`]. Validation failures are client
/// errors; anything raised by the pipeline itself is a runtime error.
pub fn predict(
    pipeline: Option<&dyn PipelineArtifact>,
    schema: Option<&ExpectedSchema>,
    payload: &Value,
) -> Result<PredictionResult, PredictError> {
    let (pipeline, schema) = match (pipeline, schema) {
        (Some(p), Some(s)) if !s.is_empty() => (p, s),
        _ => return Err(PredictError::NotReady),
    };

    let request = build_request_row_from_value(payload, schema)?;

    let start = Instant::now();
    let outputs = pipeline
        .predict(&request.to_batch())
        .map_err(PredictError::runtime)?;

    let prediction = match outputs.first() {
        Some(value) if value.is_finite() => *value,
        Some(value) => {
            return Err(PredictError::runtime(anyhow!(
                "pipeline produced a non-finite prediction: {value}"
            )))
        }
        None => {
            return Err(PredictError::runtime(anyhow!(
                "pipeline returned no output for a single-row batch"
            )))
        }
    };

    debug!(elapsed_us = start.elapsed().as_micros() as u64, "Inference completed");

    Ok(PredictionResult {
        prediction,
        generated_at: chrono::Utc::now(),
    })
}
