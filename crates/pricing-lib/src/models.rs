//! Core data models for the house price pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Column-named batch of numeric rows handed to a pipeline.
///
/// NaN marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Arc<[String]>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(columns: Arc<[String]>, rows: Vec<Vec<f64>>) -> Self {
        Self { columns, rows }
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// A single row aligned to the expected schema, all values present.
///
/// This is the only form ever passed to a pipeline's `predict`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    columns: Arc<[String]>,
    values: Vec<f64>,
}

impl PredictionRequest {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<f64>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// One-row batch in schema order.
    pub fn to_batch(&self) -> FeatureMatrix {
        FeatureMatrix::new(self.columns.clone(), vec![self.values.clone()])
    }
}

/// Outcome of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: f64,
    pub generated_at: DateTime<Utc>,
}

/// Model quality summary written next to the model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub model_type: String,
    pub ridge_alpha: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_count: usize,
    pub target_column: String,
    pub generated_at_utc: DateTime<Utc>,
}

/// Metadata recorded by the ingestion stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub dataset: String,
    pub saved_raw_path: String,
    pub rows: usize,
    pub cols: usize,
    pub feature_columns: Vec<String>,
    pub target_column: String,
    pub generated_at_utc: DateTime<Utc>,
}

/// Typical California Housing district used by `predict --sample`.
pub fn sample_payload() -> serde_json::Map<String, serde_json::Value> {
    let mut payload = serde_json::Map::new();
    for (name, value) in [
        ("MedInc", 5.0),
        ("HouseAge", 20.0),
        ("AveRooms", 5.0),
        ("AveBedrms", 1.0),
        ("Population", 1000.0),
        ("AveOccup", 3.0),
        ("Latitude", 34.05),
        ("Longitude", -118.25),
    ] {
        payload.insert(name.to_string(), serde_json::json!(value));
    }
    payload
}
