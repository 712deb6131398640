//! Loaded model shared by every prediction call
//!
//! A [`ServingContext`] pairs a fitted pipeline with its expected schema.
//! It is built once, never mutated and shared behind an `Arc`, so concurrent
//! predictions need no locking.

use super::{inference, PipelineArtifact};
use crate::error::{PredictError, SchemaExtractionError};
use crate::models::PredictionResult;
use crate::schema::{extract_expected_features, ExpectedSchema};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Immutable pipeline + schema pair
pub struct ServingContext {
    pipeline: Arc<dyn PipelineArtifact>,
    schema: ExpectedSchema,
}

impl ServingContext {
    /// Derive the schema from the pipeline.
    pub fn from_pipeline(pipeline: Arc<dyn PipelineArtifact>) -> Result<Self, SchemaExtractionError> {
        let schema = extract_expected_features(pipeline.as_ref())?;
        Ok(Self { pipeline, schema })
    }

    /// Use an already derived schema.
    pub fn new(pipeline: Arc<dyn PipelineArtifact>, schema: ExpectedSchema) -> Self {
        Self { pipeline, schema }
    }

    pub fn schema(&self) -> &ExpectedSchema {
        &self.schema
    }

    pub fn pipeline(&self) -> &dyn PipelineArtifact {
        self.pipeline.as_ref()
    }

    pub fn predict(&self, payload: &Value) -> Result<PredictionResult, PredictError> {
        inference::predict(Some(self.pipeline()), Some(&self.schema), payload)
    }
}

impl std::fmt::Debug for ServingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServingContext")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Write-once holder for the serving context.
///
/// Empty until startup finishes loading; afterwards it always returns the
/// same context.
#[derive(Debug, Clone, Default)]
pub struct ModelSlot {
    inner: Arc<OnceLock<Arc<ServingContext>>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the context. Returns `false` if one was already installed.
    pub fn install(&self, context: ServingContext) -> bool {
        self.inner.set(Arc::new(context)).is_ok()
    }

    pub fn get(&self) -> Option<Arc<ServingContext>> {
        self.inner.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.get().is_some()
    }

    /// Predict through the slot; `NotReady` while empty.
    pub fn predict(&self, payload: &Value) -> Result<PredictionResult, PredictError> {
        match self.inner.get() {
            Some(context) => context.predict(payload),
            None => inference::predict(None, None, payload),
        }
    }
}
