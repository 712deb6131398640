//! Prediction engine
//!
//! A fitted pipeline is treated as an opaque artifact that only exposes
//! named stages (for schema recovery) and a batch `predict`.

mod context;
mod inference;

pub use context::{ModelSlot, ServingContext};
pub use inference::predict;

use crate::models::FeatureMatrix;
use anyhow::Result;

/// How a transformer entry selects its input columns.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnSelection {
    /// Ordered column names
    Names(Vec<String>),
    /// Positional indices into the incoming batch
    Indices(Vec<usize>),
    /// Every column no other entry claimed
    Remainder,
}

/// A fitted transformer entry as seen from outside: its name and columns.
#[derive(Debug, Clone, Copy)]
pub struct TransformerColumns<'a> {
    pub name: &'a str,
    pub columns: &'a ColumnSelection,
}

/// A named stage of a fitted pipeline
pub trait Stage: Send + Sync {
    /// Fitted transformer entries in declaration order.
    ///
    /// `None` (or an empty list) means the stage has not been fit.
    fn fitted_transformers(&self) -> Option<Vec<TransformerColumns<'_>>> {
        None
    }
}

/// Trait for fitted pipeline implementations
pub trait PipelineArtifact: Send + Sync {
    /// Look up a stage by name
    fn named_stage(&self, name: &str) -> Option<&dyn Stage>;

    /// Predict one value per row of the batch
    fn predict(&self, batch: &FeatureMatrix) -> Result<Vec<f64>>;
}
