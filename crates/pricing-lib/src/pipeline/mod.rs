//! Two-stage housing regression pipeline
//!
//! `preprocess` (column transformer) followed by `model` (ridge). The whole
//! pipeline serializes to JSON and implements [`PipelineArtifact`], so the
//! serving path only ever sees it through that trait.

mod preprocess;
mod ridge;

pub use preprocess::{
    ColumnTransformer, ImputeStrategy, NumericTransformer, Remainder, ScalerParams,
    SimpleImputer, StandardScaler, TransformerEntry,
};
pub use ridge::{LinearParams, RidgeRegressor};

use crate::error::TrainingError;
use crate::models::FeatureMatrix;
use crate::predictor::{ColumnSelection, PipelineArtifact, Stage};
use crate::schema::{MODEL_STAGE, PREPROCESS_STAGE};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Name of the numeric entry inside the preprocess stage
pub const NUMERIC_TRANSFORMER: &str = "num";

/// One pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    ColumnTransformer(ColumnTransformer),
    Ridge(RidgeRegressor),
}

impl Step {
    fn as_stage(&self) -> &dyn Stage {
        match self {
            Step::ColumnTransformer(ct) => ct,
            Step::Ridge(model) => model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedStep {
    pub name: String,
    #[serde(flatten)]
    pub step: Step,
}

/// Ordered list of named steps; transformers first, one final estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<NamedStep>,
}

impl Pipeline {
    pub fn new(steps: Vec<NamedStep>) -> Self {
        Self { steps }
    }

    /// Unfitted `preprocess` + `model` pipeline over the given numeric columns.
    pub fn housing(feature_columns: Vec<String>, alpha: f64) -> Self {
        let preprocess = ColumnTransformer::new().with_transformer(
            NUMERIC_TRANSFORMER,
            NumericTransformer::new(ImputeStrategy::Median),
            ColumnSelection::Names(feature_columns),
        );
        Self::new(vec![
            NamedStep {
                name: PREPROCESS_STAGE.to_string(),
                step: Step::ColumnTransformer(preprocess),
            },
            NamedStep {
                name: MODEL_STAGE.to_string(),
                step: Step::Ridge(RidgeRegressor::new(alpha)),
            },
        ])
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name).map(|s| &s.step)
    }

    /// Fit every step in order on `data` against `target`.
    pub fn fit(&mut self, data: &FeatureMatrix, target: &[f64]) -> Result<(), TrainingError> {
        let mut features: Option<Vec<Vec<f64>>> = None;
        for named in &mut self.steps {
            match &mut named.step {
                Step::ColumnTransformer(ct) => {
                    let input = match features.take() {
                        None => data.clone(),
                        Some(rows) => FeatureMatrix::new(positional_columns(&rows), rows),
                    };
                    features = Some(ct.fit_transform(&input)?);
                }
                Step::Ridge(model) => {
                    let rows = features.take().unwrap_or_else(|| data.rows.clone());
                    model.fit(&rows, target)?;
                    return Ok(());
                }
            }
        }
        Err(TrainingError::EmptyData)
    }
}

/// Synthetic names for the output of an intermediate transformer
fn positional_columns(rows: &[Vec<f64>]) -> std::sync::Arc<[String]> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width).map(|i| format!("x{i}")).collect()
}

impl PipelineArtifact for Pipeline {
    fn named_stage(&self, name: &str) -> Option<&dyn Stage> {
        self.step(name).map(Step::as_stage)
    }

    fn predict(&self, batch: &FeatureMatrix) -> Result<Vec<f64>> {
        let mut features: Option<Vec<Vec<f64>>> = None;
        for named in &self.steps {
            match &named.step {
                Step::ColumnTransformer(ct) => {
                    let out = match features.take() {
                        None => ct.transform(batch)?,
                        Some(rows) => {
                            ct.transform(&FeatureMatrix::new(positional_columns(&rows), rows))?
                        }
                    };
                    features = Some(out);
                }
                Step::Ridge(model) => {
                    return match features.take() {
                        Some(rows) => model.predict(&rows),
                        None => model.predict(&batch.rows),
                    };
                }
            }
        }
        bail!("pipeline has no final estimator")
    }
}
