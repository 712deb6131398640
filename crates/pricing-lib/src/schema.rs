//! Expected input schema of a fitted pipeline
//!
//! The schema is the ordered list of feature names owned by the first
//! fitted transformer of the `preprocess` stage. Order is significant: it
//! is the positional contract between request rows and the pipeline.

use crate::error::SchemaExtractionError;
use crate::predictor::{ColumnSelection, PipelineArtifact};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

/// Name of the preprocessing stage every pipeline must expose
pub const PREPROCESS_STAGE: &str = "preprocess";

/// Name of the regression stage
pub const MODEL_STAGE: &str = "model";

/// Ordered, unique, non-empty feature names. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSchema {
    features: Arc<[String]>,
}

impl ExpectedSchema {
    /// Build a schema, rejecting duplicates and empty lists.
    pub fn new(features: Vec<String>) -> Result<Self, SchemaExtractionError> {
        if features.is_empty() {
            return Err(SchemaExtractionError::NotFitted);
        }
        let mut seen = HashSet::with_capacity(features.len());
        for name in &features {
            if !seen.insert(name.as_str()) {
                return Err(SchemaExtractionError::DuplicateFeature { name: name.clone() });
            }
        }
        Ok(Self {
            features: features.into(),
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub(crate) fn shared(&self) -> Arc<[String]> {
        self.features.clone()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name)
    }

    /// Check that an explicitly recorded schema matches this one exactly.
    pub fn ensure_matches(&self, recorded: &[String]) -> Result<(), SchemaExtractionError> {
        if self.features() == recorded {
            Ok(())
        } else {
            Err(SchemaExtractionError::DescriptorMismatch {
                descriptor: recorded.to_vec(),
                pipeline: self.features.to_vec(),
            })
        }
    }
}

impl Serialize for ExpectedSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.features.serialize(serializer)
    }
}

/// Recover the expected feature names from a fitted pipeline.
pub fn extract_expected_features(
    pipeline: &dyn PipelineArtifact,
) -> Result<ExpectedSchema, SchemaExtractionError> {
    let preprocess = pipeline.named_stage(PREPROCESS_STAGE).ok_or_else(|| {
        SchemaExtractionError::MissingStage {
            stage: PREPROCESS_STAGE.to_string(),
        }
    })?;

    let transformers = preprocess
        .fitted_transformers()
        .filter(|entries| !entries.is_empty())
        .ok_or(SchemaExtractionError::NotFitted)?;

    // Only the first entry owns the numeric feature list.
    let first = &transformers[0];
    match first.columns {
        ColumnSelection::Names(names) if !names.is_empty() => ExpectedSchema::new(names.clone()),
        _ => Err(SchemaExtractionError::MalformedColumns {
            transformer: first.name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureMatrix;
    use crate::predictor::{Stage, TransformerColumns};

    struct FakeStage {
        entries: Option<Vec<(String, ColumnSelection)>>,
    }

    impl Stage for FakeStage {
        fn fitted_transformers(&self) -> Option<Vec<TransformerColumns<'_>>> {
            self.entries.as_ref().map(|entries| {
                entries
                    .iter()
                    .map(|(name, columns)| TransformerColumns { name, columns })
                    .collect()
            })
        }
    }

    struct FakePipeline {
        preprocess: Option<FakeStage>,
    }

    impl PipelineArtifact for FakePipeline {
        fn named_stage(&self, name: &str) -> Option<&dyn Stage> {
            match name {
                PREPROCESS_STAGE => self.preprocess.as_ref().map(|s| s as &dyn Stage),
                _ => None,
            }
        }

        fn predict(&self, batch: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
            Ok(vec![0.0; batch.n_rows()])
        }
    }

    fn pipeline_with(entries: Option<Vec<(String, ColumnSelection)>>) -> FakePipeline {
        FakePipeline {
            preprocess: Some(FakeStage { entries }),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extracts_first_transformer_columns_in_order() {
        let cols = names(&["MedInc", "HouseAge", "AveRooms", "Latitude"]);
        let pipeline = pipeline_with(Some(vec![
            ("num".to_string(), ColumnSelection::Names(cols.clone())),
            ("cat".to_string(), ColumnSelection::Names(names(&["Ocean"]))),
        ]));

        let schema = extract_expected_features(&pipeline).unwrap();
        assert_eq!(schema.features(), cols.as_slice());
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn test_missing_preprocess_stage() {
        let pipeline = FakePipeline { preprocess: None };
        let err = extract_expected_features(&pipeline).unwrap_err();
        assert!(matches!(err, SchemaExtractionError::MissingStage { .. }));
    }

    #[test]
    fn test_unfitted_preprocess_stage() {
        let err = extract_expected_features(&pipeline_with(None)).unwrap_err();
        assert!(matches!(err, SchemaExtractionError::NotFitted));

        let err = extract_expected_features(&pipeline_with(Some(vec![]))).unwrap_err();
        assert!(matches!(err, SchemaExtractionError::NotFitted));
    }

    #[test]
    fn test_non_name_column_spec_is_malformed() {
        let pipeline = pipeline_with(Some(vec![(
            "num".to_string(),
            ColumnSelection::Indices(vec![0, 1]),
        )]));
        let err = extract_expected_features(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            SchemaExtractionError::MalformedColumns { ref transformer } if transformer == "num"
        ));

        let pipeline = pipeline_with(Some(vec![(
            "rest".to_string(),
            ColumnSelection::Remainder,
        )]));
        assert!(extract_expected_features(&pipeline).is_err());
    }

    #[test]
    fn test_duplicate_feature_names_rejected() {
        let pipeline = pipeline_with(Some(vec![(
            "num".to_string(),
            ColumnSelection::Names(names(&["MedInc", "MedInc"])),
        )]));
        let err = extract_expected_features(&pipeline).unwrap_err();
        assert!(matches!(err, SchemaExtractionError::DuplicateFeature { .. }));
    }

    #[test]
    fn test_ensure_matches_descriptor() {
        let schema = ExpectedSchema::new(names(&["a", "b"])).unwrap();
        assert!(schema.ensure_matches(&names(&["a", "b"])).is_ok());
        let err = schema.ensure_matches(&names(&["b", "a"])).unwrap_err();
        assert!(matches!(err, SchemaExtractionError::DescriptorMismatch { .. }));
    }

    #[test]
    fn test_schema_serializes_as_list() {
        let schema = ExpectedSchema::new(names(&["MedInc", "HouseAge"])).unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json, serde_json::json!(["MedInc", "HouseAge"]));
    }
}
