//! Error taxonomy for schema extraction, request validation and prediction
//!
//! The classes here decide how a failure is reported to callers:
//! client mistakes, temporary unavailability and server-side faults are
//! never folded into one another.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to recover the expected feature schema from a fitted artifact.
///
/// None of these are retryable: the artifact has to be retrained or rebuilt.
#[derive(Debug, Error)]
pub enum SchemaExtractionError {
    #[error("pipeline does not contain '{stage}' stage")]
    MissingStage { stage: String },

    #[error("preprocessor seems unfitted (no fitted transformers); train first")]
    NotFitted,

    #[error("could not determine expected columns from transformer '{transformer}'")]
    MalformedColumns { transformer: String },

    #[error("duplicate feature name in fitted columns: {name}")]
    DuplicateFeature { name: String },

    #[error("model descriptor lists {descriptor:?} but fitted pipeline expects {pipeline:?}")]
    DescriptorMismatch {
        descriptor: Vec<String>,
        pipeline: Vec<String>,
    },
}

impl SchemaExtractionError {
    /// True when the fix is to (re)train, false when the pipeline itself was built wrong.
    pub fn requires_training(&self) -> bool {
        matches!(self, Self::MissingStage { .. } | Self::NotFitted)
    }
}

/// Client payload problems. Every offending feature name is listed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payload must be a JSON object of feature name to value")]
    NotAnObject,

    #[error("missing required features: {features:?}")]
    MissingFeatures { features: Vec<String> },

    #[error("missing value for feature: {}", .features.join(", "))]
    MissingValues { features: Vec<String> },

    #[error("non-numeric value for feature: {}", .features.join(", "))]
    NonNumericValues { features: Vec<String> },

    #[error(
        "missing value for feature: {}; non-numeric value for feature: {}",
        .missing_values.join(", "),
        .non_numeric.join(", ")
    )]
    InvalidValues {
        missing_values: Vec<String>,
        non_numeric: Vec<String>,
    },
}

impl ValidationError {
    /// Feature names this error refers to (empty for shape errors).
    pub fn features(&self) -> Vec<String> {
        match self {
            Self::NotAnObject => Vec::new(),
            Self::MissingFeatures { features }
            | Self::MissingValues { features }
            | Self::NonNumericValues { features } => features.clone(),
            Self::InvalidValues {
                missing_values,
                non_numeric,
            } => missing_values.iter().chain(non_numeric).cloned().collect(),
        }
    }
}

/// How a prediction failure should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller sent bad input; retrying unchanged will fail again.
    Client,
    /// Service has not finished loading; retry later.
    Unavailable,
    /// Model or runtime fault; caller cannot fix it.
    Internal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Client => "validation_error",
            ErrorClass::Unavailable => "not_ready",
            ErrorClass::Internal => "internal_error",
        }
    }
}

/// Per-call prediction failure.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("service not ready: model not loaded yet")]
    NotReady,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("prediction runtime failure: {0:#}")]
    Runtime(anyhow::Error),
}

impl PredictError {
    pub fn runtime(source: impl Into<anyhow::Error>) -> Self {
        Self::Runtime(source.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            PredictError::NotReady => ErrorClass::Unavailable,
            PredictError::Validation(_) => ErrorClass::Client,
            PredictError::Runtime(_) => ErrorClass::Internal,
        }
    }
}

/// Loading or saving persisted artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model not found at: {} | run training first: hpp train", .0.display())]
    ModelNotFound(PathBuf),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode artifact: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("model checksum mismatch: descriptor says {expected}, file hashes to {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported model descriptor format version {found} (supported: {supported})")]
    UnsupportedFormat { found: u32, supported: u32 },

    #[error(transparent)]
    Schema(#[from] SchemaExtractionError),
}

/// Dataset reading, validation and splitting.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{what} not found: {} ({hint})", .path.display())]
    NotFound {
        what: &'static str,
        path: PathBuf,
        hint: &'static str,
    },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("row {row} has {got} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("no source dataset given; pass --source or set data.source_path")]
    MissingSource,

    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("cannot split {rows} rows with test_size {test_size}: one side would be empty")]
    SplitTooSmall { rows: usize, test_size: f64 },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Fitting and evaluating the pipeline.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("target column '{0}' not found in training data")]
    MissingTargetColumn(String),

    #[error("column '{0}' required by the pipeline is not present")]
    MissingColumn(String),

    #[error("{0} rows have a missing target value")]
    MissingTargetValues(usize),

    #[error("cannot fit on empty data")]
    EmptyData,

    #[error("no feature columns besides the target")]
    NoFeatures,

    #[error("ridge system is not positive definite; try a larger ridge_alpha")]
    Singular,

    #[error("transformer '{transformer}' failed to fit: {cause:#}")]
    Transform {
        transformer: String,
        cause: anyhow::Error,
    },

    #[error("evaluation on the test set failed: {0:#}")]
    Evaluation(anyhow::Error),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_error_classes_are_distinct() {
        let not_ready = PredictError::NotReady;
        let validation: PredictError = ValidationError::MissingFeatures {
            features: vec!["Longitude".to_string()],
        }
        .into();
        let runtime = PredictError::runtime(anyhow::anyhow!("boom"));

        assert_eq!(not_ready.class(), ErrorClass::Unavailable);
        assert_eq!(validation.class(), ErrorClass::Client);
        assert_eq!(runtime.class(), ErrorClass::Internal);
    }

    #[test]
    fn test_missing_features_message_lists_names() {
        let err = ValidationError::MissingFeatures {
            features: vec!["AveRooms".to_string(), "Longitude".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("missing required features"));
        assert!(msg.contains("AveRooms"));
        assert!(msg.contains("Longitude"));
    }

    #[test]
    fn test_missing_value_message() {
        let err = ValidationError::MissingValues {
            features: vec!["Longitude".to_string()],
        };
        assert_eq!(err.to_string(), "missing value for feature: Longitude");
        assert_eq!(err.features(), ["Longitude".to_string()]);
    }

    #[test]
    fn test_invalid_values_message_lists_both_kinds() {
        let err = ValidationError::InvalidValues {
            missing_values: vec!["Longitude".to_string()],
            non_numeric: vec!["MedInc".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing value for feature: Longitude; non-numeric value for feature: MedInc"
        );
        assert_eq!(err.features(), ["Longitude".to_string(), "MedInc".to_string()]);
    }

    #[test]
    fn test_schema_errors_training_hint() {
        assert!(SchemaExtractionError::NotFitted.requires_training());
        assert!(SchemaExtractionError::MissingStage {
            stage: "preprocess".into()
        }
        .requires_training());
        assert!(!SchemaExtractionError::MalformedColumns {
            transformer: "num".into()
        }
        .requires_training());
    }

    #[test]
    fn test_model_not_found_mentions_training() {
        let err = ArtifactError::ModelNotFound(PathBuf::from("artifacts/model.json"));
        assert!(err.to_string().contains("run training first"));
    }
}
