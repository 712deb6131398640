//! Persisted model, descriptor and metrics files
//!
//! The model is the serialized [`Pipeline`]. A descriptor written next to it
//! records the feature order, target and a SHA-256 of the model bytes, and is
//! cross-checked against the introspected schema at load time.

use crate::error::ArtifactError;
use crate::models::TrainingMetrics;
use crate::pipeline::{Pipeline, Step, NUMERIC_TRANSFORMER};
use crate::predictor::ServingContext;
use crate::schema::{extract_expected_features, MODEL_STAGE};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Descriptor layout understood by this build
pub const DESCRIPTOR_FORMAT_VERSION: u32 = 1;

/// Sidecar metadata for a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub format_version: u32,
    pub model_type: String,
    pub feature_columns: Vec<String>,
    pub numeric_transformer: String,
    pub target_column: String,
    pub model_sha256: String,
    pub trained_at: DateTime<Utc>,
}

/// A model ready to serve, plus its descriptor if one was found
#[derive(Debug)]
pub struct LoadedModel {
    pub context: ServingContext,
    pub descriptor: Option<ModelDescriptor>,
    pub model_path: PathBuf,
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes).map_err(io_error(path))
}

/// Read and decode a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn model_type(pipeline: &Pipeline) -> &'static str {
    match pipeline.step(MODEL_STAGE) {
        Some(Step::Ridge(_)) => "ridge",
        Some(Step::ColumnTransformer(_)) => "column_transformer",
        None => "unknown",
    }
}

/// Persist a fitted pipeline and its descriptor.
///
/// Fails with a schema error if the pipeline is not fitted, so an unusable
/// model never reaches disk.
pub fn save_model(
    pipeline: &Pipeline,
    target_column: &str,
    model_path: &Path,
    descriptor_path: &Path,
) -> Result<ModelDescriptor, ArtifactError> {
    let schema = extract_expected_features(pipeline)?;

    if let Some(parent) = model_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let bytes = serde_json::to_vec_pretty(pipeline)?;
    fs::write(model_path, &bytes).map_err(io_error(model_path))?;

    let descriptor = ModelDescriptor {
        format_version: DESCRIPTOR_FORMAT_VERSION,
        model_type: model_type(pipeline).to_string(),
        feature_columns: schema.features().to_vec(),
        numeric_transformer: NUMERIC_TRANSFORMER.to_string(),
        target_column: target_column.to_string(),
        model_sha256: compute_checksum(&bytes),
        trained_at: Utc::now(),
    };
    write_json(descriptor_path, &descriptor)?;

    info!(
        model_path = %model_path.display(),
        features = descriptor.feature_columns.len(),
        checksum = %descriptor.model_sha256,
        "Model saved"
    );
    Ok(descriptor)
}

/// Load a model for serving.
///
/// With a descriptor present, the model bytes must match its checksum and
/// the introspected schema must equal its `feature_columns`. Without one the
/// introspected schema is used as-is.
pub fn load_model(model_path: &Path, descriptor_path: &Path) -> Result<LoadedModel, ArtifactError> {
    if !model_path.exists() {
        return Err(ArtifactError::ModelNotFound(model_path.to_path_buf()));
    }
    let bytes = fs::read(model_path).map_err(io_error(model_path))?;

    let descriptor = if descriptor_path.exists() {
        let descriptor: ModelDescriptor = read_json(descriptor_path)?;
        if descriptor.format_version != DESCRIPTOR_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedFormat {
                found: descriptor.format_version,
                supported: DESCRIPTOR_FORMAT_VERSION,
            });
        }
        let actual = compute_checksum(&bytes);
        if actual != descriptor.model_sha256 {
            return Err(ArtifactError::ChecksumMismatch {
                expected: descriptor.model_sha256,
                actual,
            });
        }
        debug!(checksum = %actual, "Model checksum validated");
        Some(descriptor)
    } else {
        warn!(
            descriptor_path = %descriptor_path.display(),
            "Model descriptor missing, relying on pipeline introspection only"
        );
        None
    };

    let pipeline: Pipeline =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Decode {
            path: model_path.to_path_buf(),
            source,
        })?;
    let context = ServingContext::from_pipeline(Arc::new(pipeline))?;

    if let Some(descriptor) = &descriptor {
        context.schema().ensure_matches(&descriptor.feature_columns)?;
    }

    Ok(LoadedModel {
        context,
        descriptor,
        model_path: model_path.to_path_buf(),
    })
}

pub fn save_metrics(metrics: &TrainingMetrics, path: &Path) -> Result<(), ArtifactError> {
    write_json(path, metrics)
}

/// Raw metrics object, or `None` when the file does not exist yet.
pub fn read_metrics(
    path: &Path,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>, ArtifactError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaExtractionError;
    use crate::models::{sample_payload, FeatureMatrix};
    use serde_json::Value;
    use tempfile::TempDir;

    fn features() -> Vec<String> {
        vec!["MedInc".to_string(), "HouseAge".to_string()]
    }

    fn fitted_pipeline() -> Pipeline {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, (i % 5) as f64]).collect();
        let y: Vec<f64> = rows.iter().map(|r| r[0] * 0.5 + r[1]).collect();
        let data = FeatureMatrix::new(Arc::from(features()), rows);
        let mut pipeline = Pipeline::housing(features(), 1.0);
        pipeline.fit(&data, &y).unwrap();
        pipeline
    }

    fn paths(dir: &TempDir) -> (PathBuf, PathBuf) {
        (
            dir.path().join("artifacts/model.json"),
            dir.path().join("artifacts/model_descriptor.json"),
        )
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test data");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"test data"));
        assert_ne!(checksum, compute_checksum(b"other data"));
    }

    #[test]
    fn test_save_then_load_serves_predictions() {
        let dir = TempDir::new().unwrap();
        let (model, descriptor) = paths(&dir);

        let saved = save_model(&fitted_pipeline(), "MedHouseVal", &model, &descriptor).unwrap();
        assert_eq!(saved.feature_columns, features());
        assert_eq!(saved.model_type, "ridge");
        assert_eq!(saved.format_version, DESCRIPTOR_FORMAT_VERSION);

        let loaded = load_model(&model, &descriptor).unwrap();
        assert_eq!(loaded.descriptor, Some(saved));
        assert_eq!(loaded.context.schema().features(), features().as_slice());

        let result = loaded
            .context
            .predict(&Value::Object(sample_payload()))
            .unwrap();
        assert!(result.prediction.is_finite());
    }

    #[test]
    fn test_missing_model_file() {
        let dir = TempDir::new().unwrap();
        let (model, descriptor) = paths(&dir);
        let err = load_model(&model, &descriptor).unwrap_err();
        assert!(matches!(err, ArtifactError::ModelNotFound(_)));
    }

    #[test]
    fn test_missing_descriptor_still_loads() {
        let dir = TempDir::new().unwrap();
        let (model, descriptor) = paths(&dir);
        save_model(&fitted_pipeline(), "MedHouseVal", &model, &descriptor).unwrap();
        fs::remove_file(&descriptor).unwrap();

        let loaded = load_model(&model, &descriptor).unwrap();
        assert!(loaded.descriptor.is_none());
        assert_eq!(loaded.context.schema().len(), 2);
    }

    #[test]
    fn test_tampered_model_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let (model, descriptor) = paths(&dir);
        save_model(&fitted_pipeline(), "MedHouseVal", &model, &descriptor).unwrap();

        let mut text = fs::read_to_string(&model).unwrap();
        text.push('\n');
        fs::write(&model, text).unwrap();

        let err = load_model(&model, &descriptor).unwrap_err();
        assert!(matches!(err, ArtifactError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_descriptor_feature_order_must_match() {
        let dir = TempDir::new().unwrap();
        let (model, descriptor) = paths(&dir);
        let mut saved =
            save_model(&fitted_pipeline(), "MedHouseVal", &model, &descriptor).unwrap();
        saved.feature_columns.reverse();
        write_json(&descriptor, &saved).unwrap();

        let err = load_model(&model, &descriptor).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Schema(SchemaExtractionError::DescriptorMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_descriptor_version_rejected() {
        let dir = TempDir::new().unwrap();
        let (model, descriptor) = paths(&dir);
        let mut saved =
            save_model(&fitted_pipeline(), "MedHouseVal", &model, &descriptor).unwrap();
        saved.format_version = 99;
        write_json(&descriptor, &saved).unwrap();

        let err = load_model(&model, &descriptor).unwrap_err();
        assert!(matches!(err, ArtifactError::UnsupportedFormat { found: 99, .. }));
    }

    #[test]
    fn test_unfitted_pipeline_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let (model, descriptor) = paths(&dir);
        let err = save_model(
            &Pipeline::housing(features(), 1.0),
            "MedHouseVal",
            &model,
            &descriptor,
        )
        .unwrap_err();
        assert!(matches!(err, ArtifactError::Schema(SchemaExtractionError::NotFitted)));
        assert!(!model.exists());
    }

    #[test]
    fn test_read_metrics_absent_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        assert!(read_metrics(&path).unwrap().is_none());

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_metrics(&path).unwrap_err(),
            ArtifactError::Decode { .. }
        ));
    }
}
