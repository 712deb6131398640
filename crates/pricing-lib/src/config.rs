//! Pipeline configuration
//!
//! One YAML document drives every stage. `HOUSING_*` environment variables
//! override file values, with `__` separating nested keys
//! (`HOUSING_TRAINING__RIDGE_ALPHA=0.5`).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config location relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "HOUSING";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub processed: ProcessedConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_raw_filename")]
    pub raw_filename: String,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    /// CSV to ingest when `ingest` is run without `--source`
    #[serde(default)]
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedConfig {
    #[serde(default = "default_train_filename")]
    pub train_filename: String,
    #[serde(default = "default_test_filename")]
    pub test_filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,
    #[serde(default = "default_model_type")]
    pub model_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_model_filename")]
    pub model_filename: String,
    #[serde(default = "default_descriptor_filename")]
    pub descriptor_filename: String,
    #[serde(default = "default_metrics_filename")]
    pub metrics_filename: String,
    #[serde(default = "default_sample_request_filename")]
    pub sample_request_filename: String,
    #[serde(default = "default_sample_response_filename")]
    pub sample_response_filename: String,
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_raw_filename() -> String {
    "housing.csv".to_string()
}

fn default_target_column() -> String {
    "MedHouseVal".to_string()
}

fn default_train_filename() -> String {
    "train.csv".to_string()
}

fn default_test_filename() -> String {
    "test.csv".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_random_state() -> u64 {
    42
}

fn default_ridge_alpha() -> f64 {
    1.0
}

fn default_model_type() -> String {
    "ridge".to_string()
}

fn default_model_filename() -> String {
    "model.json".to_string()
}

fn default_descriptor_filename() -> String {
    "model_descriptor.json".to_string()
}

fn default_metrics_filename() -> String {
    "metrics.json".to_string()
}

fn default_sample_request_filename() -> String {
    "sample_request.json".to_string()
}

fn default_sample_response_filename() -> String {
    "sample_response.json".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            processed_dir: default_processed_dir(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_filename: default_raw_filename(),
            target_column: default_target_column(),
            source_path: None,
        }
    }
}

impl Default for ProcessedConfig {
    fn default() -> Self {
        Self {
            train_filename: default_train_filename(),
            test_filename: default_test_filename(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            random_state: default_random_state(),
            ridge_alpha: default_ridge_alpha(),
            model_type: default_model_type(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_filename: default_model_filename(),
            descriptor_filename: default_descriptor_filename(),
            metrics_filename: default_metrics_filename(),
            sample_request_filename: default_sample_request_filename(),
            sample_response_filename: default_sample_response_filename(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the YAML file at `path` and the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            let resolved = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            return Err(ConfigError::NotFound(resolved));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: PipelineConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges the stages rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.training;
        if !(t.test_size > 0.0 && t.test_size < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "training.test_size must be in (0, 1), got {}",
                t.test_size
            )));
        }
        if !t.ridge_alpha.is_finite() || t.ridge_alpha < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "training.ridge_alpha must be a finite value >= 0, got {}",
                t.ridge_alpha
            )));
        }
        if t.model_type != "ridge" {
            return Err(ConfigError::Invalid(format!(
                "training.model_type '{}' is not supported (expected 'ridge')",
                t.model_type
            )));
        }
        if self.data.target_column.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "data.target_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn raw_path(&self) -> PathBuf {
        self.paths.raw_dir.join(&self.data.raw_filename)
    }

    pub fn train_path(&self) -> PathBuf {
        self.paths.processed_dir.join(&self.processed.train_filename)
    }

    pub fn test_path(&self) -> PathBuf {
        self.paths.processed_dir.join(&self.processed.test_filename)
    }

    pub fn model_path(&self) -> PathBuf {
        self.paths.artifacts_dir.join(&self.artifacts.model_filename)
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.paths.artifacts_dir.join(&self.artifacts.descriptor_filename)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.paths.artifacts_dir.join(&self.artifacts.metrics_filename)
    }

    pub fn sample_request_path(&self) -> PathBuf {
        self.paths
            .artifacts_dir
            .join(&self.artifacts.sample_request_filename)
    }

    pub fn sample_response_path(&self) -> PathBuf {
        self.paths
            .artifacts_dir
            .join(&self.artifacts.sample_response_filename)
    }

    pub fn validation_report_path(&self) -> PathBuf {
        self.paths.artifacts_dir.join("validation_report.json")
    }

    pub fn run_info_path(&self) -> PathBuf {
        self.paths.artifacts_dir.join("run_info.json")
    }

    /// Re-root every relative directory under `root`.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.paths.raw_dir = root.join(&self.paths.raw_dir);
        self.paths.processed_dir = root.join(&self.paths.processed_dir);
        self.paths.artifacts_dir = root.join(&self.paths.artifacts_dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.raw_path(), PathBuf::from("data/raw/housing.csv"));
        assert_eq!(cfg.model_path(), PathBuf::from("artifacts/model.json"));
        assert_eq!(
            cfg.descriptor_path(),
            PathBuf::from("artifacts/model_descriptor.json")
        );
        assert_eq!(cfg.data.target_column, "MedHouseVal");
        assert_eq!(cfg.training.random_state, 42);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "paths:\n  artifacts_dir: out\ntraining:\n  ridge_alpha: 0.5\n",
        );

        let cfg = PipelineConfig::load(&path).unwrap();
        assert_eq!(cfg.training.ridge_alpha, 0.5);
        assert_eq!(cfg.training.test_size, 0.2);
        assert_eq!(cfg.metrics_path(), PathBuf::from("out/metrics.json"));
        assert_eq!(cfg.train_path(), PathBuf::from("data/processed/train.csv"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let err = PipelineConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(ref p) if p.ends_with("nope.yaml")));
    }

    #[test]
    fn test_invalid_test_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "training:\n  test_size: 1.5\n");
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("test_size")));
    }

    #[test]
    fn test_negative_alpha_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.training.ridge_alpha = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_with_root() {
        let cfg = PipelineConfig::default().with_root(Path::new("/tmp/run"));
        assert_eq!(cfg.raw_path(), PathBuf::from("/tmp/run/data/raw/housing.csv"));
    }
}
