//! Fit, evaluate and persist the baseline model

use crate::artifacts::{save_metrics, save_model, ModelDescriptor};
use crate::config::PipelineConfig;
use crate::data::{Cell, Frame};
use crate::error::{DataError, TrainingError};
use crate::models::TrainingMetrics;
use crate::pipeline::Pipeline;
use crate::predictor::PipelineArtifact;
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

/// Regression quality on a held-out set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

pub fn regression_scores(y_true: &[f64], y_pred: &[f64]) -> Scores {
    let n = y_true.len().max(1) as f64;
    let mean = y_true.iter().sum::<f64>() / n;

    let mut sq = 0.0;
    let mut abs = 0.0;
    let mut total = 0.0;
    for (t, p) in y_true.iter().zip(y_pred) {
        sq += (t - p).powi(2);
        abs += (t - p).abs();
        total += (t - mean).powi(2);
    }

    let r2 = if total > 0.0 {
        1.0 - sq / total
    } else if sq == 0.0 {
        1.0
    } else {
        0.0
    };

    Scores {
        rmse: (sq / n).sqrt(),
        mae: abs / n,
        r2,
    }
}

/// Everything the train stage produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub metrics: TrainingMetrics,
    pub descriptor: ModelDescriptor,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
}

fn load_processed(cfg: &PipelineConfig) -> Result<(Frame, Frame), TrainingError> {
    for path in [cfg.train_path(), cfg.test_path()] {
        if !path.is_file() {
            return Err(DataError::NotFound {
                what: "processed data",
                path,
                hint: "run validate-split first: hpp validate-split",
            }
            .into());
        }
    }
    Ok((
        Frame::read_csv(&cfg.train_path())?,
        Frame::read_csv(&cfg.test_path())?,
    ))
}

/// Target values; every row must have a numeric target.
fn target_values(frame: &Frame, target: &str) -> Result<Vec<f64>, TrainingError> {
    let idx = frame
        .column_index(target)
        .ok_or_else(|| TrainingError::MissingTargetColumn(target.to_string()))?;

    let mut values = Vec::with_capacity(frame.n_rows());
    let mut bad = 0;
    for cell in frame.cells(idx) {
        match cell {
            Cell::Number(v) => values.push(v),
            Cell::Missing | Cell::Text => bad += 1,
        }
    }
    if bad > 0 {
        return Err(TrainingError::MissingTargetValues(bad));
    }
    Ok(values)
}

/// Train on the processed split and write model, descriptor and metrics.
pub fn train(cfg: &PipelineConfig) -> Result<TrainingOutcome, TrainingError> {
    let target = cfg.data.target_column.as_str();
    let (train_frame, test_frame) = load_processed(cfg)?;

    let y_train = target_values(&train_frame, target)?;
    let y_test = target_values(&test_frame, target)?;

    let feature_cols: Vec<String> = train_frame
        .headers
        .iter()
        .filter(|h| h.as_str() != target)
        .cloned()
        .collect();
    if feature_cols.is_empty() {
        return Err(TrainingError::NoFeatures);
    }

    let x_train = train_frame
        .to_feature_matrix(&feature_cols)
        .map_err(TrainingError::MissingColumn)?;
    let x_test = test_frame
        .to_feature_matrix(&feature_cols)
        .map_err(TrainingError::MissingColumn)?;

    let alpha = cfg.training.ridge_alpha;
    let mut pipeline = Pipeline::housing(feature_cols.clone(), alpha);
    pipeline.fit(&x_train, &y_train)?;

    let predictions = pipeline
        .predict(&x_test)
        .map_err(TrainingError::Evaluation)?;
    let scores = regression_scores(&y_test, &predictions);

    let model_path = cfg.model_path();
    let descriptor = save_model(&pipeline, target, &model_path, &cfg.descriptor_path())?;

    let metrics = TrainingMetrics {
        model_type: cfg.training.model_type.clone(),
        ridge_alpha: alpha,
        rmse: scores.rmse,
        mae: scores.mae,
        r2: scores.r2,
        n_train: train_frame.n_rows(),
        n_test: test_frame.n_rows(),
        feature_count: feature_cols.len(),
        target_column: target.to_string(),
        generated_at_utc: Utc::now(),
    };
    let metrics_path = cfg.metrics_path();
    save_metrics(&metrics, &metrics_path)?;

    info!(
        rmse = scores.rmse,
        mae = scores.mae,
        r2 = scores.r2,
        n_train = metrics.n_train,
        n_test = metrics.n_test,
        "Training complete"
    );

    Ok(TrainingOutcome {
        metrics,
        descriptor,
        model_path,
        metrics_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::load_model;
    use crate::data::{ingest, validate_split};
    use crate::models::sample_payload;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scores_perfect_and_constant() {
        let perfect = regression_scores(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(perfect.rmse, 0.0);
        assert_eq!(perfect.r2, 1.0);

        let off = regression_scores(&[1.0, 3.0], &[2.0, 2.0]);
        assert_eq!(off.rmse, 1.0);
        assert_eq!(off.mae, 1.0);
        assert_eq!(off.r2, 0.0);
    }

    #[test]
    fn test_train_requires_split() {
        let dir = TempDir::new().unwrap();
        let cfg = PipelineConfig::default().with_root(dir.path());
        let err = train(&cfg).unwrap_err();
        assert!(err.to_string().contains("validate-split"));
    }

    #[test]
    fn test_missing_target_values_rejected() {
        let frame = Frame::new(
            vec!["x".into(), "y".into()],
            vec![vec!["1".into(), "".into()], vec!["2".into(), "4".into()]],
        );
        assert!(matches!(
            target_values(&frame, "y"),
            Err(TrainingError::MissingTargetValues(1))
        ));
        assert!(matches!(
            target_values(&frame, "zzz"),
            Err(TrainingError::MissingTargetColumn(_))
        ));
    }

    #[test]
    fn test_end_to_end_train_then_serve() {
        let dir = TempDir::new().unwrap();
        let cfg = PipelineConfig::default().with_root(dir.path());

        let names = [
            "MedInc",
            "HouseAge",
            "AveRooms",
            "AveBedrms",
            "Population",
            "AveOccup",
            "Latitude",
            "Longitude",
        ];
        let mut body = format!("{},MedHouseVal\n", names.join(","));
        for i in 0..60 {
            let x = i as f64;
            let row = [
                1.0 + x * 0.1,
                (i % 40) as f64,
                4.0 + (i % 5) as f64,
                1.0 + (i % 3) as f64 * 0.1,
                500.0 + x * 10.0,
                2.0 + (i % 4) as f64 * 0.5,
                33.0 + (i % 7) as f64,
                -120.0 + (i % 6) as f64,
            ];
            let y = 0.4 * row[0] + 0.01 * row[1] + 0.5;
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            body.push_str(&format!("{},{}\n", cells.join(","), y));
        }
        let source = dir.path().join("housing_source.csv");
        fs::write(&source, body).unwrap();

        ingest(&cfg, Some(&source)).unwrap();
        validate_split(&cfg).unwrap();
        let outcome = train(&cfg).unwrap();

        assert_eq!(outcome.metrics.feature_count, 8);
        assert_eq!(outcome.metrics.n_train + outcome.metrics.n_test, 60);
        assert!(outcome.metrics.rmse.is_finite());
        assert_eq!(outcome.descriptor.feature_columns, names.to_vec());
        assert!(cfg.metrics_path().exists());

        let loaded = load_model(&cfg.model_path(), &cfg.descriptor_path()).unwrap();
        let result = loaded
            .context
            .predict(&Value::Object(sample_payload()))
            .unwrap();
        assert!(result.prediction.is_finite());
    }
}
