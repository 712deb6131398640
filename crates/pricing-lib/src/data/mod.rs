//! Dataset stages: ingest, validate and split

mod frame;
mod report;
mod split;

pub use frame::{parse_cell, Cell, Frame};
pub use report::{build_report, MinMax, ValidationReport};
pub use split::split_indices;

use crate::artifacts::write_json;
use crate::config::PipelineConfig;
use crate::error::DataError;
use crate::models::RunInfo;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Column name some exports use for the regression target
const GENERIC_TARGET: &str = "target";

/// Outcome of the validate-split stage
#[derive(Debug, Clone)]
pub struct SplitSummary {
    pub report: ValidationReport,
    pub report_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_shape: (usize, usize),
    pub test_shape: (usize, usize),
}

/// Copy a source CSV into the raw directory and record run metadata.
///
/// `source` overrides `data.source_path`.
pub fn ingest(cfg: &PipelineConfig, source: Option<&Path>) -> Result<RunInfo, DataError> {
    let source = source
        .or(cfg.data.source_path.as_deref())
        .ok_or(DataError::MissingSource)?;
    if !source.is_file() {
        return Err(DataError::NotFound {
            what: "source dataset",
            path: source.to_path_buf(),
            hint: "check --source or data.source_path",
        });
    }

    let mut frame = Frame::read_csv(source)?;
    let target = cfg.data.target_column.as_str();
    if frame.column_index(target).is_none() && frame.rename_column(GENERIC_TARGET, target) {
        info!(from = GENERIC_TARGET, to = target, "Renamed target column");
    }

    let raw_path = cfg.raw_path();
    frame.write_csv(&raw_path)?;

    let run_info = RunInfo {
        dataset: source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string()),
        saved_raw_path: raw_path.display().to_string(),
        rows: frame.n_rows(),
        cols: frame.n_cols(),
        feature_columns: frame
            .headers
            .iter()
            .filter(|h| h.as_str() != target)
            .cloned()
            .collect(),
        target_column: target.to_string(),
        generated_at_utc: Utc::now(),
    };
    write_json(&cfg.run_info_path(), &run_info)?;

    info!(
        raw_path = %raw_path.display(),
        rows = run_info.rows,
        cols = run_info.cols,
        "Raw dataset saved"
    );
    Ok(run_info)
}

/// Validate the raw dataset, write the report and, if clean, split it.
pub fn validate_split(cfg: &PipelineConfig) -> Result<SplitSummary, DataError> {
    let raw_path = cfg.raw_path();
    if !raw_path.is_file() {
        return Err(DataError::NotFound {
            what: "raw data",
            path: raw_path,
            hint: "run ingestion first: hpp ingest",
        });
    }

    let frame = Frame::read_csv(&raw_path)?;
    let report = build_report(&frame, &cfg.data.target_column);
    let report_path = cfg.validation_report_path();
    write_json(&report_path, &report)?;

    for warning in &report.warnings {
        warn!(%warning, "Dataset validation warning");
    }
    if !report.is_ok() {
        return Err(DataError::ValidationFailed(report.errors.clone()));
    }

    let (train_idx, test_idx) = split_indices(
        frame.n_rows(),
        cfg.training.test_size,
        cfg.training.random_state,
    )?;
    let train = frame.take_rows(&train_idx);
    let test = frame.take_rows(&test_idx);

    let train_path = cfg.train_path();
    let test_path = cfg.test_path();
    train.write_csv(&train_path)?;
    test.write_csv(&test_path)?;

    info!(
        train_rows = train.n_rows(),
        test_rows = test.n_rows(),
        "Dataset split"
    );

    Ok(SplitSummary {
        report,
        report_path,
        train_path,
        test_path,
        train_shape: (train.n_rows(), train.n_cols()),
        test_shape: (test.n_rows(), test.n_cols()),
    })
}
