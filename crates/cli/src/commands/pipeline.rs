//! Local pipeline stages: ingest, validate-split and train

use anyhow::{Context, Result};
use colored::Colorize;
use pricing_lib::{data, training, DataError, PipelineConfig};
use std::path::Path;

use crate::output::{
    format_shape, format_value, print_info, print_json, print_rows, print_success, print_warning,
    FieldRow, OutputFormat,
};

/// Copy the source dataset into the raw directory
pub fn ingest(cfg: &PipelineConfig, source: Option<&Path>, format: OutputFormat) -> Result<()> {
    let run_info = data::ingest(cfg, source).context("Ingestion failed")?;

    match format {
        OutputFormat::Json => print_json(&run_info)?,
        OutputFormat::Table => {
            print_success(&format!("Saved raw dataset to {}", run_info.saved_raw_path));
            print_rows(&[
                FieldRow::new("Dataset", &run_info.dataset),
                FieldRow::new("Shape", format_shape((run_info.rows, run_info.cols))),
                FieldRow::new("Target", &run_info.target_column),
                FieldRow::new("Features", run_info.feature_columns.join(", ")),
            ]);
            print_info(&format!(
                "Run info written to {}",
                cfg.run_info_path().display()
            ));
        }
    }

    Ok(())
}

/// Validate the raw dataset and write train/test splits
pub fn validate_split(cfg: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let summary = match data::validate_split(cfg) {
        Ok(summary) => summary,
        Err(DataError::ValidationFailed(errors)) => {
            for error in &errors {
                crate::output::print_error(error);
            }
            anyhow::bail!(
                "Dataset validation failed; see {}",
                cfg.validation_report_path().display()
            );
        }
        Err(err) => return Err(err).context("Validate-split failed"),
    };

    match format {
        OutputFormat::Json => print_json(&summary.report)?,
        OutputFormat::Table => {
            for warning in &summary.report.warnings {
                print_warning(warning);
            }
            println!("{}", "Validation Report".bold());
            print_rows(&[
                FieldRow::new("Rows", summary.report.rows),
                FieldRow::new("Columns", summary.report.cols),
                FieldRow::new("Missing values", summary.report.total_missing),
                FieldRow::new("Duplicate rows", summary.report.duplicate_rows),
                FieldRow::new("Train shape", format_shape(summary.train_shape)),
                FieldRow::new("Test shape", format_shape(summary.test_shape)),
            ]);
            print_success(&format!(
                "Wrote {} and {}",
                summary.train_path.display(),
                summary.test_path.display()
            ));
            print_info(&format!("Report: {}", summary.report_path.display()));
        }
    }

    Ok(())
}

/// Fit the pipeline and persist model, descriptor and metrics
pub fn train(cfg: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let outcome = training::train(cfg).context("Training failed")?;
    let metrics = &outcome.metrics;

    match format {
        OutputFormat::Json => print_json(metrics)?,
        OutputFormat::Table => {
            println!("{}", "Test Set Metrics".bold());
            print_rows(&[
                FieldRow::new("Model", format!("{} (alpha={})", metrics.model_type, metrics.ridge_alpha)),
                FieldRow::new("RMSE", format_value(metrics.rmse)),
                FieldRow::new("MAE", format_value(metrics.mae)),
                FieldRow::new("R2", format_value(metrics.r2)),
                FieldRow::new("Train rows", metrics.n_train),
                FieldRow::new("Test rows", metrics.n_test),
                FieldRow::new("Features", metrics.feature_count),
            ]);
            print_success(&format!("Saved model to {}", outcome.model_path.display()));
            print_info(&format!(
                "Checksum: {}",
                outcome.descriptor.model_sha256.dimmed()
            ));
        }
    }

    Ok(())
}
