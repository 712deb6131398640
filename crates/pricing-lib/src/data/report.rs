//! Dataset validation report

use super::frame::{Cell, Frame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Summary written to `validation_report.json`. Any entry in `errors`
/// stops the split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<String>,
    pub missing_by_column: BTreeMap<String, usize>,
    pub total_missing: usize,
    pub duplicate_rows: usize,
    pub target_column: String,
    pub target_missing: Option<usize>,
    pub numeric_columns: Vec<String>,
    pub min_max: BTreeMap<String, MinMax>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at_utc: DateTime<Utc>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn build_report(frame: &Frame, target_column: &str) -> ValidationReport {
    let mut missing_by_column = BTreeMap::new();
    let mut numeric_columns = Vec::new();
    let mut min_max = BTreeMap::new();

    for (idx, name) in frame.headers.iter().enumerate() {
        let mut missing = 0usize;
        let mut is_numeric = true;
        let mut lo: Option<f64> = None;
        let mut hi: Option<f64> = None;

        for cell in frame.cells(idx) {
            match cell {
                Cell::Missing => missing += 1,
                Cell::Text => is_numeric = false,
                Cell::Number(v) => {
                    lo = Some(lo.map_or(v, |m| m.min(v)));
                    hi = Some(hi.map_or(v, |m| m.max(v)));
                }
            }
        }

        missing_by_column.insert(name.clone(), missing);
        if is_numeric {
            numeric_columns.push(name.clone());
            min_max.insert(name.clone(), MinMax { min: lo, max: hi });
        }
    }

    let total_missing: usize = missing_by_column.values().sum();
    let duplicate_rows = count_duplicates(frame);
    let target_missing = frame
        .column_index(target_column)
        .map(|_| missing_by_column.get(target_column).copied().unwrap_or(0));

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if target_missing.is_none() {
        errors.push(format!("Target column '{target_column}' not found in data."));
    }
    if frame.n_rows() == 0 {
        errors.push("Dataset has 0 rows.".to_string());
    }
    if frame.n_cols() == 0 {
        errors.push("Dataset has 0 columns.".to_string());
    }
    if numeric_columns.len() != frame.n_cols() {
        let non_numeric: Vec<&String> = frame
            .headers
            .iter()
            .filter(|h| !numeric_columns.contains(*h))
            .collect();
        warnings.push(format!("Non-numeric columns found: {non_numeric:?}"));
    }
    if total_missing > 0 {
        warnings.push("Missing values detected (imputed during preprocessing).".to_string());
    }
    if duplicate_rows > 0 {
        warnings.push("Duplicate rows detected (consider dropping them).".to_string());
    }

    ValidationReport {
        rows: frame.n_rows(),
        cols: frame.n_cols(),
        columns: frame.headers.clone(),
        missing_by_column,
        total_missing,
        duplicate_rows,
        target_column: target_column.to_string(),
        target_missing,
        numeric_columns,
        min_max,
        errors,
        warnings,
        generated_at_utc: Utc::now(),
    }
}

/// Rows identical to an earlier row.
fn count_duplicates(frame: &Frame) -> usize {
    let mut seen = HashSet::with_capacity(frame.n_rows());
    frame
        .records
        .iter()
        .filter(|record| !seen.insert(record.as_slice()))
        .count()
}
