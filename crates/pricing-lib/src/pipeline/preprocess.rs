//! Preprocessing stage: column selection, imputation, scaling
//!
//! Missing cells are NaN. Statistics are learned at fit time and stored in
//! the artifact; transform only applies them.

use crate::error::TrainingError;
use crate::models::FeatureMatrix;
use crate::predictor::{ColumnSelection, Stage, TransformerColumns};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Strategy for filling missing values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    #[default]
    Median,
    Mean,
}

/// Per-column imputer. An all-missing column is filled with 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputer {
    pub strategy: ImputeStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Vec<f64>>,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            statistics: None,
        }
    }

    fn fit(&mut self, rows: &[Vec<f64>], n_cols: usize) {
        let stats = (0..n_cols)
            .map(|col| {
                let mut present: Vec<f64> = rows
                    .iter()
                    .map(|row| row[col])
                    .filter(|v| !v.is_nan())
                    .collect();
                if present.is_empty() {
                    return 0.0;
                }
                match self.strategy {
                    ImputeStrategy::Mean => present.iter().sum::<f64>() / present.len() as f64,
                    ImputeStrategy::Median => median(&mut present),
                }
            })
            .collect();
        self.statistics = Some(stats);
    }

    fn transform_in_place(&self, rows: &mut [Vec<f64>]) -> Result<()> {
        let Some(stats) = &self.statistics else {
            bail!("imputer is not fitted");
        };
        for row in rows.iter_mut() {
            if row.len() != stats.len() {
                bail!("imputer expects {} features, got {}", stats.len(), row.len());
            }
            for (value, fill) in row.iter_mut().zip(stats) {
                if value.is_nan() {
                    *value = *fill;
                }
            }
        }
        Ok(())
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Learned standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Z-score scaler using the population standard deviation.
/// Constant columns get a scale of 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ScalerParams>,
}

impl StandardScaler {
    fn fit(&mut self, rows: &[Vec<f64>], n_cols: usize) {
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; n_cols];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut scale = vec![0.0; n_cols];
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        for s in scale.iter_mut() {
            let std = (*s / n).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        self.params = Some(ScalerParams { mean, scale });
    }

    fn transform_in_place(&self, rows: &mut [Vec<f64>]) -> Result<()> {
        let Some(params) = &self.params else {
            bail!("scaler is not fitted");
        };
        for row in rows.iter_mut() {
            if row.len() != params.mean.len() {
                bail!(
                    "scaler expects {} features, got {}",
                    params.mean.len(),
                    row.len()
                );
            }
            for ((value, mean), scale) in row.iter_mut().zip(&params.mean).zip(&params.scale) {
                *value = (*value - mean) / scale;
            }
        }
        Ok(())
    }
}

/// Impute then scale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericTransformer {
    pub imputer: SimpleImputer,
    pub scaler: StandardScaler,
}

impl NumericTransformer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            imputer: SimpleImputer::new(strategy),
            scaler: StandardScaler::default(),
        }
    }

    fn fit_transform(&mut self, mut rows: Vec<Vec<f64>>, n_cols: usize) -> Result<Vec<Vec<f64>>> {
        self.imputer.fit(&rows, n_cols);
        self.imputer.transform_in_place(&mut rows)?;
        self.scaler.fit(&rows, n_cols);
        self.scaler.transform_in_place(&mut rows)?;
        Ok(rows)
    }

    fn transform(&self, mut rows: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
        self.imputer.transform_in_place(&mut rows)?;
        self.scaler.transform_in_place(&mut rows)?;
        Ok(rows)
    }
}

/// `(name, transformer, columns)` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerEntry {
    pub name: String,
    pub transformer: NumericTransformer,
    pub columns: ColumnSelection,
}

/// What happens to columns no entry claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remainder {
    #[default]
    Drop,
    Passthrough,
}

/// Applies transformers to column subsets and concatenates their outputs.
///
/// `transformers` holds the declaration; `fitted_transformers` is filled by
/// [`ColumnTransformer::fit_transform`] and is what inference uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub transformers: Vec<TransformerEntry>,
    #[serde(default)]
    pub remainder: Remainder,
    #[serde(default)]
    pub fitted_transformers: Vec<TransformerEntry>,
}

impl ColumnTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transformer(
        mut self,
        name: impl Into<String>,
        transformer: NumericTransformer,
        columns: ColumnSelection,
    ) -> Self {
        self.transformers.push(TransformerEntry {
            name: name.into(),
            transformer,
            columns,
        });
        self
    }

    pub fn with_remainder(mut self, remainder: Remainder) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.fitted_transformers.is_empty()
    }

    /// Fit every declared entry and return the transformed matrix.
    pub fn fit_transform(&mut self, data: &FeatureMatrix) -> Result<Vec<Vec<f64>>, TrainingError> {
        if data.rows.is_empty() {
            return Err(TrainingError::EmptyData);
        }

        let mut fitted = Vec::with_capacity(self.transformers.len());
        let mut blocks = Vec::with_capacity(self.transformers.len());
        for entry in &self.transformers {
            let indices = resolve_columns(&entry.columns, &self.transformers, data)
                .map_err(TrainingError::MissingColumn)?;
            let mut transformer = entry.transformer.clone();
            let block = select(&data.rows, &indices)
                .and_then(|rows| transformer.fit_transform(rows, indices.len()))
                .map_err(|cause| TrainingError::Transform {
                    transformer: entry.name.clone(),
                    cause,
                })?;
            blocks.push(block);
            fitted.push(TransformerEntry {
                name: entry.name.clone(),
                transformer,
                columns: entry.columns.clone(),
            });
        }
        if self.remainder == Remainder::Passthrough {
            let rest = remainder_indices(&self.transformers, data)
                .map_err(TrainingError::MissingColumn)?;
            let block = select(&data.rows, &rest).map_err(|cause| TrainingError::Transform {
                transformer: "remainder".to_string(),
                cause,
            })?;
            blocks.push(block);
        }

        self.fitted_transformers = fitted;
        Ok(concat_blocks(blocks, data.rows.len()))
    }

    /// Apply the fitted entries to a batch.
    pub fn transform(&self, data: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        if !self.is_fitted() {
            bail!("column transformer is not fitted");
        }

        let mut blocks = Vec::with_capacity(self.fitted_transformers.len() + 1);
        for entry in &self.fitted_transformers {
            let indices = resolve_columns(&entry.columns, &self.fitted_transformers, data)
                .map_err(|missing| anyhow::anyhow!("column '{missing}' not found in input batch"))?;
            blocks.push(entry.transformer.transform(select(&data.rows, &indices)?)?);
        }
        if self.remainder == Remainder::Passthrough {
            let rest = remainder_indices(&self.fitted_transformers, data)
                .map_err(|missing| anyhow::anyhow!("column '{missing}' not found in input batch"))?;
            blocks.push(select(&data.rows, &rest)?);
        }
        Ok(concat_blocks(blocks, data.rows.len()))
    }
}

impl Stage for ColumnTransformer {
    fn fitted_transformers(&self) -> Option<Vec<TransformerColumns<'_>>> {
        if !self.is_fitted() {
            return None;
        }
        Some(
            self.fitted_transformers
                .iter()
                .map(|entry| TransformerColumns {
                    name: &entry.name,
                    columns: &entry.columns,
                })
                .collect(),
        )
    }
}

/// Resolve a selection to batch positions. `Err` carries the missing column.
fn resolve_columns(
    selection: &ColumnSelection,
    all: &[TransformerEntry],
    data: &FeatureMatrix,
) -> Result<Vec<usize>, String> {
    match selection {
        ColumnSelection::Names(names) => names
            .iter()
            .map(|name| data.column_index(name).ok_or_else(|| name.clone()))
            .collect(),
        ColumnSelection::Indices(indices) => indices
            .iter()
            .map(|&i| {
                if i < data.columns.len() {
                    Ok(i)
                } else {
                    Err(format!("#{i}"))
                }
            })
            .collect(),
        ColumnSelection::Remainder => remainder_indices(all, data),
    }
}

fn remainder_indices(all: &[TransformerEntry], data: &FeatureMatrix) -> Result<Vec<usize>, String> {
    let mut claimed = HashSet::new();
    for entry in all {
        match &entry.columns {
            ColumnSelection::Remainder => {}
            other => claimed.extend(resolve_columns(other, all, data)?),
        }
    }
    Ok((0..data.columns.len())
        .filter(|i| !claimed.contains(i))
        .collect())
}

/// Pick `indices` out of every row. A row too short for an index is an error.
fn select(rows: &[Vec<f64>], indices: &[usize]) -> Result<Vec<Vec<f64>>> {
    rows.iter()
        .enumerate()
        .map(|(r, row)| {
            indices
                .iter()
                .map(|&i| {
                    row.get(i).copied().ok_or_else(|| {
                        anyhow::anyhow!("row {r} has {} values, column #{i} requested", row.len())
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect()
}

fn concat_blocks(blocks: Vec<Vec<Vec<f64>>>, n_rows: usize) -> Vec<Vec<f64>> {
    let mut out = vec![Vec::new(); n_rows];
    for block in blocks {
        for (dst, src) in out.iter_mut().zip(block) {
            dst.extend(src);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn matrix(columns: &[&str], rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let columns: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        FeatureMatrix::new(Arc::from(columns), rows)
    }

    fn numeric(names: &[&str]) -> ColumnTransformer {
        ColumnTransformer::new().with_transformer(
            "num",
            NumericTransformer::new(ImputeStrategy::Median),
            ColumnSelection::Names(names.iter().map(|s| s.to_string()).collect()),
        )
    }

    #[test]
    fn test_median_imputation_ignores_nan() {
        let mut imputer = SimpleImputer::new(ImputeStrategy::Median);
        let rows = vec![vec![1.0], vec![f64::NAN], vec![3.0], vec![10.0]];
        imputer.fit(&rows, 1);
        assert_eq!(imputer.statistics, Some(vec![3.0]));

        let mut rows = rows;
        imputer.transform_in_place(&mut rows).unwrap();
        assert_eq!(rows[1][0], 3.0);
    }

    #[test]
    fn test_all_missing_column_imputes_zero() {
        let mut imputer = SimpleImputer::new(ImputeStrategy::Mean);
        imputer.fit(&[vec![f64::NAN], vec![f64::NAN]], 1);
        assert_eq!(imputer.statistics, Some(vec![0.0]));
    }

    #[test]
    fn test_scaler_population_std_and_constant_column() {
        let mut scaler = StandardScaler::default();
        let mut rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        scaler.fit(&rows, 2);
        let params = scaler.params.clone().unwrap();
        assert_eq!(params.mean, vec![2.0, 5.0]);
        assert_eq!(params.scale, vec![1.0, 1.0]);

        scaler.transform_in_place(&mut rows).unwrap();
        assert_eq!(rows, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_unfitted_column_transformer_has_no_fitted_entries() {
        let ct = numeric(&["a", "b"]);
        assert!(ct.fitted_transformers().is_none());
        assert!(ct.transform(&matrix(&["a", "b"], vec![vec![1.0, 2.0]])).is_err());
    }

    #[test]
    fn test_fit_populates_fitted_entries_and_drops_remainder() {
        let mut ct = numeric(&["b", "a"]);
        let data = matrix(
            &["a", "b", "ignored"],
            vec![vec![1.0, 10.0, 7.0], vec![3.0, 30.0, 7.0]],
        );
        let out = ct.fit_transform(&data).unwrap();
        assert_eq!(out, vec![vec![-1.0, -1.0], vec![1.0, 1.0]]);

        let entries = ct.fitted_transformers().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "num");
        assert_eq!(
            entries[0].columns,
            &ColumnSelection::Names(vec!["b".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn test_transform_selects_by_name_regardless_of_batch_order() {
        let mut ct = numeric(&["a", "b"]);
        ct.fit_transform(&matrix(&["a", "b"], vec![vec![0.0, 0.0], vec![2.0, 4.0]]))
            .unwrap();

        let out = ct
            .transform(&matrix(&["b", "a"], vec![vec![4.0, 2.0]]))
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 1.0]]);
    }

    #[test]
    fn test_transform_missing_column_is_error() {
        let mut ct = numeric(&["a", "b"]);
        ct.fit_transform(&matrix(&["a", "b"], vec![vec![0.0, 1.0], vec![1.0, 2.0]]))
            .unwrap();
        let err = ct
            .transform(&matrix(&["a"], vec![vec![1.0]]))
            .unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_fit_missing_column_is_training_error() {
        let mut ct = numeric(&["a", "zzz"]);
        let err = ct
            .fit_transform(&matrix(&["a"], vec![vec![1.0]]))
            .unwrap_err();
        assert!(matches!(err, TrainingError::MissingColumn(ref c) if c == "zzz"));
    }

    #[test]
    fn test_fit_on_short_row_keeps_cause() {
        let mut ct = numeric(&["a", "b"]);
        let err = ct
            .fit_transform(&matrix(&["a", "b"], vec![vec![1.0, 2.0], vec![3.0]]))
            .unwrap_err();

        match &err {
            TrainingError::Transform { transformer, .. } => assert_eq!(transformer, "num"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("row 1 has 1 values"));
        assert!(!ct.is_fitted());
    }

    #[test]
    fn test_transform_short_row_is_error() {
        let mut ct = numeric(&["a", "b"]);
        ct.fit_transform(&matrix(&["a", "b"], vec![vec![1.0, 2.0], vec![3.0, 4.0]]))
            .unwrap();
        assert!(ct.transform(&matrix(&["a", "b"], vec![vec![1.0]])).is_err());
    }

    #[test]
    fn test_passthrough_remainder_appends_unclaimed_columns() {
        let mut ct = numeric(&["a"]).with_remainder(Remainder::Passthrough);
        let out = ct
            .fit_transform(&matrix(&["a", "extra"], vec![vec![1.0, 9.0], vec![3.0, 8.0]]))
            .unwrap();
        assert_eq!(out, vec![vec![-1.0, 9.0], vec![1.0, 8.0]]);
    }
}
