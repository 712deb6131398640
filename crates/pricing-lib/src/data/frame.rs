//! In-memory CSV table
//!
//! Cells are kept as text so ingest and split write files back unchanged.
//! Numeric views parse on demand; empty, `NA` and `NaN` cells are missing.

use crate::error::DataError;
use crate::models::FeatureMatrix;
use std::path::Path;
use std::sync::Arc;

const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "None"];

/// One parsed cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Number(f64),
    Missing,
    Text,
}

pub fn parse_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        return Cell::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => Cell::Missing,
        Ok(v) => Cell::Number(v),
        Err(_) => Cell::Text,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Self { headers, records }
    }

    pub fn read_csv(path: &Path) -> Result<Self, DataError> {
        let csv_error = |source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            if record.len() != headers.len() {
                return Err(DataError::RaggedRow {
                    row: i + 1,
                    expected: headers.len(),
                    got: record.len(),
                });
            }
            records.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, records })
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), DataError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DataError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let csv_error = |source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        writer.write_record(&self.headers).map_err(csv_error)?;
        for record in &self.records {
            writer.write_record(record).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Rename a column; returns false if `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn cells(&self, col: usize) -> impl Iterator<Item = Cell> + '_ {
        self.records.iter().map(move |r| parse_cell(&r[col]))
    }

    /// Column as floats, NaN where a cell is missing or not a number.
    pub fn numeric_column(&self, col: usize) -> Vec<f64> {
        self.cells(col)
            .map(|cell| match cell {
                Cell::Number(v) => v,
                Cell::Missing | Cell::Text => f64::NAN,
            })
            .collect()
    }

    /// New frame with the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            headers: self.headers.clone(),
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }

    /// Named numeric matrix over `columns`; `Err` carries the first absent name.
    pub fn to_feature_matrix(&self, columns: &[String]) -> Result<FeatureMatrix, String> {
        let indices = columns
            .iter()
            .map(|name| self.column_index(name).ok_or_else(|| name.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .records
            .iter()
            .map(|record| {
                indices
                    .iter()
                    .map(|&i| match parse_cell(&record[i]) {
                        Cell::Number(v) => v,
                        Cell::Missing | Cell::Text => f64::NAN,
                    })
                    .collect()
            })
            .collect();

        Ok(FeatureMatrix::new(Arc::from(columns.to_vec()), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell(" 3.5 "), Cell::Number(3.5));
        assert_eq!(parse_cell("-118.25"), Cell::Number(-118.25));
        assert_eq!(parse_cell(""), Cell::Missing);
        assert_eq!(parse_cell("NA"), Cell::Missing);
        assert_eq!(parse_cell("NaN"), Cell::Missing);
        assert_eq!(parse_cell("NEAR BAY"), Cell::Text);
    }

    #[test]
    fn test_csv_round_trip_preserves_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/frame.csv");
        let frame = Frame::new(
            vec!["a".into(), "label".into()],
            vec![vec!["1.5".into(), "NEAR BAY".into()], vec!["".into(), "x".into()]],
        );
        frame.write_csv(&path).unwrap();

        let back = Frame::read_csv(&path).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2\n3\n").unwrap();
        let err = Frame::read_csv(&path).unwrap_err();
        assert!(matches!(err, DataError::RaggedRow { row: 2, expected: 2, got: 1 }));
    }

    #[test]
    fn test_feature_matrix_by_name() {
        let frame = Frame::new(
            vec!["a".into(), "b".into(), "y".into()],
            vec![vec!["1".into(), "NA".into(), "3".into()]],
        );
        let m = frame
            .to_feature_matrix(&["b".to_string(), "a".to_string()])
            .unwrap();
        assert!(m.rows[0][0].is_nan());
        assert_eq!(m.rows[0][1], 1.0);

        let missing = frame.to_feature_matrix(&["zzz".to_string()]).unwrap_err();
        assert_eq!(missing, "zzz");
    }

    #[test]
    fn test_rename_and_take_rows() {
        let mut frame = Frame::new(
            vec!["x".into(), "target".into()],
            vec![vec!["1".into(), "10".into()], vec!["2".into(), "20".into()]],
        );
        assert!(frame.rename_column("target", "MedHouseVal"));
        assert!(!frame.rename_column("target", "other"));

        let picked = frame.take_rows(&[1]);
        assert_eq!(picked.headers[1], "MedHouseVal");
        assert_eq!(picked.records, vec![vec!["2".to_string(), "20".to_string()]]);
    }
}
