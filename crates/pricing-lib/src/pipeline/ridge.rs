//! L2-regularized linear regression
//!
//! Solves `(XcᵀXc + αI) w = Xcᵀ(y - ȳ)` on centered data with a Cholesky
//! factorization, so the intercept is never penalized.

use crate::error::TrainingError;
use crate::predictor::Stage;
use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Learned coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegressor {
    pub alpha: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<LinearParams>,
}

impl RidgeRegressor {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            params: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn fit(&mut self, rows: &[Vec<f64>], target: &[f64]) -> Result<(), TrainingError> {
        let n = rows.len();
        if n == 0 || target.len() != n {
            return Err(TrainingError::EmptyData);
        }
        let p = rows[0].len();
        if p == 0 {
            return Err(TrainingError::NoFeatures);
        }

        let x = Array2::from_shape_fn((n, p), |(i, j)| rows[i][j]);
        let y = Array1::from_vec(target.to_vec());

        let x_mean = x.mean_axis(Axis(0)).ok_or(TrainingError::EmptyData)?;
        let y_mean = y.mean().ok_or(TrainingError::EmptyData)?;
        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let mut gram = xc.t().dot(&xc);
        for i in 0..p {
            gram[[i, i]] += self.alpha;
        }
        let rhs = xc.t().dot(&yc);

        let coef = cholesky_solve(&gram, &rhs).ok_or(TrainingError::Singular)?;
        let intercept = y_mean - x_mean.dot(&coef);

        self.params = Some(LinearParams {
            coef: coef.to_vec(),
            intercept,
        });
        Ok(())
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let Some(params) = &self.params else {
            bail!("ridge model is not fitted");
        };
        rows.iter()
            .map(|row| {
                if row.len() != params.coef.len() {
                    bail!(
                        "model expects {} features, got {}",
                        params.coef.len(),
                        row.len()
                    );
                }
                Ok(row
                    .iter()
                    .zip(&params.coef)
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + params.intercept)
            })
            .collect()
    }
}

impl Stage for RidgeRegressor {}

/// Solve `a x = b` for symmetric positive definite `a`.
/// Returns `None` when `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        // Relative tolerance: exact collinearity can leave rounding noise.
        if !diag.is_finite() || diag <= a[[j, j]].abs() * 1e-12 {
            return None;
        }
        let diag = diag.sqrt();
        l[[j, j]] = diag;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / diag;
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cholesky_solves_spd_system() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        let back = a.dot(&x);
        assert!((back[0] - 2.0).abs() < 1e-12);
        assert!((back[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_singular() {
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(cholesky_solve(&a, &array![1.0, 1.0]).is_none());
    }

    #[test]
    fn test_zero_alpha_recovers_exact_line() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 * i as f64 + 2.0).collect();

        let mut model = RidgeRegressor::new(0.0);
        model.fit(&rows, &y).unwrap();
        let params = model.params.as_ref().unwrap();
        assert!((params.coef[0] - 3.0).abs() < 1e-9);
        assert!((params.intercept - 2.0).abs() < 1e-9);

        let pred = model.predict(&[vec![20.0]]).unwrap();
        assert!((pred[0] - 62.0).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_shrinks_coefficients() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 * i as f64).collect();

        let mut free = RidgeRegressor::new(0.0);
        free.fit(&rows, &y).unwrap();
        let mut shrunk = RidgeRegressor::new(100.0);
        shrunk.fit(&rows, &y).unwrap();

        let free_w = free.params.unwrap().coef[0];
        let shrunk_w = shrunk.params.unwrap().coef[0];
        assert!(shrunk_w.abs() < free_w.abs());
        assert!(shrunk_w > 0.0);
    }

    #[test]
    fn test_collinear_features_without_alpha_are_singular() {
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let err = RidgeRegressor::new(0.0).fit(&rows, &y).unwrap_err();
        assert!(matches!(err, TrainingError::Singular));

        // Any positive alpha makes the system solvable.
        assert!(RidgeRegressor::new(1.0).fit(&rows, &y).is_ok());
    }

    #[test]
    fn test_predict_requires_fit_and_matching_width() {
        let model = RidgeRegressor::new(1.0);
        assert!(model.predict(&[vec![1.0]]).is_err());

        let mut model = RidgeRegressor::new(1.0);
        model
            .fit(&[vec![1.0, 2.0], vec![2.0, 1.0], vec![0.0, 0.0]], &[1.0, 2.0, 3.0])
            .unwrap();
        assert!(model.predict(&[vec![1.0]]).is_err());
    }
}
