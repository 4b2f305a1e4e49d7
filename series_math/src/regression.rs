//! Ordinary least squares

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Result of an OLS regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    /// Estimated coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients
    pub std_errors: Vec<f64>,
    /// Residuals `y - X·beta`
    pub residuals: Vec<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Coefficient of determination (centered)
    pub r_squared: f64,
    /// Number of observations
    pub nobs: usize,
}

impl OlsFit {
    /// t statistics of the coefficients
    pub fn t_values(&self) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(self.std_errors.iter())
            .map(|(b, se)| if *se > 0.0 { b / se } else { f64::NAN })
            .collect()
    }

    /// Gaussian log-likelihood evaluated at the OLS estimate
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood() + self.coefficients.len() as f64 * (self.nobs as f64).ln()
    }
}

/// Regress `y` on the rows of `design`.
///
/// Every row must have the same number of columns; include a column of ones
/// for an intercept.
pub fn ols(y: &[f64], design: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    if design.len() != n {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but response has {} values",
            design.len(),
            n
        )));
    }

    let k = design.first().map(|row| row.len()).unwrap_or(0);
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix has no columns".to_string(),
        ));
    }
    if design.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "Design rows have differing lengths".to_string(),
        ));
    }
    if n <= k {
        return Err(MathError::InsufficientData(format!(
            "OLS with {} regressors needs more than {} observations, got {}",
            k, k, n
        )));
    }

    let x = DMatrix::from_fn(n, k, |i, j| design[i][j]);
    let y_vec = DVector::from_column_slice(y);

    let xtx = x.transpose() * &x;
    let xtx_inv = xtx.try_inverse().ok_or_else(|| {
        MathError::CalculationError("Design matrix is singular".to_string())
    })?;
    let beta = &xtx_inv * (x.transpose() * &y_vec);

    let residuals = &y_vec - &x * &beta;
    let ssr = residuals.dot(&residuals);
    let s2 = ssr / (n - k) as f64;

    let std_errors = (0..k)
        .map(|j| (s2 * xtx_inv[(j, j)]).max(0.0).sqrt())
        .collect();

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 0.0 };

    Ok(OlsFit {
        coefficients: beta.iter().cloned().collect(),
        std_errors,
        residuals: residuals.iter().cloned().collect(),
        ssr,
        r_squared,
        nobs: n,
    })
}
