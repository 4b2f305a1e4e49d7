//! Autocorrelation, partial autocorrelation and cross-correlation functions
//!
//! All estimators use the biased (divide by `n`) autocovariance, which keeps
//! the implied autocovariance matrix positive semi-definite.

use crate::statistics::{ensure_varies, mean};
use crate::{MathError, Result};

/// Autocovariance at lags `0..=max_lag`
fn autocovariance(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let m = mean(data)?;
    let n = data.len();
    let centered: Vec<f64> = data.iter().map(|x| x - m).collect();

    Ok((0..=max_lag)
        .map(|lag| {
            centered[lag..]
                .iter()
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect())
}

/// Empirical autocorrelation function.
///
/// Returns `min(max_lag, n - 1) + 1` values, starting with lag 0 (always 1).
pub fn acf(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    if data.len() < 2 {
        return Err(MathError::InsufficientData(
            "Autocorrelation needs at least 2 observations".to_string(),
        ));
    }
    ensure_varies(data, "Series")?;

    let max_lag = max_lag.min(data.len() - 1);
    let gamma = autocovariance(data, max_lag)?;
    let gamma0 = gamma[0];

    Ok(gamma.into_iter().map(|g| g / gamma0).collect())
}

/// Partial autocorrelation function via the Durbin-Levinson recursion.
///
/// Lags are capped at `n / 2 - 1`. Index 0 holds 1.0.
pub fn pacf(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    if data.len() < 4 {
        return Err(MathError::InsufficientData(
            "Partial autocorrelation needs at least 4 observations".to_string(),
        ));
    }

    let max_lag = max_lag.min(data.len() / 2 - 1);
    let rho = acf(data, max_lag)?;

    let mut result = Vec::with_capacity(max_lag + 1);
    result.push(1.0);
    if max_lag == 0 {
        return Ok(result);
    }

    let mut phi = vec![rho[1]];
    result.push(rho[1]);

    for k in 2..=max_lag {
        let numerator = rho[k]
            - phi
                .iter()
                .enumerate()
                .map(|(j, p)| p * rho[k - 1 - j])
                .sum::<f64>();
        let denominator = 1.0
            - phi
                .iter()
                .enumerate()
                .map(|(j, p)| p * rho[j + 1])
                .sum::<f64>();

        if denominator.abs() < 1e-12 {
            return Err(MathError::CalculationError(format!(
                "Durbin-Levinson recursion broke down at lag {}",
                k
            )));
        }

        let phi_kk = numerator / denominator;
        let mut next: Vec<f64> = (0..k - 1)
            .map(|j| phi[j] - phi_kk * phi[k - 2 - j])
            .collect();
        next.push(phi_kk);
        phi = next;
        result.push(phi_kk);
    }

    Ok(result)
}

/// Cross-correlation of `x[t + k]` with `y[t]` for `k` in `-max_lag..=max_lag`.
///
/// A peak at positive `k` means `y` leads `x` by `k` steps.
pub fn ccf(x: &[f64], y: &[f64], max_lag: usize) -> Result<Vec<(isize, f64)>> {
    if x.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Cross-correlation needs equally long series ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(MathError::InsufficientData(
            "Cross-correlation needs at least 2 observations".to_string(),
        ));
    }
    ensure_varies(x, "First series")?;
    ensure_varies(y, "Second series")?;

    let n = x.len();
    let max_lag = max_lag.min(n - 1) as isize;
    let mx = mean(x)?;
    let my = mean(y)?;
    let sx = (x.iter().map(|v| (v - mx).powi(2)).sum::<f64>() / n as f64).sqrt();
    let sy = (y.iter().map(|v| (v - my).powi(2)).sum::<f64>() / n as f64).sqrt();

    let mut result = Vec::with_capacity((2 * max_lag + 1) as usize);
    for k in -max_lag..=max_lag {
        let shift = k.unsigned_abs();
        let sum: f64 = (0..n - shift)
            .map(|t| {
                let (xi, yi) = if k >= 0 { (t + shift, t) } else { (t, t + shift) };
                (x[xi] - mx) * (y[yi] - my)
            })
            .sum();
        result.push((k, sum / (n as f64 * sx * sy)));
    }

    Ok(result)
}

/// Approximate white-noise band for correlation estimates at confidence `z`
pub fn confidence_bound(n: usize, z: f64) -> f64 {
    if n == 0 {
        return f64::INFINITY;
    }
    z / (n as f64).sqrt()
}
