//! Augmented Dickey-Fuller unit-root test
//!
//! The regression includes a constant. Lag length is chosen by AIC over a
//! common estimation sample, then the test regression is re-run on the
//! largest sample the chosen lag allows. P-values follow MacKinnon's (1994)
//! response-surface approximation; critical values follow MacKinnon (2010).

use crate::differencing::difference;
use crate::regression::{ols, OlsFit};
use crate::statistics::ensure_varies;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

// Response surface coefficients for the constant-only case with one
// integrated variable.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Critical values of the test statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

/// Outcome of an ADF test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t statistic of the lagged level coefficient
    pub statistic: f64,
    /// Approximate p-value under the unit-root null
    pub p_value: f64,
    /// Number of lagged differences in the test regression
    pub used_lag: usize,
    /// Observations in the test regression
    pub nobs: usize,
    pub critical_values: CriticalValues,
    /// `p_value < significance`
    pub is_stationary: bool,
}

/// Default maximum lag: `ceil(12 * (n / 100)^(1/4))`
pub fn default_max_lag(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Run the ADF test with a constant.
///
/// `max_lag` defaults to [`default_max_lag`]; it is further capped so the
/// regression keeps enough degrees of freedom.
pub fn adf_test(data: &[f64], max_lag: Option<usize>, significance: f64) -> Result<AdfResult> {
    if !(0.0..1.0).contains(&significance) || significance == 0.0 {
        return Err(MathError::InvalidInput(format!(
            "Significance level must lie in (0, 1), got {}",
            significance
        )));
    }
    if data.len() < 10 {
        return Err(MathError::InsufficientData(format!(
            "ADF test needs at least 10 observations, got {}",
            data.len()
        )));
    }
    ensure_varies(data, "Series")?;

    let diffs = difference(data, 1)?;
    let n = data.len();
    let cap = (n / 2).saturating_sub(2);
    let max_lag = max_lag.unwrap_or_else(|| default_max_lag(n)).min(cap);

    // lag selection on the common sample
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let fit = test_regression(data, &diffs, lag, max_lag)?;
        let aic = fit.aic();
        if best.map_or(true, |(_, best_aic)| aic < best_aic) {
            best = Some((lag, aic));
        }
    }
    let used_lag = best.map(|(lag, _)| lag).unwrap_or(0);

    let fit = test_regression(data, &diffs, used_lag, used_lag)?;
    let statistic = fit.t_values()[1];
    if !statistic.is_finite() {
        return Err(MathError::CalculationError(
            "ADF statistic is not finite".to_string(),
        ));
    }

    let p_value = mackinnon_p_value(statistic)?;
    let nobs = fit.nobs;

    Ok(AdfResult {
        statistic,
        p_value,
        used_lag,
        nobs,
        critical_values: critical_values(nobs),
        is_stationary: p_value < significance,
    })
}

/// Regress `Δy_t` on `[1, y_{t-1}, Δy_{t-1}, .., Δy_{t-lag}]`, dropping the
/// first `skip` differences so different lags share one sample.
fn test_regression(data: &[f64], diffs: &[f64], lag: usize, skip: usize) -> Result<OlsFit> {
    let rows = skip..diffs.len();
    let y: Vec<f64> = diffs[rows.clone()].to_vec();
    let design: Vec<Vec<f64>> = rows
        .map(|t| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(1.0);
            row.push(data[t]);
            row.extend((1..=lag).map(|i| diffs[t - i]));
            row
        })
        .collect();

    ols(&y, &design)
}

/// MacKinnon (1994) approximate p-value for the constant-only ADF statistic
pub fn mackinnon_p_value(statistic: f64) -> Result<f64> {
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }

    let poly: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = poly
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::CalculationError(e.to_string()))?;
    Ok(normal.cdf(z))
}

fn critical_values(nobs: usize) -> CriticalValues {
    let surface = |c: &[f64; 4]| {
        let n = nobs as f64;
        c[0] + c[1] / n + c[2] / n.powi(2) + c[3] / n.powi(3)
    };

    CriticalValues {
        one_percent: surface(&CRIT_1),
        five_percent: surface(&CRIT_5),
        ten_percent: surface(&CRIT_10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    #[test]
    fn test_random_walk_has_unit_root() {
        let mut level = 100.0;
        let walk: Vec<f64> = noise(800, 7)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect();

        let result = adf_test(&walk, None, 0.05).unwrap();
        assert!(!result.is_stationary, "p = {}", result.p_value);
        assert!(result.statistic > result.critical_values.five_percent);
    }

    #[test]
    fn test_white_noise_is_stationary() {
        let result = adf_test(&noise(800, 11), None, 0.05).unwrap();
        assert!(result.is_stationary, "p = {}", result.p_value);
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn test_p_value_is_monotone_and_bounded() {
        assert_eq!(mackinnon_p_value(5.0).unwrap(), 1.0);
        assert_eq!(mackinnon_p_value(-25.0).unwrap(), 0.0);
        let a = mackinnon_p_value(-4.0).unwrap();
        let b = mackinnon_p_value(-2.0).unwrap();
        let c = mackinnon_p_value(0.5).unwrap();
        assert!(a < b && b < c);
        // the 5% critical value should map close to p = 0.05
        let p = mackinnon_p_value(-2.8623).unwrap();
        assert!((p - 0.05).abs() < 0.01, "p = {}", p);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(matches!(
            adf_test(&[1.0; 50], None, 0.05),
            Err(MathError::DegenerateSeries(_))
        ));
        assert!(matches!(
            adf_test(&[1.0, 2.0], None, 0.05),
            Err(MathError::InsufficientData(_))
        ));
    }
}
