//! Checks for changing variance
//!
//! - Variance split: compares the variance of the two halves of a series.
//!   A heuristic with no sampling distribution behind it.
//! - Engle's ARCH LM test: regresses squared residuals on their own lags.

use crate::regression::ols;
use crate::statistics::variance;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Variances of the first and second half of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSplit {
    pub first_half: f64,
    pub second_half: f64,
    /// Larger variance divided by the smaller
    pub ratio: f64,
    /// `ratio > threshold`
    pub heteroskedastic: bool,
}

/// Split at the midpoint index and compare the half variances
pub fn variance_split(data: &[f64], threshold: f64) -> Result<VarianceSplit> {
    if threshold < 1.0 {
        return Err(MathError::InvalidInput(format!(
            "Variance ratio threshold must be at least 1, got {}",
            threshold
        )));
    }
    if data.len() < 4 {
        return Err(MathError::InsufficientData(
            "Variance split needs at least 4 observations".to_string(),
        ));
    }

    let mid = data.len() / 2;
    let first_half = variance(&data[..mid])?;
    let second_half = variance(&data[mid..])?;

    let (low, high) = if first_half <= second_half {
        (first_half, second_half)
    } else {
        (second_half, first_half)
    };
    if high == 0.0 {
        return Err(MathError::DegenerateSeries(
            "Both halves of the series are constant".to_string(),
        ));
    }
    let ratio = if low == 0.0 { f64::INFINITY } else { high / low };

    Ok(VarianceSplit {
        first_half,
        second_half,
        ratio,
        heteroskedastic: ratio > threshold,
    })
}

/// Engle's Lagrange multiplier test for ARCH effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchTestResult {
    /// `nobs * R²` of the auxiliary regression
    pub statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    pub nobs: usize,
    /// `p_value < significance`
    pub heteroskedastic: bool,
}

/// Regress `e²_t` on a constant and `e²_{t-1} .. e²_{t-lags}`
pub fn arch_lm_test(residuals: &[f64], lags: usize, significance: f64) -> Result<ArchTestResult> {
    if lags == 0 {
        return Err(MathError::InvalidInput(
            "ARCH test needs at least one lag".to_string(),
        ));
    }
    if residuals.len() < 2 * lags + 3 {
        return Err(MathError::InsufficientData(format!(
            "ARCH test with {} lags needs at least {} residuals, got {}",
            lags,
            2 * lags + 3,
            residuals.len()
        )));
    }

    let squared: Vec<f64> = residuals.iter().map(|e| e * e).collect();
    let y: Vec<f64> = squared[lags..].to_vec();
    let design: Vec<Vec<f64>> = (lags..squared.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lags + 1);
            row.push(1.0);
            row.extend((1..=lags).map(|i| squared[t - i]));
            row
        })
        .collect();

    let fit = ols(&y, &design)?;
    let statistic = fit.nobs as f64 * fit.r_squared;

    let chi2 = ChiSquared::new(lags as f64)
        .map_err(|e| MathError::CalculationError(e.to_string()))?;
    let p_value = 1.0 - chi2.cdf(statistic.max(0.0));

    Ok(ArchTestResult {
        statistic,
        p_value,
        lags,
        nobs: fit.nobs,
        heteroskedastic: p_value < significance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_split_flags_growing_variance() {
        let mut data: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        data.extend((0..50).map(|i| if i % 2 == 0 { 5.0 } else { -5.0 }));

        let split = variance_split(&data, 2.0).unwrap();
        assert!((split.ratio - 25.0).abs() < 1e-9);
        assert!(split.heteroskedastic);
    }

    #[test]
    fn test_variance_split_accepts_homogeneous_series() {
        let data: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let split = variance_split(&data, 2.0).unwrap();
        assert!(!split.heteroskedastic);
        assert!(matches!(
            variance_split(&[3.0; 10], 2.0),
            Err(MathError::DegenerateSeries(_))
        ));
    }

    #[test]
    fn test_arch_lm_detects_volatility_clusters() {
        // quiet and loud regimes alternating in blocks of 20
        let residuals: Vec<f64> = (0..400)
            .map(|i| {
                let scale = if (i / 20) % 2 == 0 { 0.1 } else { 3.0 };
                let sign = if i % 3 == 0 { 1.0 } else { -1.0 };
                sign * scale * (1.0 + (i % 7) as f64 / 10.0)
            })
            .collect();

        let result = arch_lm_test(&residuals, 5, 0.05).unwrap();
        assert!(result.heteroskedastic, "p = {}", result.p_value);
        assert_eq!(result.nobs, 395);
    }

    #[test]
    fn test_arch_lm_rejects_bad_arguments() {
        assert!(arch_lm_test(&[1.0, 2.0, 3.0], 0, 0.05).is_err());
        assert!(arch_lm_test(&[1.0, 2.0, 3.0], 5, 0.05).is_err());
    }
}
