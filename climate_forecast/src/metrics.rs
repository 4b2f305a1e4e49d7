//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use crate::models::{ForecastResult, IntervalLevel};
use serde::{Deserialize, Serialize};

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

/// Compare a forecast with the values that were realised
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    // zero actuals contribute nothing
    let mape = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .sum::<f64>()
        / n;

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let scale = a.abs() + f.abs();
            if scale == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / scale
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// Forecast performance against a held-out sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub accuracy: ForecastAccuracy,
    /// Direction accuracy percentage
    pub direction_accuracy: f64,
    /// Share of actual values inside the 80% band
    pub coverage_80: f64,
    /// Share of actual values inside the 95% band
    pub coverage_95: f64,
}

/// Evaluate a forecast with bands against actual values
pub fn evaluate_forecast(forecast: &ForecastResult, actual: &[f64]) -> Result<ForecastMetrics> {
    let accuracy = forecast_accuracy(forecast.values(), actual)?;

    Ok(ForecastMetrics {
        accuracy,
        direction_accuracy: direction_accuracy(forecast.values(), actual),
        coverage_80: interval_coverage(forecast, actual, IntervalLevel::Eighty)?,
        coverage_95: interval_coverage(forecast, actual, IntervalLevel::NinetyFive)?,
    })
}

/// Percentage of consecutive moves whose sign the forecast got right.
///
/// Flat steps in either series are skipped; 0 when nothing is left.
pub fn direction_accuracy(forecast: &[f64], actual: &[f64]) -> f64 {
    let moves: Vec<bool> = forecast
        .windows(2)
        .zip(actual.windows(2))
        .filter(|(f, a)| (f[1] - f[0]).abs() > 1e-10 && (a[1] - a[0]).abs() > 1e-10)
        .map(|(f, a)| (f[1] > f[0]) == (a[1] > a[0]))
        .collect();

    if moves.is_empty() {
        return 0.0;
    }
    moves.iter().filter(|&&correct| correct).count() as f64 / moves.len() as f64 * 100.0
}

/// Fraction of `actual` lying inside the band at `level`
pub fn interval_coverage(
    forecast: &ForecastResult,
    actual: &[f64],
    level: IntervalLevel,
) -> Result<f64> {
    if forecast.values().len() != actual.len() || actual.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let (lower, upper) = forecast.interval(level);
    let inside = actual
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .filter(|(a, (lo, hi))| *lo <= *a && *a <= *hi)
        .count();
    Ok(inside as f64 / actual.len() as f64)
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Performance Metrics:")?;
        writeln!(f, "  MAE:     {:.4}", self.accuracy.mae)?;
        writeln!(f, "  MSE:     {:.4}", self.accuracy.mse)?;
        writeln!(f, "  RMSE:    {:.4}", self.accuracy.rmse)?;
        writeln!(f, "  MAPE:    {:.4}%", self.accuracy.mape)?;
        writeln!(f, "  SMAPE:   {:.4}%", self.accuracy.smape)?;
        writeln!(f, "  Direction: {:.2}%", self.direction_accuracy)?;
        writeln!(f, "  80% band coverage: {:.1}%", self.coverage_80 * 100.0)?;
        writeln!(f, "  95% band coverage: {:.1}%", self.coverage_95 * 100.0)?;
        Ok(())
    }
}
