//! Descriptive statistics over slices of observations

use crate::{MathError, Result};

/// Arithmetic mean of a series
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }

    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population variance (divides by `n`)
pub fn variance(data: &[f64]) -> Result<f64> {
    let m = mean(data)?;
    Ok(data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64)
}

/// Sample variance (divides by `n - 1`)
pub fn sample_variance(data: &[f64]) -> Result<f64> {
    if data.len() < 2 {
        return Err(MathError::InsufficientData(
            "Sample variance needs at least 2 observations".to_string(),
        ));
    }

    let m = mean(data)?;
    Ok(data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64)
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Result<f64> {
    Ok(variance(data)?.sqrt())
}

/// Pearson correlation between two equally long series
pub fn correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Series lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }

    let mx = mean(x)?;
    let my = mean(y)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }

    if sxx == 0.0 || syy == 0.0 {
        return Err(MathError::DegenerateSeries(
            "Correlation is undefined for a constant series".to_string(),
        ));
    }

    Ok(sxy / (sxx * syy).sqrt())
}

/// Fail with `DegenerateSeries` when every value is identical
pub(crate) fn ensure_varies(data: &[f64], what: &str) -> Result<()> {
    match data.first() {
        Some(first) if data.iter().any(|v| v != first) => Ok(()),
        Some(_) => Err(MathError::DegenerateSeries(format!("{} is constant", what))),
        None => Err(MathError::InsufficientData(format!("{} is empty", what))),
    }
}
