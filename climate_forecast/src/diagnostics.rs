//! Exploratory diagnostics over the matched series
//!
//! Nothing here gates the pipeline: the report carries the results so a
//! reader can judge the modeling choices.

use crate::align::MatchedSeries;
use crate::config::DiagnosticsConfig;
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use series_math::{
    acf, adf_test, arch_lm_test, ccf, confidence_bound, difference, pacf, variance_split,
    AdfResult, ArchTestResult, VarianceSplit,
};

/// Sample correlation functions of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationProfile {
    /// Index `k` holds lag `k`
    pub acf: Vec<f64>,
    pub pacf: Vec<f64>,
    /// ±1.96/√n white-noise band
    pub band: f64,
}

impl CorrelationProfile {
    pub fn compute(series: &[f64], max_lag: usize) -> Result<Self> {
        Ok(Self {
            acf: acf(series, max_lag)?,
            pacf: pacf(series, max_lag)?,
            band: confidence_bound(series.len(), 1.96),
        })
    }

    /// Lags (excluding 0) whose partial autocorrelation leaves the band
    pub fn significant_pacf_lags(&self) -> Vec<usize> {
        self.pacf
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, v)| v.abs() > self.band)
            .map(|(lag, _)| lag)
            .collect()
    }
}

/// Everything the diagnostics stage reports about one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDiagnostics {
    pub name: String,
    pub stationarity: AdfResult,
    pub correlations: CorrelationProfile,
    pub variance_split: VarianceSplit,
}

impl SeriesDiagnostics {
    pub fn compute(name: &str, series: &[f64], config: &DiagnosticsConfig) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            stationarity: adf_test(series, None, config.significance)?,
            correlations: CorrelationProfile::compute(series, config.max_lag)?,
            variance_split: variance_split(series, config.variance_ratio_threshold)?,
        })
    }
}

/// Diagnostics of prices, price changes and temperatures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub price: SeriesDiagnostics,
    pub price_changes: SeriesDiagnostics,
    pub temperature: SeriesDiagnostics,
    /// Engle's test on the demeaned price changes
    pub arch_effects: ArchTestResult,
    /// `(k, corr(price[t + k], temperature[t]))`
    pub cross_correlation: Vec<(isize, f64)>,
}

impl DiagnosticsReport {
    /// Cross-correlation lag with the largest absolute value
    pub fn strongest_cross_lag(&self) -> Option<(isize, f64)> {
        self.cross_correlation
            .iter()
            .cloned()
            .fold(None, |best: Option<(isize, f64)>, item| match best {
                Some(b) if b.1.abs() >= item.1.abs() => Some(b),
                _ => Some(item),
            })
    }
}

/// Run every diagnostic over a matched series
pub fn run(series: &MatchedSeries, config: &DiagnosticsConfig) -> Result<DiagnosticsReport> {
    let prices = series.prices();
    let temperatures = series.temperatures();
    let changes = difference(&prices, 1)?;

    let price = SeriesDiagnostics::compute("price", &prices, config)?;
    let price_changes = SeriesDiagnostics::compute("price change", &changes, config)?;
    let temperature = SeriesDiagnostics::compute("temperature", &temperatures, config)?;

    let mean_change = changes.iter().sum::<f64>() / changes.len() as f64;
    let demeaned: Vec<f64> = changes.iter().map(|c| c - mean_change).collect();
    let arch_effects = arch_lm_test(&demeaned, config.arch_lags, config.significance)?;

    let cross_correlation = ccf(&prices, &temperatures, config.ccf_max_lag)?;

    info!(
        "ADF p-values: price {:.4}, price change {:.4}, temperature {:.4}",
        price.stationarity.p_value,
        price_changes.stationarity.p_value,
        temperature.stationarity.p_value
    );

    Ok(DiagnosticsReport {
        price,
        price_changes,
        temperature,
        arch_effects,
        cross_correlation,
    })
}
