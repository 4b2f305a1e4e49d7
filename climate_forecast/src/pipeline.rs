//! End-to-end analysis: load, align, diagnose, fit, select, forecast
//!
//! Each stage takes the previous stage's output by reference and returns a
//! new value; the first error aborts the run.

use crate::align::{aggregate_daily, align, climatology, DailyClimateAggregate, MatchedSeries};
use crate::config::AnalysisConfig;
use crate::data::{ClimateRecords, DataLoader, PriceSeries};
use crate::diagnostics::{self, DiagnosticsReport};
use crate::error::{ForecastError, Result};
use crate::models::{
    fit_variant, FitSummary, FittedModel, ForecastResult, ModelFamily, ModelVariant,
    TrainedForecastModel,
};
use crate::selection::{select_final, select_finalists, Selection};
use crate::utils::future_dates;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations of the two input tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    pub prices: PathBuf,
    pub climate: PathBuf,
}

/// Parsed inputs before the join
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub prices: PriceSeries,
    pub climate: ClimateRecords,
    pub daily_climate: Vec<DailyClimateAggregate>,
}

/// Read both tables and average the stations per day
pub fn load(paths: &InputPaths, config: &AnalysisConfig) -> Result<LoadedData> {
    let prices = DataLoader::prices_from_csv(&paths.prices)?;
    let climate = DataLoader::climate_from_csv(&paths.climate, config.temperature_imputation)?;
    let daily_climate = aggregate_daily(&climate);
    info!(
        "Loaded {} prices and {} station reports from {} stations ({} days)",
        prices.len(),
        climate.len(),
        climate.station_count(),
        daily_climate.len()
    );

    Ok(LoadedData {
        prices,
        climate,
        daily_climate,
    })
}

/// Stage-one outcome for one family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyChoice {
    pub family: ModelFamily,
    pub variant: ModelVariant,
    pub criteria_agree: bool,
}

/// Everything a run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub series: MatchedSeries,
    pub diagnostics: DiagnosticsReport,
    pub train_len: usize,
    pub test_len: usize,
    /// All four fits on the training split
    pub candidates: Vec<FitSummary>,
    pub family_choices: Vec<FamilyChoice>,
    pub selection: Selection,
    /// The chosen variant as used for the final forecast
    pub final_model: FitSummary,
    pub forecast: ForecastResult,
    /// Temperatures assumed over the forecast dates
    pub future_temperatures: Vec<f64>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run diagnostics, fitting, selection and the final forecast on a matched series
pub fn analyze(series: &MatchedSeries, config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate()?;

    let diagnostics = diagnostics::run(series, &config.diagnostics)?;

    let (train, test) = series.split_at_fraction(config.train_fraction)?;
    info!(
        "Training on {} observations, holding out {}",
        train.len(),
        test.len()
    );

    let fitted = ModelVariant::ALL
        .iter()
        .map(|variant| fit_variant(*variant, &train, &config.optimizer))
        .collect::<Result<Vec<FittedModel>>>()?;
    let candidates: Vec<FitSummary> = fitted.iter().map(|m| m.summary().clone()).collect();

    let finalists = select_finalists(&fitted)?;
    let family_choices = finalists
        .iter()
        .map(|f| FamilyChoice {
            family: f.family,
            variant: f.variant(),
            criteria_agree: f.criteria_agree,
        })
        .collect();

    let selection = select_final(&finalists, &test)?;

    let final_model = if config.selection.refit_on_full_sample {
        fit_variant(selection.chosen, series, &config.optimizer)?
    } else {
        fitted
            .into_iter()
            .find(|m| m.variant() == selection.chosen)
            .ok_or_else(|| {
                ForecastError::ForecastingError(format!(
                    "Chosen variant {} was not fitted",
                    selection.chosen
                ))
            })?
    };
    let (forecast, future_temperatures) = forecast_ahead(&final_model, series, config)?;

    Ok(AnalysisReport {
        series: series.clone(),
        diagnostics,
        train_len: train.len(),
        test_len: test.len(),
        candidates,
        family_choices,
        selection,
        final_model: final_model.summary().clone(),
        forecast,
        future_temperatures,
    })
}

/// Forecast past the end of the history, feeding day-of-year mean temperatures
pub fn forecast_ahead(
    model: &FittedModel,
    history: &MatchedSeries,
    config: &AnalysisConfig,
) -> Result<(ForecastResult, Vec<f64>)> {
    let horizon = config.report.horizon;
    let last = history.last_date().ok_or_else(|| {
        ForecastError::DataError("Cannot forecast from an empty history".to_string())
    })?;
    let dates = future_dates(last, horizon, history.frequency());
    let temperatures = climatology(history, &dates)?;

    let forecast = model
        .forecast(horizon, Some(&temperatures))?
        .with_dates(dates)?;
    info!(
        "{} forecast for {} steps ending at {:.2}",
        model.name(),
        horizon,
        forecast.values().last().copied().unwrap_or(f64::NAN)
    );
    Ok((forecast, temperatures))
}

/// Load, align and analyze
pub fn run(paths: &InputPaths, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let loaded = load(paths, config)?;
    let series = align(&loaded.prices, &loaded.daily_climate, config.min_join_fraction)?;
    analyze(&series, config)
}
