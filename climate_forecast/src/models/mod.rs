//! Forecasting models for the matched price and temperature series

use crate::align::MatchedSeries;
use crate::config::OptimizerConfig;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::{self, Debug};

pub mod arima;
pub mod garch;
pub(crate) mod optimizer;

pub use arima::{ArimaModel, TrainedArimaModel};
pub use garch::{GarchModel, TrainedGarchModel};

/// Prediction interval coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalLevel {
    Eighty,
    NinetyFive,
}

impl IntervalLevel {
    pub fn coverage(self) -> f64 {
        match self {
            IntervalLevel::Eighty => 0.80,
            IntervalLevel::NinetyFive => 0.95,
        }
    }
}

/// Two-sided standard normal quantile for `coverage`
pub fn normal_quantile(coverage: f64) -> Result<f64> {
    if coverage <= 0.0 || coverage >= 1.0 {
        return Err(ForecastError::ValidationError(
            "Confidence level must be between 0 and 1".to_string(),
        ));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + coverage / 2.0))
}

/// Point forecasts with standard errors and 80%/95% normal bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForecastRecord")]
pub struct ForecastResult {
    /// Forecasted values
    pub(crate) values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
    pub(crate) std_errors: Vec<f64>,
    lower_80: Vec<f64>,
    upper_80: Vec<f64>,
    lower_95: Vec<f64>,
    upper_95: Vec<f64>,
    /// Dates of the forecast steps (optional)
    pub(crate) dates: Option<Vec<NaiveDate>>,
}

/// Unchecked field layout of a serialized [`ForecastResult`]
#[derive(Deserialize)]
struct ForecastRecord {
    values: Vec<f64>,
    horizons: usize,
    std_errors: Vec<f64>,
    lower_80: Vec<f64>,
    upper_80: Vec<f64>,
    lower_95: Vec<f64>,
    upper_95: Vec<f64>,
    dates: Option<Vec<NaiveDate>>,
}

impl TryFrom<ForecastRecord> for ForecastResult {
    type Error = ForecastError;

    fn try_from(record: ForecastRecord) -> Result<Self> {
        let columns = [
            &record.values,
            &record.std_errors,
            &record.lower_80,
            &record.upper_80,
            &record.lower_95,
            &record.upper_95,
        ];
        for column in columns {
            Self::check_length(column, record.horizons)?;
            if column.iter().any(|v| !v.is_finite()) {
                return Err(ForecastError::ValidationError(
                    "Forecast columns must be finite".to_string(),
                ));
            }
        }
        if let Some(dates) = &record.dates {
            Self::check_length(&record.values, dates.len())?;
        }

        let forecast = Self {
            values: record.values,
            horizons: record.horizons,
            std_errors: record.std_errors,
            lower_80: record.lower_80,
            upper_80: record.upper_80,
            lower_95: record.lower_95,
            upper_95: record.upper_95,
            dates: record.dates,
        };
        if !forecast.bands_are_ordered() {
            return Err(ForecastError::ValidationError(
                "Forecast bands are out of order".to_string(),
            ));
        }
        Ok(forecast)
    }
}

impl ForecastResult {
    /// Create a forecast with zero-width bands
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        let zeros = vec![0.0; values.len()];
        Self::check_length(&values, horizons)?;
        Self::from_standard_errors(values, zeros)
    }

    /// Create a forecast whose bands are `value ± z * std_error`
    pub fn from_standard_errors(values: Vec<f64>, std_errors: Vec<f64>) -> Result<Self> {
        if values.len() != std_errors.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match standard errors length ({})",
                values.len(),
                std_errors.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastingError(
                "Forecast values must be finite".to_string(),
            ));
        }
        if std_errors.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(ForecastError::ForecastingError(
                "Standard errors must be finite and non-negative".to_string(),
            ));
        }

        let z80 = normal_quantile(IntervalLevel::Eighty.coverage())?;
        let z95 = normal_quantile(IntervalLevel::NinetyFive.coverage())?;
        let band = |z: f64, sign: f64| -> Vec<f64> {
            values
                .iter()
                .zip(&std_errors)
                .map(|(v, s)| v + sign * z * s)
                .collect()
        };

        Ok(Self {
            horizons: values.len(),
            lower_80: band(z80, -1.0),
            upper_80: band(z80, 1.0),
            lower_95: band(z95, -1.0),
            upper_95: band(z95, 1.0),
            values,
            std_errors,
            dates: None,
        })
    }

    /// Attach one date per forecast step
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        Self::check_length(&self.values, dates.len())?;
        self.dates = Some(dates);
        Ok(self)
    }

    fn check_length(values: &[f64], horizons: usize) -> Result<()> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }
        Ok(())
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    pub fn std_errors(&self) -> &[f64] {
        &self.std_errors
    }

    /// Lower and upper band at `level`
    pub fn interval(&self, level: IntervalLevel) -> (&[f64], &[f64]) {
        match level {
            IntervalLevel::Eighty => (&self.lower_80, &self.upper_80),
            IntervalLevel::NinetyFive => (&self.lower_95, &self.upper_95),
        }
    }

    /// Get the dates, if available
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// Normal intervals at an arbitrary confidence level
    pub fn confidence_intervals(&self, confidence_level: f64) -> Result<Vec<(f64, f64)>> {
        let z = normal_quantile(confidence_level)?;
        Ok(self
            .values
            .iter()
            .zip(&self.std_errors)
            .map(|(v, s)| (v - z * s, v + z * s))
            .collect())
    }

    /// `lower95 <= lower80 <= point <= upper80 <= upper95` at every step
    pub fn bands_are_ordered(&self) -> bool {
        (0..self.horizons).all(|i| {
            self.lower_95[i] <= self.lower_80[i]
                && self.lower_80[i] <= self.values[i]
                && self.values[i] <= self.upper_80[i]
                && self.upper_80[i] <= self.upper_95[i]
        })
    }

    /// Calculate mean absolute error between forecast and actual values
    pub fn mean_absolute_error(&self, actual: &[f64]) -> Result<f64> {
        self.check_actual(actual)?;
        let sum: f64 = self
            .values
            .iter()
            .zip(actual.iter())
            .map(|(f, a)| (f - a).abs())
            .sum();

        Ok(sum / self.values.len() as f64)
    }

    /// Calculate mean squared error between forecast and actual values
    pub fn mean_squared_error(&self, actual: &[f64]) -> Result<f64> {
        self.check_actual(actual)?;
        let sum: f64 = self
            .values
            .iter()
            .zip(actual.iter())
            .map(|(f, a)| (f - a).powi(2))
            .sum();

        Ok(sum / self.values.len() as f64)
    }

    pub fn root_mean_squared_error(&self, actual: &[f64]) -> Result<f64> {
        Ok(self.mean_squared_error(actual)?.sqrt())
    }

    fn check_actual(&self, actual: &[f64]) -> Result<()> {
        if self.values.len() != actual.len() || actual.is_empty() {
            return Err(ForecastError::ValidationError(format!(
                "Forecast length ({}) doesn't match actual length ({})",
                self.values.len(),
                actual.len()
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Model families whose information criteria are comparable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelFamily {
    Arima,
    Garch,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Arima => write!(f, "ARIMA"),
            ModelFamily::Garch => write!(f, "GARCH"),
        }
    }
}

/// The four candidate specifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    /// ARIMA(1,1,0)
    Arima,
    /// ARIMA(1,1,0) with temperature as a regressor
    ArimaX,
    /// AR(1) mean with GARCH(1,1) normal innovations
    Garch,
    /// AR(1)-GARCH(1,1) with temperature in the mean
    GarchX,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 4] = [
        ModelVariant::Arima,
        ModelVariant::ArimaX,
        ModelVariant::Garch,
        ModelVariant::GarchX,
    ];

    pub fn family(self) -> ModelFamily {
        match self {
            ModelVariant::Arima | ModelVariant::ArimaX => ModelFamily::Arima,
            ModelVariant::Garch | ModelVariant::GarchX => ModelFamily::Garch,
        }
    }

    pub fn uses_temperature(self) -> bool {
        matches!(self, ModelVariant::ArimaX | ModelVariant::GarchX)
    }

    /// Variants of `family`, plain before exogenous
    pub fn of_family(family: ModelFamily) -> Vec<ModelVariant> {
        Self::ALL
            .iter()
            .copied()
            .filter(|v| v.family() == family)
            .collect()
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelVariant::Arima => write!(f, "ARIMA(1,1,0)"),
            ModelVariant::ArimaX => write!(f, "ARIMAX(1,1,0)"),
            ModelVariant::Garch => write!(f, "AR(1)-GARCH(1,1)"),
            ModelVariant::GarchX => write!(f, "AR(1)-GARCH(1,1)-X"),
        }
    }
}

/// Orders of a fitted specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelOrder {
    Arima { p: usize, d: usize, q: usize },
    /// `p` GARCH lags and `q` ARCH lags over an AR mean
    Garch { ar_lags: usize, p: usize, q: usize },
}

/// Named parameter estimate, in the units of the input data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub value: f64,
}

impl Coefficient {
    pub(crate) fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Likelihood and information criteria of a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub name: String,
    pub variant: ModelVariant,
    pub order: ModelOrder,
    pub coefficients: Vec<Coefficient>,
    pub log_likelihood: f64,
    /// Estimated parameters, innovation variance included
    pub parameters: usize,
    pub nobs: usize,
    pub aic: f64,
    pub bic: f64,
    pub iterations: u64,
}

impl FitSummary {
    pub(crate) fn new(
        name: String,
        variant: ModelVariant,
        order: ModelOrder,
        coefficients: Vec<Coefficient>,
        log_likelihood: f64,
        parameters: usize,
        nobs: usize,
        iterations: u64,
    ) -> Self {
        let k = parameters as f64;
        Self {
            name,
            variant,
            order,
            coefficients,
            log_likelihood,
            parameters,
            nobs,
            aic: -2.0 * log_likelihood + 2.0 * k,
            bic: -2.0 * log_likelihood + k * (nobs as f64).ln(),
            iterations,
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.variant.family()
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coefficients
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Forecast `horizons` steps past the end of the training data.
    ///
    /// Models fitted with temperature need exactly `horizons` future values.
    fn forecast(&self, horizons: usize, future_exog: Option<&[f64]>) -> Result<ForecastResult>;

    /// One-step-ahead residuals over the estimation sample
    fn residuals(&self) -> &[f64];

    fn summary(&self) -> &FitSummary;

    /// Name of the model
    fn name(&self) -> &str {
        &self.summary().name
    }
}

/// Forecast model that can be trained on a matched series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Fit by maximum likelihood
    fn train(&self, data: &MatchedSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// A fitted candidate of either family
#[derive(Debug, Clone)]
pub enum FittedModel {
    Arima(TrainedArimaModel),
    Garch(TrainedGarchModel),
}

impl FittedModel {
    pub fn variant(&self) -> ModelVariant {
        self.summary().variant
    }
}

impl TrainedForecastModel for FittedModel {
    fn forecast(&self, horizons: usize, future_exog: Option<&[f64]>) -> Result<ForecastResult> {
        match self {
            FittedModel::Arima(m) => m.forecast(horizons, future_exog),
            FittedModel::Garch(m) => m.forecast(horizons, future_exog),
        }
    }

    fn residuals(&self) -> &[f64] {
        match self {
            FittedModel::Arima(m) => m.residuals(),
            FittedModel::Garch(m) => m.residuals(),
        }
    }

    fn summary(&self) -> &FitSummary {
        match self {
            FittedModel::Arima(m) => m.summary(),
            FittedModel::Garch(m) => m.summary(),
        }
    }
}

/// Fit one candidate on `data`
pub fn fit_variant(
    variant: ModelVariant,
    data: &MatchedSeries,
    optimizer: &OptimizerConfig,
) -> Result<FittedModel> {
    match variant.family() {
        ModelFamily::Arima => {
            let mut model = ArimaModel::new(1, 1, 0)?.with_optimizer(optimizer.clone());
            if variant.uses_temperature() {
                model = model.with_exogenous();
            }
            model.train(data).map(FittedModel::Arima)
        }
        ModelFamily::Garch => {
            let mut model = GarchModel::new(1, 1)?.with_optimizer(optimizer.clone());
            if variant.uses_temperature() {
                model = model.with_exogenous();
            }
            model.train(data).map(FittedModel::Garch)
        }
    }
}

/// Standard deviation of first differences, the scale every fit works in
pub(crate) fn change_scale(values: &[f64]) -> Result<f64> {
    let changes = series_math::difference(values, 1)?;
    let scale = series_math::statistics::std_dev(&changes)?;
    if !(scale > 0.0 && scale.is_finite()) {
        return Err(ForecastError::Math(series_math::MathError::DegenerateSeries(
            "price changes have zero variance".to_string(),
        )));
    }
    Ok(scale)
}

/// Check that future regressor values cover the horizon
pub(crate) fn future_regressor(
    exogenous: bool,
    horizons: usize,
    future_exog: Option<&[f64]>,
) -> Result<Vec<f64>> {
    if !exogenous {
        return Ok(vec![0.0; horizons]);
    }
    match future_exog {
        Some(values) if values.len() == horizons => Ok(values.to_vec()),
        Some(values) => Err(ForecastError::ExogenousMismatch {
            expected: horizons,
            actual: values.len(),
        }),
        None => Err(ForecastError::ExogenousMismatch {
            expected: horizons,
            actual: 0,
        }),
    }
}
