//! GARCH models for time series forecasting
//!
//! The mean equation is an autoregression on price levels, optionally with
//! temperature; its innovations carry a GARCH(p, q) conditional variance
//! with normal shocks.

use crate::align::MatchedSeries;
use crate::config::OptimizerConfig;
use crate::error::{ForecastError, Result};
use crate::models::optimizer::minimize;
use crate::models::{
    change_scale, future_regressor, Coefficient, FitSummary, ForecastModel, ForecastResult,
    ModelOrder, ModelVariant, TrainedForecastModel,
};
use log::{info, warn};
use series_math::ols;
use std::f64::consts::PI;

/// GARCH model implementation
#[derive(Debug, Clone)]
pub struct GarchModel {
    /// Model name
    name: String,
    /// GARCH order (p)
    p: usize,
    /// ARCH order (q)
    q: usize,
    /// Autoregressive lags in the mean
    ar_lags: usize,
    exogenous: bool,
    optimizer: OptimizerConfig,
}

/// Estimated parameters in the units of the data
#[derive(Debug, Clone, PartialEq)]
struct GarchParams {
    mu: f64,
    ar: Vec<f64>,
    /// Temperature coefficient, 0 without a regressor
    regressor: f64,
    /// Variance intercept
    omega: f64,
    /// ARCH parameters
    alpha: Vec<f64>,
    /// GARCH parameters
    beta: Vec<f64>,
}

/// Trained GARCH model
#[derive(Debug, Clone)]
pub struct TrainedGarchModel {
    name: String,
    exogenous: bool,
    params: GarchParams,
    /// Historical price levels
    levels: Vec<f64>,
    /// Mean-equation residuals
    residuals: Vec<f64>,
    /// Conditional variances matching `residuals`
    variances: Vec<f64>,
    summary: FitSummary,
}

/// Unconstrained vector `[μ, φ₁..φr, b?, ln ω, a₁..a_q, g₁..g_p]`.
///
/// The ARCH and GARCH weights are a softmax of the raw values against a
/// fixed zero, so they are positive and sum to less than one.
struct Layout {
    ar_lags: usize,
    exogenous: bool,
    p: usize,
    q: usize,
}

impl Layout {
    fn len(&self) -> usize {
        1 + self.ar_lags + self.exogenous as usize + 1 + self.q + self.p
    }

    fn unpack(&self, params: &[f64]) -> GarchParams {
        let r = self.ar_lags;
        let mut at = 1 + r;
        let regressor = if self.exogenous {
            at += 1;
            params[at - 1]
        } else {
            0.0
        };
        let omega = params[at].exp();
        let weights = softmax_with_zero(&params[at + 1..at + 1 + self.q + self.p]);

        GarchParams {
            mu: params[0],
            ar: params[1..1 + r].to_vec(),
            regressor,
            omega,
            alpha: weights[..self.q].to_vec(),
            beta: weights[self.q..].to_vec(),
        }
    }
}

fn softmax_with_zero(raw: &[f64]) -> Vec<f64> {
    let top = raw.iter().cloned().fold(0.0, f64::max);
    let exps: Vec<f64> = raw.iter().map(|r| (r - top).exp()).collect();
    let total = (-top).exp() + exps.iter().sum::<f64>();
    exps.iter().map(|e| e / total).collect()
}

/// Inverse of `softmax_with_zero` for weights summing below one
fn raw_weights(weights: &[f64]) -> Vec<f64> {
    let slack = 1.0 - weights.iter().sum::<f64>();
    weights.iter().map(|w| (w / slack).ln()).collect()
}

fn mean_residuals(y: &[f64], x: &[f64], params: &GarchParams) -> Vec<f64> {
    let r = params.ar.len();
    (r..y.len())
        .map(|t| {
            let mut prediction = params.mu + params.regressor * x[t];
            for (i, phi) in params.ar.iter().enumerate() {
                prediction += phi * y[t - 1 - i];
            }
            y[t] - prediction
        })
        .collect()
}

/// Variance recursion, with the sample mean square standing in for pre-sample terms
fn conditional_variances(residuals: &[f64], omega: f64, alpha: &[f64], beta: &[f64]) -> Vec<f64> {
    let backcast = residuals.iter().map(|e| e * e).sum::<f64>() / residuals.len() as f64;
    let mut variances: Vec<f64> = Vec::with_capacity(residuals.len());
    for t in 0..residuals.len() {
        let mut value = omega;
        for (j, a) in alpha.iter().enumerate() {
            let shock = if t > j {
                residuals[t - 1 - j].powi(2)
            } else {
                backcast
            };
            value += a * shock;
        }
        for (k, b) in beta.iter().enumerate() {
            let previous = if t > k { variances[t - 1 - k] } else { backcast };
            value += b * previous;
        }
        variances.push(value);
    }
    variances
}

fn gaussian_log_likelihood(residuals: &[f64], variances: &[f64]) -> f64 {
    -0.5 * residuals
        .iter()
        .zip(variances)
        .map(|(e, v)| (2.0 * PI).ln() + v.ln() + e * e / v)
        .sum::<f64>()
}

impl GarchModel {
    /// Create a new GARCH(p, q) model over an AR(1) mean
    pub fn new(p: usize, q: usize) -> Result<Self> {
        if q == 0 {
            return Err(ForecastError::InvalidParameter(
                "GARCH needs at least one ARCH term".to_string(),
            ));
        }

        Ok(Self {
            name: format!("AR(1)-GARCH({},{})", p, q),
            p,
            q,
            ar_lags: 1,
            exogenous: false,
            optimizer: OptimizerConfig::default(),
        })
    }

    pub fn with_ar_lags(mut self, ar_lags: usize) -> Self {
        self.ar_lags = ar_lags;
        self.rename();
        self
    }

    /// Add temperature to the mean equation
    pub fn with_exogenous(mut self) -> Self {
        self.exogenous = true;
        self.rename();
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    fn rename(&mut self) {
        self.name = format!(
            "AR({})-GARCH({},{}){}",
            self.ar_lags,
            self.p,
            self.q,
            if self.exogenous { "-X" } else { "" }
        );
    }

    fn layout(&self) -> Layout {
        Layout {
            ar_lags: self.ar_lags,
            exogenous: self.exogenous,
            p: self.p,
            q: self.q,
        }
    }

    /// Mean parameters from least squares, variance split 0.1 ARCH / 0.8 GARCH
    fn start_values(&self, y: &[f64], x: &[f64]) -> Result<Vec<f64>> {
        let r = self.ar_lags;
        let design: Vec<Vec<f64>> = (r..y.len())
            .map(|t| {
                let mut row = vec![1.0];
                row.extend((1..=r).map(|i| y[t - i]));
                if self.exogenous {
                    row.push(x[t]);
                }
                row
            })
            .collect();
        let fit = ols(&y[r..], &design)?;
        let residual_variance = fit.ssr / fit.nobs as f64;

        let mut weights = vec![0.1 / self.q as f64; self.q];
        if self.p > 0 {
            weights.extend(vec![0.8 / self.p as f64; self.p]);
        }
        let persistence: f64 = weights.iter().sum();

        let mut start = fit.coefficients;
        start.push((residual_variance * (1.0 - persistence)).ln());
        start.extend(raw_weights(&weights));
        Ok(start)
    }
}

impl ForecastModel for GarchModel {
    type Trained = TrainedGarchModel;

    fn train(&self, data: &MatchedSeries) -> Result<TrainedGarchModel> {
        let prices = data.prices();
        let temperatures = data.temperatures();
        let layout = self.layout();
        let required = self.ar_lags + layout.len() + 20;
        if prices.len() < required {
            return Err(ForecastError::ValidationError(format!(
                "Insufficient data for {}. Need at least {} observations.",
                self.name, required
            )));
        }

        let scale = change_scale(&prices)?;
        let y: Vec<f64> = prices.iter().map(|p| p / scale).collect();

        let start = self.start_values(&y, &temperatures)?;
        let minimum = minimize(
            &self.name,
            |raw: &[f64]| {
                let params = layout.unpack(raw);
                let residuals = mean_residuals(&y, &temperatures, &params);
                let variances =
                    conditional_variances(&residuals, params.omega, &params.alpha, &params.beta);
                if variances.iter().any(|v| !(*v > 0.0)) {
                    return f64::INFINITY;
                }
                -gaussian_log_likelihood(&residuals, &variances) / residuals.len() as f64
            },
            &start,
            &self.optimizer,
        )?;

        let scaled = layout.unpack(&minimum.params);
        let params = GarchParams {
            mu: scaled.mu * scale,
            ar: scaled.ar.clone(),
            regressor: scaled.regressor * scale,
            omega: scaled.omega * scale * scale,
            alpha: scaled.alpha.clone(),
            beta: scaled.beta.clone(),
        };
        let residuals = mean_residuals(&prices, &temperatures, &params);
        let variances =
            conditional_variances(&residuals, params.omega, &params.alpha, &params.beta);
        let log_likelihood = gaussian_log_likelihood(&residuals, &variances);
        let nobs = residuals.len();

        if params.ar.iter().map(|phi| phi.abs()).sum::<f64>() >= 1.0 {
            warn!(
                "{}: mean autoregression is at or beyond a unit root",
                self.name
            );
        }

        let mut coefficients = vec![Coefficient::new("mu", params.mu)];
        for (i, phi) in params.ar.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("ar.L{}", i + 1), *phi));
        }
        if self.exogenous {
            coefficients.push(Coefficient::new("temperature", params.regressor));
        }
        coefficients.push(Coefficient::new("omega", params.omega));
        for (j, a) in params.alpha.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("alpha[{}]", j + 1), *a));
        }
        for (k, b) in params.beta.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("beta[{}]", k + 1), *b));
        }

        let variant = if self.exogenous {
            ModelVariant::GarchX
        } else {
            ModelVariant::Garch
        };
        let summary = FitSummary::new(
            self.name.clone(),
            variant,
            ModelOrder::Garch {
                ar_lags: self.ar_lags,
                p: self.p,
                q: self.q,
            },
            coefficients,
            log_likelihood,
            layout.len(),
            nobs,
            minimum.iterations,
        );
        info!(
            "{}: log-likelihood {:.3}, AIC {:.3}, BIC {:.3}",
            self.name, summary.log_likelihood, summary.aic, summary.bic
        );

        Ok(TrainedGarchModel {
            name: self.name.clone(),
            exogenous: self.exogenous,
            params,
            levels: prices,
            residuals,
            variances,
            summary,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedGarchModel {
    /// Sum of the ARCH and GARCH weights
    pub fn persistence(&self) -> f64 {
        self.params.alpha.iter().sum::<f64>() + self.params.beta.iter().sum::<f64>()
    }

    /// Long-run innovation variance `ω / (1 - persistence)`
    pub fn unconditional_variance(&self) -> f64 {
        self.params.omega / (1.0 - self.persistence())
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.params.ar
    }

    pub fn conditional_variances(&self) -> &[f64] {
        &self.variances
    }

    /// Conditional variance forecasts for steps `1..=horizons`
    fn variance_forecasts(&self, horizons: usize) -> Vec<f64> {
        let GarchParams {
            omega, alpha, beta, ..
        } = &self.params;
        let mut shocks: Vec<f64> = self.residuals.iter().map(|e| e * e).collect();
        let mut variances = self.variances.clone();
        let mut forecasts = Vec::with_capacity(horizons);

        for _ in 0..horizons {
            let mut next = *omega;
            for (j, a) in alpha.iter().enumerate() {
                next += a * shocks[shocks.len() - 1 - j];
            }
            for (k, b) in beta.iter().enumerate() {
                next += b * variances[variances.len() - 1 - k];
            }
            // E[ε²] of a future step is its conditional variance
            shocks.push(next);
            variances.push(next);
            forecasts.push(next);
        }
        forecasts
    }

    /// Impulse responses of the mean autoregression, `ψ₀ = 1`
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        let mut psi = vec![0.0; count];
        if count > 0 {
            psi[0] = 1.0;
        }
        for j in 1..count {
            let value = self
                .params
                .ar
                .iter()
                .enumerate()
                .filter(|(i, _)| *i < j)
                .map(|(i, phi)| phi * psi[j - 1 - i])
                .sum::<f64>();
            psi[j] = value;
        }
        psi
    }
}

impl TrainedForecastModel for TrainedGarchModel {
    fn forecast(&self, horizons: usize, future_exog: Option<&[f64]>) -> Result<ForecastResult> {
        if horizons == 0 {
            return Err(ForecastError::ValidationError(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        let future_x = future_regressor(self.exogenous, horizons, future_exog)?;

        let mut levels = self.levels.clone();
        let mut values = Vec::with_capacity(horizons);
        for x in &future_x {
            let mut prediction = self.params.mu + self.params.regressor * x;
            for (i, phi) in self.params.ar.iter().enumerate() {
                prediction += phi * levels[levels.len() - 1 - i];
            }
            levels.push(prediction);
            values.push(prediction);
        }

        // Var(e_h) = Σ_{j<h} ψ_j² σ²_{T+h-j}
        let variances = self.variance_forecasts(horizons);
        let psi = self.psi_weights(horizons);
        let std_errors = (1..=horizons)
            .map(|h| {
                (0..h)
                    .map(|j| psi[j] * psi[j] * variances[h - 1 - j])
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();

        ForecastResult::from_standard_errors(values, std_errors)
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn summary(&self) -> &FitSummary {
        &self.summary
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::MatchedObservation;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    /// AR(1) levels with GARCH(1,1) shocks: ω = 0.1, α = 0.1, β = 0.8
    fn simulated(n: usize, seed: u64) -> MatchedSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let shock = Normal::new(0.0, 1.0).unwrap();
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let mut level = 10.0;
        let mut variance = 1.0;
        let mut previous_error: f64 = 0.0;
        let rows = (0..n)
            .map(|i| {
                variance = 0.1 + 0.1 * previous_error.powi(2) + 0.8 * variance;
                previous_error = variance.sqrt() * shock.sample(&mut rng);
                level = 1.0 + 0.9 * level + previous_error;
                MatchedObservation {
                    date: start + Duration::days(i as i64),
                    price: level,
                    avg_temp: 12.0 + shock.sample(&mut rng),
                }
            })
            .collect();
        MatchedSeries::new(rows).unwrap()
    }

    #[test]
    fn test_softmax_round_trip() {
        let weights = vec![0.1, 0.8];
        let back = softmax_with_zero(&raw_weights(&weights));
        assert!((back[0] - 0.1).abs() < 1e-12);
        assert!((back[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_fit_recovers_dynamics() {
        let data = simulated(2000, 42);
        let model = GarchModel::new(1, 1).unwrap().train(&data).unwrap();

        assert!((model.ar_coefficients()[0] - 0.9).abs() < 0.05);
        assert!(model.persistence() > 0.6 && model.persistence() < 1.0);
        assert_eq!(model.summary().parameters, 5);
        assert_eq!(model.residuals().len(), 1999);
        assert!(model.conditional_variances().iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_variance_forecast_approaches_long_run_level() {
        let data = simulated(1500, 9);
        let model = GarchModel::new(1, 1).unwrap().train(&data).unwrap();
        let variances = model.variance_forecasts(2000);
        let long_run = model.unconditional_variance();

        assert!((variances[1999] - long_run).abs() / long_run < 0.01);
    }

    #[test]
    fn test_forecast_bands() {
        let data = simulated(800, 1);
        let model = GarchModel::new(1, 1)
            .unwrap()
            .with_exogenous()
            .train(&data)
            .unwrap();
        let forecast = model.forecast(15, Some(&[12.0; 15])).unwrap();

        assert_eq!(model.summary().parameters, 6);
        assert_eq!(forecast.values().len(), 15);
        assert!(forecast.bands_are_ordered());
        assert!(forecast.std_errors()[14] > forecast.std_errors()[0]);
    }
}
