//! ARIMA models for time series forecasting
//!
//! With a regressor the model is a regression with ARIMA errors:
//! `Δᵈy = β·Δᵈx + w`, where `w` follows an ARMA(p, q) process. Parameters
//! are estimated by conditional maximum likelihood with the innovation
//! variance concentrated out.

use crate::align::MatchedSeries;
use crate::config::OptimizerConfig;
use crate::error::{ForecastError, Result};
use crate::models::optimizer::minimize;
use crate::models::{
    change_scale, future_regressor, Coefficient, FitSummary, ForecastModel, ForecastResult,
    ModelOrder, ModelVariant, TrainedForecastModel,
};
use log::info;
use series_math::{difference, ols, undifference};
use std::f64::consts::PI;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Temperature enters as a regressor
    exogenous: bool,
    optimizer: OptimizerConfig,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    exogenous: bool,
    /// Intercept of the ARMA recursion, only present without differencing
    constant: f64,
    beta: f64,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    sigma2: f64,
    /// Historical price levels
    historical_data: Vec<f64>,
    /// Historical regressor levels
    historical_regressor: Vec<f64>,
    /// Differenced series net of the regression term
    errors: Vec<f64>,
    /// Residuals from fitting, one per conditioned observation
    residuals: Vec<f64>,
    summary: FitSummary,
}

/// Parameter vector in the scaled space: `[β?, c?, φ₁..φp, θ₁..θq]`
struct Layout {
    exogenous: bool,
    constant: bool,
    p: usize,
    q: usize,
}

impl Layout {
    fn len(&self) -> usize {
        self.exogenous as usize + self.constant as usize + self.p + self.q
    }

    fn unpack<'a>(&self, params: &'a [f64]) -> (f64, f64, &'a [f64], &'a [f64]) {
        let mut at = 0;
        let beta = if self.exogenous {
            at += 1;
            params[0]
        } else {
            0.0
        };
        let constant = if self.constant {
            at += 1;
            params[at - 1]
        } else {
            0.0
        };
        let ar = &params[at..at + self.p];
        let ma = &params[at + self.p..at + self.p + self.q];
        (beta, constant, ar, ma)
    }
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if p + q == 0 {
            return Err(ForecastError::InvalidParameter(
                "ARIMA needs at least one AR or MA term".to_string(),
            ));
        }
        if d > 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Differencing order {} is not supported (max 2)",
                d
            )));
        }

        Ok(Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
            exogenous: false,
            optimizer: OptimizerConfig::default(),
        })
    }

    /// Add the temperature series as a regressor
    pub fn with_exogenous(mut self) -> Self {
        self.exogenous = true;
        self.name = format!("ARIMAX({},{},{})", self.p, self.d, self.q);
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    fn layout(&self) -> Layout {
        Layout {
            exogenous: self.exogenous,
            constant: self.d == 0,
            p: self.p,
            q: self.q,
        }
    }

    /// Least-squares start values; MA terms start at zero
    fn start_values(&self, y: &[f64], x: &[f64], layout: &Layout) -> Result<Vec<f64>> {
        let design: Vec<Vec<f64>> = (self.p..y.len())
            .map(|t| {
                let mut row = Vec::with_capacity(layout.len());
                if layout.exogenous {
                    row.push(x[t]);
                }
                if layout.constant {
                    row.push(1.0);
                }
                row.extend((1..=self.p).map(|i| y[t - i]));
                row
            })
            .collect();
        let fit = ols(&y[self.p..], &design)?;

        let mut start = fit.coefficients;
        start.extend(std::iter::repeat(0.0).take(self.q));
        Ok(start)
    }
}

/// Innovations of `w` under ARMA coefficients, conditioning on the first `p` values
fn arma_residuals(w: &[f64], constant: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut prediction = constant;
        for (i, phi) in ar.iter().enumerate() {
            prediction += phi * w[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                prediction += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - prediction;
    }
    e.split_off(p)
}

fn net_of_regressor(y: &[f64], x: &[f64], beta: f64) -> Vec<f64> {
    y.iter().zip(x).map(|(y, x)| y - beta * x).collect()
}

fn mean_square(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &MatchedSeries) -> Result<TrainedArimaModel> {
        let prices = data.prices();
        let temperatures = data.temperatures();
        let layout = self.layout();
        let required = self.d + self.p + layout.len() + 10;
        if prices.len() < required {
            return Err(ForecastError::ValidationError(format!(
                "Insufficient data for {}. Need at least {} observations.",
                self.name, required
            )));
        }

        let scale = change_scale(&prices)?;
        let dy: Vec<f64> = difference(&prices, self.d)?
            .iter()
            .map(|v| v / scale)
            .collect();
        let dx = difference(&temperatures, self.d)?;

        let start = self.start_values(&dy, &dx, &layout)?;
        let minimum = minimize(
            &self.name,
            |params: &[f64]| {
                let (beta, constant, ar, ma) = layout.unpack(params);
                let w = net_of_regressor(&dy, &dx, beta);
                let e = arma_residuals(&w, constant, ar, ma);
                0.5 * mean_square(&e).ln()
            },
            &start,
            &self.optimizer,
        )?;

        let (beta, constant, ar, ma) = layout.unpack(&minimum.params);
        let w_scaled = net_of_regressor(&dy, &dx, beta);
        let residuals: Vec<f64> = arma_residuals(&w_scaled, constant, ar, ma)
            .iter()
            .map(|e| e * scale)
            .collect();
        let nobs = residuals.len();
        let sigma2 = mean_square(&residuals);
        let log_likelihood = -0.5 * nobs as f64 * ((2.0 * PI).ln() + sigma2.ln() + 1.0);

        let beta = beta * scale;
        let constant = constant * scale;
        let mut coefficients = Vec::new();
        if layout.exogenous {
            coefficients.push(Coefficient::new("temperature", beta));
        }
        if layout.constant {
            coefficients.push(Coefficient::new("const", constant));
        }
        for (i, phi) in ar.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("ar.L{}", i + 1), *phi));
        }
        for (j, theta) in ma.iter().enumerate() {
            coefficients.push(Coefficient::new(format!("ma.L{}", j + 1), *theta));
        }
        coefficients.push(Coefficient::new("sigma2", sigma2));

        let variant = if self.exogenous {
            ModelVariant::ArimaX
        } else {
            ModelVariant::Arima
        };
        let summary = FitSummary::new(
            self.name.clone(),
            variant,
            ModelOrder::Arima {
                p: self.p,
                d: self.d,
                q: self.q,
            },
            coefficients,
            log_likelihood,
            layout.len() + 1,
            nobs,
            minimum.iterations,
        );
        info!(
            "{}: log-likelihood {:.3}, AIC {:.3}, BIC {:.3}",
            self.name, summary.log_likelihood, summary.aic, summary.bic
        );

        let dy_levels = difference(&prices, self.d)?;
        Ok(TrainedArimaModel {
            name: self.name.clone(),
            p: self.p,
            d: self.d,
            exogenous: self.exogenous,
            constant,
            beta,
            ar_coefficients: ar.to_vec(),
            ma_coefficients: ma.to_vec(),
            sigma2,
            errors: net_of_regressor(&dy_levels, &dx, beta),
            historical_data: prices,
            historical_regressor: temperatures,
            residuals,
            summary,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Regressor coefficient in price units per degree (0 without a regressor)
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// MA(∞) weights of the integrated process, `ψ₀ = 1`
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        // φ(B)(1 - B)^d written as 1 - a₁B - a₂B² - ...
        let mut polynomial = vec![1.0];
        polynomial.extend(self.ar_coefficients.iter().map(|phi| -phi));
        for _ in 0..self.d {
            let mut next = vec![0.0; polynomial.len() + 1];
            for (i, c) in polynomial.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            polynomial = next;
        }
        let a: Vec<f64> = polynomial[1..].iter().map(|c| -c).collect();

        let mut psi = vec![0.0; count];
        if count > 0 {
            psi[0] = 1.0;
        }
        for j in 1..count {
            let mut value = self.ma_coefficients.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..=j.min(a.len()) {
                value += a[i - 1] * psi[j - i];
            }
            psi[j] = value;
        }
        psi
    }

    fn standard_errors(&self, horizons: usize) -> Vec<f64> {
        let mut cumulative = 0.0;
        self.psi_weights(horizons)
            .iter()
            .map(|psi| {
                cumulative += psi * psi;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect()
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizons: usize, future_exog: Option<&[f64]>) -> Result<ForecastResult> {
        if horizons == 0 {
            return Err(ForecastError::ValidationError(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        let future_x = future_regressor(self.exogenous, horizons, future_exog)?;

        let future_dx = if self.exogenous {
            let mut regressor = self.historical_regressor.clone();
            regressor.extend_from_slice(&future_x);
            let dx = difference(&regressor, self.d)?;
            dx[dx.len() - horizons..].to_vec()
        } else {
            future_x
        };

        let observed = self.errors.len();
        let mut w = self.errors.clone();
        let mut e = vec![0.0; self.p];
        e.extend_from_slice(&self.residuals);
        for _ in 0..horizons {
            let t = w.len();
            let mut prediction = self.constant;
            for (i, phi) in self.ar_coefficients.iter().enumerate() {
                prediction += phi * w[t - 1 - i];
            }
            for (j, theta) in self.ma_coefficients.iter().enumerate() {
                prediction += theta * e[t - 1 - j];
            }
            w.push(prediction);
            e.push(0.0);
        }

        let differenced: Vec<f64> = w[observed..]
            .iter()
            .zip(&future_dx)
            .map(|(w, dx)| w + self.beta * dx)
            .collect();
        let values = undifference(&differenced, &self.historical_data, self.d)?;

        ForecastResult::from_standard_errors(values, self.standard_errors(horizons))
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

    /// Prices whose changes follow an AR(1) with coefficient `phi`
    fn ar1_changes(phi: f64, n: usize, seed: u64) -> MatchedSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut price = 100.0;
        let mut change = 0.0;
        let rows = (0..n)
            .map(|i| {
                change = phi * change + noise.sample(&mut rng);
                price += change;
                MatchedObservation {
                    date: start + Duration::days(i as i64),
                    price,
                    avg_temp: 15.0 + 10.0 * (i as f64 / 58.0).sin() + noise.sample(&mut rng),
                }
            })
            .collect();
        MatchedSeries::new(rows).unwrap()
    }

    #[test]
    fn test_recovers_ar_coefficient() {
        let data = ar1_changes(0.5, 800, 7);
        let model = ArimaModel::new(1, 1, 0).unwrap().train(&data).unwrap();

        assert!((model.ar_coefficients()[0] - 0.5).abs() < 0.1);
        assert!((model.sigma2() - 1.0).abs() < 0.2);
        assert_eq!(model.residuals().len(), 798);
        assert_eq!(model.summary().parameters, 2);
    }

    #[test]
    fn test_psi_weights_of_integrated_ar1() {
        let data = ar1_changes(0.5, 300, 3);
        let model = ArimaModel::new(1, 1, 0).unwrap().train(&data).unwrap();
        let phi = model.ar_coefficients()[0];
        let psi = model.psi_weights(3);

        assert!((psi[0] - 1.0).abs() < 1e-12);
        assert!((psi[1] - (1.0 + phi)).abs() < 1e-12);
        assert!((psi[2] - (1.0 + phi + phi * phi)).abs() < 1e-12);
    }

    #[test]
    fn test_forecast_widens_with_horizon() {
        let data = ar1_changes(0.3, 400, 11);
        let model = ArimaModel::new(1, 1, 0).unwrap().train(&data).unwrap();
        let forecast = model.forecast(20, None).unwrap();

        assert_eq!(forecast.values().len(), 20);
        assert!(forecast.std_errors().windows(2).all(|w| w[1] >= w[0]));
        assert!(forecast.bands_are_ordered());
    }

    #[test]
    fn test_exogenous_model_requires_future_values() {
        let data = ar1_changes(0.3, 400, 5);
        let model = ArimaModel::new(1, 1, 0)
            .unwrap()
            .with_exogenous()
            .train(&data)
            .unwrap();

        assert_eq!(model.summary().parameters, 3);
        assert!(matches!(
            model.forecast(10, None),
            Err(ForecastError::ExogenousMismatch { .. })
        ));
        assert!(model.forecast(10, Some(&[15.0; 10])).is_ok());
    }

    #[test]
    fn test_rejects_empty_order() {
        assert!(ArimaModel::new(0, 1, 0).is_err());
    }
}
