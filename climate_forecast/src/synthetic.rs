//! Seeded synthetic price and temperature series

use crate::align::{MatchedObservation, MatchedSeries};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameters of a generated dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub start_price: f64,
    /// Expected daily price change
    pub drift: f64,
    /// Standard deviation of the daily price shock
    pub volatility: f64,
    pub mean_temperature: f64,
    pub temperature_amplitude: f64,
    /// Seasonal period in days
    pub period: f64,
    pub temperature_noise: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start_price: 2000.0,
            drift: 0.5,
            volatility: 20.0,
            mean_temperature: 20.0,
            temperature_amplitude: 8.0,
            period: 365.0,
            temperature_noise: 1.5,
            seed: 42,
        }
    }
}

fn normal(sigma: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, sigma).map_err(|e| ForecastError::InvalidParameter(e.to_string()))
}

/// Random walk with drift: `p[t] = p[t-1] + drift + sigma·z`, starting at `start`
pub fn random_walk_prices(n: usize, start: f64, drift: f64, sigma: f64, seed: u64) -> Result<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let shock = normal(sigma)?;

    let mut prices = Vec::with_capacity(n);
    let mut level = start;
    for _ in 0..n {
        prices.push(level);
        level += drift + shock.sample(&mut rng);
    }
    Ok(prices)
}

/// `mean + amplitude·sin(2πt / period)` plus Gaussian noise
pub fn seasonal_temperatures(
    n: usize,
    mean: f64,
    amplitude: f64,
    period: f64,
    noise: f64,
    seed: u64,
) -> Result<Vec<f64>> {
    if period <= 0.0 {
        return Err(ForecastError::InvalidParameter(
            "Seasonal period must be positive".to_string(),
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let shock = normal(noise)?;

    Ok((0..n)
        .map(|t| mean + amplitude * (2.0 * PI * t as f64 / period).sin() + shock.sample(&mut rng))
        .collect())
}

/// `n` consecutive days of generated prices and temperatures.
///
/// Prices are floored at one cent so they stay positive.
pub fn matched_series(start: NaiveDate, n: usize, config: &SyntheticConfig) -> Result<MatchedSeries> {
    let prices = random_walk_prices(
        n,
        config.start_price,
        config.drift,
        config.volatility,
        config.seed,
    )?;
    let temperatures = seasonal_temperatures(
        n,
        config.mean_temperature,
        config.temperature_amplitude,
        config.period,
        config.temperature_noise,
        config.seed.wrapping_add(1),
    )?;

    let rows = prices
        .iter()
        .zip(temperatures.iter())
        .enumerate()
        .map(|(i, (price, temp))| MatchedObservation {
            date: start + Duration::days(i as i64),
            price: price.max(0.01),
            avg_temp: *temp,
        })
        .collect();
    MatchedSeries::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_series() {
        let a = random_walk_prices(100, 50.0, 0.1, 1.0, 7).unwrap();
        let b = random_walk_prices(100, 50.0, 0.1, 1.0, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0], 50.0);
    }

    #[test]
    fn test_noise_free_seasonality() {
        let temps = seasonal_temperatures(366, 10.0, 5.0, 365.0, 0.0, 1).unwrap();
        assert!((temps[0] - 10.0).abs() < 1e-12);
        assert!((temps[365] - 10.0).abs() < 1e-9);
        assert!(temps.iter().all(|t| (5.0..=15.0).contains(t)));
    }

    #[test]
    fn test_matched_series_is_daily() {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let series = matched_series(start, 30, &SyntheticConfig::default()).unwrap();
        assert_eq!(series.len(), 30);
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2021, 3, 30));
    }
}
