//! Aggregating station reports and joining them with prices

use crate::data::{ClimateRecords, PriceSeries};
use crate::error::{ForecastError, Result};
use crate::utils::{split_index, Frequency};
use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// National daily mean temperature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClimateAggregate {
    pub date: NaiveDate,
    pub avg_temp: f64,
    /// Stations that contributed a value
    pub stations: usize,
}

/// Average `avg_temp` across stations for each date.
///
/// Absent readings are ignored; a date where no station reported an
/// average produces no row.
pub fn aggregate_daily(records: &ClimateRecords) -> Vec<DailyClimateAggregate> {
    let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for obs in records.observations() {
        if let Some(temp) = obs.avg_temp {
            let entry = sums.entry(obs.date).or_insert((0.0, 0));
            entry.0 += temp;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(date, (sum, stations))| DailyClimateAggregate {
            date,
            avg_temp: sum / stations as f64,
            stations,
        })
        .collect()
}

/// One row of the joined dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedObservation {
    pub date: NaiveDate,
    pub price: f64,
    pub avg_temp: f64,
}

/// Dates carrying both a price and a temperature, strictly ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatchedRows")]
pub struct MatchedSeries {
    rows: Vec<MatchedObservation>,
}

#[derive(Deserialize)]
struct MatchedRows {
    rows: Vec<MatchedObservation>,
}

impl TryFrom<MatchedRows> for MatchedSeries {
    type Error = ForecastError;

    fn try_from(raw: MatchedRows) -> Result<Self> {
        Self::new(raw.rows)
    }
}

impl MatchedSeries {
    /// Build a series from rows that are already strictly ascending
    pub fn new(rows: Vec<MatchedObservation>) -> Result<Self> {
        if rows.windows(2).any(|w| w[0].date >= w[1].date) {
            return Err(ForecastError::DataError(
                "Matched rows must be strictly ascending by date".to_string(),
            ));
        }
        if rows
            .iter()
            .any(|r| !r.price.is_finite() || !r.avg_temp.is_finite())
        {
            return Err(ForecastError::DataError(
                "Matched rows must hold finite values".to_string(),
            ));
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[MatchedObservation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price).collect()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.avg_temp).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    pub fn frequency(&self) -> Frequency {
        Frequency::infer(&self.dates())
    }

    /// Rows `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.rows.len() {
            return Err(ForecastError::ValidationError(format!(
                "Slice {}..{} is out of bounds for {} rows",
                start,
                end,
                self.rows.len()
            )));
        }

        Ok(Self {
            rows: self.rows[start..end].to_vec(),
        })
    }

    /// In-order training prefix and test suffix
    pub fn split_at_fraction(&self, train_fraction: f64) -> Result<(Self, Self)> {
        let cut = split_index(self.rows.len(), train_fraction)?;
        Ok((self.slice(0, cut)?, self.slice(cut, self.rows.len())?))
    }
}

/// Inner join of prices and daily temperatures on date.
///
/// Fails with `JoinMismatch` when fewer than
/// `min_fraction * min(len(prices), len(climate))` rows survive, or when
/// nothing does.
pub fn align(
    prices: &PriceSeries,
    climate: &[DailyClimateAggregate],
    min_fraction: f64,
) -> Result<MatchedSeries> {
    let temperatures: BTreeMap<NaiveDate, f64> =
        climate.iter().map(|c| (c.date, c.avg_temp)).collect();

    let rows: Vec<MatchedObservation> = prices
        .observations()
        .iter()
        .filter_map(|p| {
            temperatures.get(&p.date).map(|t| MatchedObservation {
                date: p.date,
                price: p.price,
                avg_temp: *t,
            })
        })
        .collect();

    let expected = prices.len().min(temperatures.len());
    let required = (expected as f64 * min_fraction).ceil() as usize;
    debug!(
        "Join kept {} rows ({} prices, {} climate days)",
        rows.len(),
        prices.len(),
        temperatures.len()
    );

    if rows.is_empty() || rows.len() < required {
        warn!(
            "Join retained {} of {} rows, below the {:.0}% floor",
            rows.len(),
            expected,
            min_fraction * 100.0
        );
        return Err(ForecastError::JoinMismatch {
            matched: rows.len(),
            expected,
        });
    }

    info!("Matched {} dates", rows.len());
    MatchedSeries::new(rows)
}

/// Day-of-year average temperature of `history`, looked up for `dates`.
///
/// Days never observed borrow the nearest observed day of the year.
pub fn climatology(history: &MatchedSeries, dates: &[NaiveDate]) -> Result<Vec<f64>> {
    if history.is_empty() {
        return Err(ForecastError::DataError(
            "Climatology needs at least one observation".to_string(),
        ));
    }

    let mut slots = vec![(0.0, 0usize); 365];
    for row in history.rows() {
        let slot = &mut slots[day_slot(row.date)];
        slot.0 += row.avg_temp;
        slot.1 += 1;
    }

    Ok(dates
        .iter()
        .map(|date| {
            let target = day_slot(*date);
            (0..=182)
                .find_map(|offset| {
                    [(target + offset) % 365, (target + 365 - offset) % 365]
                        .iter()
                        .find(|s| slots[**s].1 > 0)
                        .map(|s| slots[*s].0 / slots[*s].1 as f64)
                })
                .unwrap_or(0.0)
        })
        .collect())
}

/// Day-of-year index in a non-leap calendar; 29 February shares 28 February's slot
fn day_slot(date: NaiveDate) -> usize {
    let ordinal = date.ordinal0() as usize;
    let leap = NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some();
    if leap && ordinal >= 59 {
        ordinal - 1
    } else {
        ordinal
    }
}
