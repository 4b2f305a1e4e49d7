//! Utility functions for the climate_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Split a series into an in-order training prefix and test suffix.
///
/// The training share is `floor(len * train_fraction)`; nothing is shuffled.
pub fn train_test_split<T: Clone>(data: &[T], train_fraction: f64) -> Result<(Vec<T>, Vec<T>)> {
    let train_size = split_index(data.len(), train_fraction)?;
    Ok((data[..train_size].to_vec(), data[train_size..].to_vec()))
}

/// Index of the first test observation
pub fn split_index(len: usize, train_fraction: f64) -> Result<usize> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(ForecastError::ValidationError(format!(
            "Training fraction must lie in (0, 1), got {}",
            train_fraction
        )));
    }

    let train_size = (len as f64 * train_fraction).floor() as usize;
    if train_size == 0 || train_size == len {
        return Err(ForecastError::ValidationError(format!(
            "A {} split of {} observations leaves an empty side",
            train_fraction, len
        )));
    }

    Ok(train_size)
}

/// Calendar cadence of a date index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    /// Monday to Friday, as exchange settlement prices are
    BusinessDaily,
}

impl Frequency {
    /// Business-daily when no date falls on a weekend
    pub fn infer(dates: &[NaiveDate]) -> Self {
        if !dates.is_empty() && dates.iter().all(|d| !is_weekend(*d)) {
            Frequency::BusinessDaily
        } else {
            Frequency::Daily
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Create future dates for forecasting
pub fn future_dates(last: NaiveDate, horizon: usize, frequency: Frequency) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(horizon);
    let mut current = last;

    while dates.len() < horizon {
        current = current + Duration::days(1);
        if frequency == Frequency::BusinessDaily && is_weekend(current) {
            continue;
        }
        dates.push(current);
    }

    dates
}

/// Parsing and formatting of calendar dates
pub mod date_parser {
    use crate::error::{ForecastError, Result};
    use chrono::{DateTime, NaiveDate, NaiveDateTime};

    /// Format every date is rendered in
    pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

    // Ambiguous day/month orders resolve to month first.
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%m-%d-%Y",
        "%b %d, %Y",
        "%B %d, %Y",
        "%d-%b-%Y",
        "%d %b %Y",
    ];

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];

    /// Parse a date written in any of the supported layouts
    pub fn parse_date(raw: &str) -> Result<NaiveDate> {
        let text = raw.trim().trim_matches('"');

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                return Ok(date);
            }
        }
        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(datetime.date());
            }
        }
        if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
            return Ok(datetime.date_naive());
        }

        Err(ForecastError::ValidationError(format!(
            "Unrecognised date '{}'",
            raw
        )))
    }

    /// Render a date in the canonical `YYYY-MM-DD` layout
    pub fn format_date(date: NaiveDate) -> String {
        date.format(CANONICAL_FORMAT).to_string()
    }
}
