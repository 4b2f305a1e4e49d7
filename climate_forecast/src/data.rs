//! Loading and normalizing the raw price and climate tables

use crate::error::{ForecastError, Result};
use crate::utils::date_parser;
use chrono::NaiveDate;
use csv::StringRecord;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One settlement price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    /// Currency per unit mass, always positive
    pub price: f64,
}

/// Price history, unique per date and sorted ascending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    /// Validate and sort observations
    pub fn new(mut observations: Vec<PriceObservation>) -> Result<Self> {
        if let Some(bad) = observations
            .iter()
            .find(|o| !o.price.is_finite() || o.price <= 0.0)
        {
            return Err(ForecastError::ValidationError(format!(
                "Price on {} must be a positive finite number, got {}",
                bad.date, bad.price
            )));
        }

        observations.sort_by_key(|o| o.date);
        if let Some(pair) = observations.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ForecastError::ValidationError(format!(
                "Duplicate price date {}",
                pair[0].date
            )));
        }

        Ok(Self { observations })
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.price).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Policy for station rows without an average temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureImputation {
    /// Use `(max + min) / 2` when both extremes were reported
    Midrange,
    /// Leave the value absent
    None,
}

/// One station's report for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateObservation {
    pub date: NaiveDate,
    pub station: String,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub avg_temp: Option<f64>,
    /// Missing readings are stored as 0.0 (no rain recorded)
    pub precipitation: f64,
}

/// Station reports sorted by date, then station
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateRecords {
    observations: Vec<ClimateObservation>,
}

impl ClimateRecords {
    pub fn new(mut observations: Vec<ClimateObservation>) -> Self {
        observations.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.station.cmp(&b.station)));
        Self { observations }
    }

    pub fn observations(&self) -> &[ClimateObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of distinct stations
    pub fn station_count(&self) -> usize {
        let mut stations: Vec<&str> = self.observations.iter().map(|o| o.station.as_str()).collect();
        stations.sort_unstable();
        stations.dedup();
        stations.len()
    }
}

/// Column positions of the climate table
struct ClimateColumns {
    date: usize,
    station: Option<usize>,
    max_temp: Option<usize>,
    min_temp: Option<usize>,
    avg_temp: Option<usize>,
    precipitation: Option<usize>,
}

/// Data loader for the raw input tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a price history from a CSV file
    pub fn prices_from_csv<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
        let path = path.as_ref();
        info!("Loading prices from {}", path.display());
        let file = File::open(path)?;
        Self::prices_from_reader(file)
    }

    /// Load a price history from any CSV source with a header row.
    ///
    /// The first unparsable row aborts the load.
    pub fn prices_from_reader<R: Read>(reader: R) -> Result<PriceSeries> {
        let mut rdr = Self::csv_reader(reader);
        let headers = rdr.headers()?.clone();
        let date_idx = Self::detect_time_column(&headers)?;
        let price_idx = Self::detect_price_column(&headers)?;

        let mut seen: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        let mut observations = Vec::new();
        for row in rdr.records() {
            let record = row?;
            let line = Self::line_of(&record);

            let raw_date = record.get(date_idx).unwrap_or("");
            let date = date_parser::parse_date(raw_date)
                .map_err(|_| ForecastError::malformed(line, "date", raw_date))?;

            let raw_price = record.get(price_idx).unwrap_or("");
            let price = parse_number(raw_price)
                .filter(|p| *p > 0.0)
                .ok_or_else(|| ForecastError::malformed(line, "price", raw_price))?;

            if seen.insert(date, line).is_some() {
                return Err(ForecastError::malformed(line, "date", raw_date));
            }
            observations.push(PriceObservation { date, price });
        }

        debug!("Parsed {} price rows", observations.len());
        PriceSeries::new(observations)
    }

    /// Load station observations from a CSV file
    pub fn climate_from_csv<P: AsRef<Path>>(
        path: P,
        imputation: TemperatureImputation,
    ) -> Result<ClimateRecords> {
        let path = path.as_ref();
        info!("Loading climate observations from {}", path.display());
        let file = File::open(path)?;
        Self::climate_from_reader(file, imputation)
    }

    /// Load station observations from any CSV source with a header row.
    ///
    /// Empty or `NA` precipitation becomes 0.0. Empty temperatures stay
    /// absent unless `imputation` can fill the average from the extremes.
    pub fn climate_from_reader<R: Read>(
        reader: R,
        imputation: TemperatureImputation,
    ) -> Result<ClimateRecords> {
        let mut rdr = Self::csv_reader(reader);
        let headers = rdr.headers()?.clone();
        let columns = Self::detect_climate_columns(&headers)?;

        let mut observations = Vec::new();
        let mut imputed = 0usize;
        for row in rdr.records() {
            let record = row?;
            let line = Self::line_of(&record);

            let raw_date = record.get(columns.date).unwrap_or("");
            let date = date_parser::parse_date(raw_date)
                .map_err(|_| ForecastError::malformed(line, "date", raw_date))?;

            let station = columns
                .station
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_string();

            let max_temp = Self::optional_field(&record, columns.max_temp, line, "max_temp")?;
            let min_temp = Self::optional_field(&record, columns.min_temp, line, "min_temp")?;
            let mut avg_temp = Self::optional_field(&record, columns.avg_temp, line, "avg_temp")?;
            let precipitation =
                Self::optional_field(&record, columns.precipitation, line, "precipitation")?
                    .unwrap_or(0.0);

            if avg_temp.is_none() && imputation == TemperatureImputation::Midrange {
                if let (Some(high), Some(low)) = (max_temp, min_temp) {
                    avg_temp = Some((high + low) / 2.0);
                    imputed += 1;
                }
            }

            observations.push(ClimateObservation {
                date,
                station,
                max_temp,
                min_temp,
                avg_temp,
                precipitation,
            });
        }

        debug!(
            "Parsed {} climate rows ({} averages imputed from extremes)",
            observations.len(),
            imputed
        );
        Ok(ClimateRecords::new(observations))
    }

    fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
    }

    fn line_of(record: &StringRecord) -> u64 {
        record.position().map(|p| p.line()).unwrap_or(0)
    }

    /// Parse a numeric cell where empty and `NA`-like markers mean absent
    fn optional_field(
        record: &StringRecord,
        index: Option<usize>,
        line: u64,
        field: &str,
    ) -> Result<Option<f64>> {
        let raw = match index.and_then(|i| record.get(i)) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        if is_missing(raw) {
            return Ok(None);
        }
        parse_number(raw)
            .map(Some)
            .ok_or_else(|| ForecastError::malformed(line, field, raw))
    }

    /// Detect the date column in a header row
    fn detect_time_column(headers: &StringRecord) -> Result<usize> {
        Self::find_column(headers, &["date", "time"])
            .ok_or_else(|| ForecastError::MissingColumn("date".to_string()))
    }

    /// Detect the price column, falling back to a close column
    fn detect_price_column(headers: &StringRecord) -> Result<usize> {
        Self::find_column(headers, &["price"])
            .or_else(|| Self::find_column(headers, &["close"]))
            .ok_or_else(|| ForecastError::MissingColumn("price".to_string()))
    }

    fn detect_climate_columns(headers: &StringRecord) -> Result<ClimateColumns> {
        let date = Self::find_column(headers, &["date"])
            .ok_or_else(|| ForecastError::MissingColumn("date".to_string()))?;

        let columns = ClimateColumns {
            date,
            station: Self::find_column(headers, &["station"]),
            max_temp: Self::find_column(headers, &["tmax", "max"]),
            min_temp: Self::find_column(headers, &["tmin", "min"]),
            avg_temp: Self::find_column(headers, &["tavg", "average", "avg", "mean"]),
            precipitation: Self::find_column(headers, &["prcp", "precip", "rain"]),
        };

        let has_average = columns.avg_temp.is_some();
        let has_extremes = columns.max_temp.is_some() && columns.min_temp.is_some();
        if !has_average && !has_extremes {
            return Err(ForecastError::MissingColumn(
                "average temperature (or both max and min)".to_string(),
            ));
        }

        Ok(columns)
    }

    /// First header containing a candidate, trying candidates in order
    fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            headers
                .iter()
                .position(|name| name.to_lowercase().contains(candidate))
        })
    }
}

fn is_missing(raw: &str) -> bool {
    let value = raw.trim().trim_matches('"');
    value.is_empty()
        || value.eq_ignore_ascii_case("na")
        || value.eq_ignore_ascii_case("nan")
        || value.eq_ignore_ascii_case("null")
}

/// Parse a number written with optional quotes and thousands separators
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_matches('"')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a formatted price such as `"2,345.50"`.
///
/// Fails with `MalformedRecord` when the text is not a positive number
/// after the separators are stripped.
pub fn parse_price(raw: &str) -> Result<f64> {
    parse_number(raw)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| ForecastError::malformed(0, "price", raw))
}
