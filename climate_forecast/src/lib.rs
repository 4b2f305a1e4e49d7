//! # Climate Forecast
//!
//! Analysis of a daily commodity price series against daily weather.
//!
//! ## Features
//!
//! - CSV loading of settlement prices and station-level climate reports
//! - Station aggregation and a date join that refuses to run on a degenerate overlap
//! - Diagnostics: augmented Dickey-Fuller, ACF/PACF, variance split, ARCH LM, cross-correlation
//! - Four candidate models fitted by maximum likelihood: ARIMA(1,1,0) and
//!   AR(1)-GARCH(1,1), each with and without temperature as a regressor
//! - Two-stage selection: information criteria within a family, held-out
//!   RMSE across families
//! - Forecasts with 80% and 95% bands, text tables and SVG charts
//!
//! ## Quick Start
//!
//! ```no_run
//! use climate_forecast::config::AnalysisConfig;
//! use climate_forecast::pipeline::{self, InputPaths};
//! use climate_forecast::report;
//!
//! # fn main() -> Result<(), climate_forecast::ForecastError> {
//! let config = AnalysisConfig::default();
//! let paths = InputPaths {
//!     prices: "prices.csv".into(),
//!     climate: "climate.csv".into(),
//! };
//!
//! let analysis = pipeline::run(&paths, &config)?;
//! println!("{}", report::text_report(&analysis, config.report.table_rows));
//! report::render(&analysis, &config.report.output_dir)?;
//! # Ok(())
//! # }
//! ```

pub mod align;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod synthetic;
pub mod utils;

// Re-export commonly used types
pub use crate::align::{align, MatchedSeries};
pub use crate::config::AnalysisConfig;
pub use crate::data::{ClimateRecords, DataLoader, PriceSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{
    fit_variant, FittedModel, ForecastModel, ForecastResult, ModelFamily, ModelVariant,
    TrainedForecastModel,
};
pub use crate::pipeline::AnalysisReport;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
