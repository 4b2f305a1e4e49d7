//! Analysis configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "train_fraction": 0.75, "report": { "horizon": 90 } }
//! ```

use crate::data::TemperatureImputation;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Top-level configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Share of observations (in index order) used for fitting
    pub train_fraction: f64,
    /// Smallest acceptable `matched / min(len(prices), len(climate days))`
    pub min_join_fraction: f64,
    /// How missing station averages are handled at load time
    pub temperature_imputation: TemperatureImputation,
    pub diagnostics: DiagnosticsConfig,
    pub optimizer: OptimizerConfig,
    pub selection: SelectionConfig,
    pub report: ReportConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            min_join_fraction: 0.5,
            temperature_imputation: TemperatureImputation::Midrange,
            diagnostics: DiagnosticsConfig::default(),
            optimizer: OptimizerConfig::default(),
            selection: SelectionConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Settings of the diagnostics stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Maximum lag of the ACF/PACF
    pub max_lag: usize,
    /// Half-width of the cross-correlation lag window
    pub ccf_max_lag: usize,
    /// Significance level of the unit-root and ARCH tests
    pub significance: f64,
    /// Half-variance ratio above which a series is flagged
    pub variance_ratio_threshold: f64,
    pub arch_lags: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_lag: 50,
            ccf_max_lag: 30,
            significance: 0.05,
            variance_ratio_threshold: 2.0,
            arch_lags: 5,
        }
    }
}

/// Nelder-Mead settings used by every maximum likelihood fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub max_iters: u64,
    /// Standard deviation of simplex costs at which the search stops
    pub sd_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iters: 5000,
            sd_tolerance: 1e-10,
        }
    }
}

/// Settings of the model selection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Refit the chosen variant on the full series before the final forecast
    pub refit_on_full_sample: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            refit_on_full_sample: true,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Steps ahead of the final forecast
    pub horizon: usize,
    /// Directory the SVG charts are written to
    pub output_dir: PathBuf,
    /// Rows shown at each end of the interval table
    pub table_rows: usize,
    pub render_plots: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            horizon: 365,
            output_dir: PathBuf::from("report"),
            table_rows: 5,
            render_plots: true,
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: AnalysisConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "train_fraction must lie in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.min_join_fraction) {
            return Err(ForecastError::InvalidParameter(format!(
                "min_join_fraction must lie in [0, 1], got {}",
                self.min_join_fraction
            )));
        }
        let significance = self.diagnostics.significance;
        if !(significance > 0.0 && significance < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "significance must lie in (0, 1), got {}",
                significance
            )));
        }
        if self.diagnostics.variance_ratio_threshold < 1.0 {
            return Err(ForecastError::InvalidParameter(
                "variance_ratio_threshold must be at least 1".to_string(),
            ));
        }
        if self.diagnostics.arch_lags == 0 {
            return Err(ForecastError::InvalidParameter(
                "arch_lags must be positive".to_string(),
            ));
        }
        if self.optimizer.max_iters == 0 || self.optimizer.sd_tolerance <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "optimizer needs positive max_iters and sd_tolerance".to_string(),
            ));
        }
        if self.report.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast horizon must be positive".to_string(),
            ));
        }
        if self.report.table_rows == 0 {
            return Err(ForecastError::InvalidParameter(
                "table_rows must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
