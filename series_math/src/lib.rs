//! # Series Math
//!
//! Numerical building blocks for univariate time series analysis.
//! This crate provides the primitives the diagnostics and model fitting
//! layers are built from: descriptive statistics, differencing,
//! autocorrelation functions, least squares and unit-root testing.

use thiserror::Error;

pub mod correlation;
pub mod differencing;
pub mod heteroskedasticity;
pub mod regression;
pub mod statistics;
pub mod unit_root;

pub use correlation::{acf, ccf, confidence_bound, pacf};
pub use differencing::{difference, integrate, undifference};
pub use heteroskedasticity::{arch_lm_test, variance_split, ArchTestResult, VarianceSplit};
pub use regression::{ols, OlsFit};
pub use unit_root::{adf_test, AdfResult, CriticalValues};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    /// Constant or otherwise information-free series
    #[error("Degenerate series: {0}")]
    DegenerateSeries(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
