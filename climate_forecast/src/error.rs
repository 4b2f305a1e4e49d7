//! Error types for the climate_forecast crate

use series_math::MathError;
use thiserror::Error;

/// Custom error types for the climate_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A row's date or numeric field could not be parsed; the whole load is aborted
    #[error("Malformed record at line {line}: field '{field}' has value '{value}'")]
    MalformedRecord {
        line: u64,
        field: String,
        value: String,
    },

    /// A required column is absent from an input table
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// The date join retained too few rows, usually a sign of mismatched calendars
    #[error("Join mismatch: only {matched} of an expected {expected} dates matched")]
    JoinMismatch { matched: usize, expected: usize },

    /// Maximum likelihood estimation did not converge
    #[error("Model {model} did not converge: {reason}")]
    NonConvergence { model: String, reason: String },

    /// Future exogenous values do not cover the forecast horizon
    #[error("Exogenous mismatch: expected {expected} future values, got {actual}")]
    ExogenousMismatch { expected: usize, actual: usize },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from numerical routines
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the CSV reader
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error while rendering a chart
    #[error("Plot error: {0}")]
    Plot(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    pub(crate) fn malformed(line: u64, field: &str, value: &str) -> Self {
        ForecastError::MalformedRecord {
            line,
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
