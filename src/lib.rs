//! # Price Climate
//!
//! Workspace facade re-exporting the numerical primitives and the analysis
//! pipeline.
//!
//! ## Example
//!
//! ```
//! use price_climate::series_math::{difference, integrate};
//!
//! let prices = [10.0, 11.5, 11.0, 12.25];
//! let changes = difference(&prices, 1).unwrap();
//! assert_eq!(integrate(&changes, prices[0]), prices.to_vec());
//! ```

pub use climate_forecast;
pub use series_math;

/// Versions of the workspace crates, as `(name, version)`
pub fn crate_versions() -> [(&'static str, &'static str); 3] {
    [
        (series_math::NAME, series_math::VERSION),
        (climate_forecast::NAME, climate_forecast::VERSION),
        ("price_climate", env!("CARGO_PKG_VERSION")),
    ]
}
