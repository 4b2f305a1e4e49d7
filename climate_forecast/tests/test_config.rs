use climate_forecast::config::AnalysisConfig;
use climate_forecast::data::TemperatureImputation;
use climate_forecast::ForecastError;
use std::io::Write;
use tempfile::NamedTempFile;

fn json_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn test_defaults() {
    let config = AnalysisConfig::default();

    assert_eq!(config.train_fraction, 0.8);
    assert_eq!(config.diagnostics.max_lag, 50);
    assert_eq!(config.report.horizon, 365);
    assert!(config.selection.refit_on_full_sample);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = json_file(
        r#"{ "train_fraction": 0.75, "temperature_imputation": "none", "report": { "horizon": 90 } }"#,
    );

    let config = AnalysisConfig::from_json_file(file.path()).unwrap();

    assert_eq!(config.train_fraction, 0.75);
    assert_eq!(config.temperature_imputation, TemperatureImputation::None);
    assert_eq!(config.report.horizon, 90);
    assert_eq!(config.report.table_rows, 5);
    assert_eq!(config.optimizer, AnalysisConfig::default().optimizer);
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = json_file(r#"{ "train_fraction": 1.2 }"#);
    assert!(matches!(
        AnalysisConfig::from_json_file(file.path()),
        Err(ForecastError::InvalidParameter(_))
    ));

    let mut config = AnalysisConfig::default();
    config.report.horizon = 0;
    assert!(config.validate().is_err());

    let mut config = AnalysisConfig::default();
    config.optimizer.max_iters = 0;
    assert!(config.validate().is_err());

    let mut config = AnalysisConfig::default();
    config.report.table_rows = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_bad_json() {
    let file = json_file("{ train_fraction: ");
    assert!(matches!(
        AnalysisConfig::from_json_file(file.path()),
        Err(ForecastError::Json(_))
    ));
}
