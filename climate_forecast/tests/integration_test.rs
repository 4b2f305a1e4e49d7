use chrono::{Duration, NaiveDate};
use climate_forecast::config::AnalysisConfig;
use climate_forecast::models::ModelFamily;
use climate_forecast::pipeline::{self, InputPaths};
use climate_forecast::report;
use climate_forecast::synthetic::{self, SyntheticConfig};
use climate_forecast::ForecastError;
use std::io::Write;
use tempfile::NamedTempFile;

fn csv_file(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

#[test]
fn test_end_to_end_synthetic() {
    // 1000 days to analyse plus 30 realised days to score the forecast against
    let full = synthetic::matched_series(start(), 1030, &SyntheticConfig::default()).unwrap();
    let history = full.slice(0, 1000).unwrap();
    let future = full.slice(1000, 1030).unwrap();

    let mut config = AnalysisConfig::default();
    config.report.horizon = 30;

    let analysis = pipeline::analyze(&history, &config).unwrap();

    // diagnostics
    assert!(!analysis.diagnostics.price.stationarity.is_stationary);
    assert!(analysis.diagnostics.price_changes.stationarity.is_stationary);

    // every candidate fitted, one finalist per family, one winner
    assert_eq!(analysis.candidates.len(), 4);
    assert_eq!(analysis.train_len, 800);
    assert_eq!(analysis.test_len, 200);
    assert_eq!(analysis.family_choices.len(), 2);
    assert_eq!(analysis.family_choices[0].family, ModelFamily::Arima);
    assert_eq!(analysis.family_choices[1].family, ModelFamily::Garch);
    assert!(analysis
        .family_choices
        .iter()
        .any(|c| c.variant == analysis.selection.chosen));
    assert_eq!(analysis.final_model.variant, analysis.selection.chosen);

    // final forecast
    let forecast = &analysis.forecast;
    assert_eq!(forecast.horizons(), 30);
    assert_eq!(forecast.dates().unwrap(), future.dates().as_slice());
    assert_eq!(analysis.future_temperatures.len(), 30);
    assert!(forecast.bands_are_ordered());

    let rmse = forecast.root_mean_squared_error(&future.prices()).unwrap();
    assert!(rmse.is_finite());
    assert!(rmse >= 0.0);

    let json = analysis.to_json().unwrap();
    assert!(json.contains("\"chosen\""));

    let text = report::text_report(&analysis, 3);
    assert!(text.contains("== Diagnostics =="));
    assert!(text.contains("== Information criteria (training split) =="));
    assert!(text.contains("== Held-out forecast error =="));
}

#[test]
fn test_forecast_from_training_fit() {
    let series = synthetic::matched_series(start(), 400, &SyntheticConfig::default()).unwrap();
    let mut config = AnalysisConfig::default();
    config.report.horizon = 10;
    config.selection.refit_on_full_sample = false;

    let analysis = pipeline::analyze(&series, &config).unwrap();

    let chosen = analysis
        .candidates
        .iter()
        .find(|c| c.variant == analysis.selection.chosen)
        .unwrap();
    assert_eq!(&analysis.final_model, chosen);
    assert_eq!(analysis.final_model.nobs, chosen.nobs);
}

fn climate_lines(days: i64) -> Vec<String> {
    let mut lines = vec!["date,station,tmax,tmin,tavg,prcp".to_string()];
    for i in 0..days {
        let date = start() + Duration::days(i);
        lines.push(format!("{},A,25.0,15.0,,0.0", date.format("%Y-%m-%d")));
    }
    lines
}

#[test]
fn test_malformed_price_row_stops_the_run() {
    let mut prices = vec!["date,price".to_string()];
    for i in 0..300 {
        let date = start() + Duration::days(i);
        let price = if i == 150 {
            "n/a".to_string()
        } else {
            format!("{}", 2000.0 + i as f64)
        };
        prices.push(format!("{},{}", date.format("%Y-%m-%d"), price));
    }
    let price_file = csv_file(&prices);
    let climate_file = csv_file(&climate_lines(300));

    let paths = InputPaths {
        prices: price_file.path().to_path_buf(),
        climate: climate_file.path().to_path_buf(),
    };

    match pipeline::run(&paths, &AnalysisConfig::default()) {
        Err(ForecastError::MalformedRecord { line, field, value }) => {
            assert_eq!(line, 152);
            assert_eq!(field, "price");
            assert_eq!(value, "n/a");
        }
        other => panic!("Expected MalformedRecord, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_mismatched_calendars_stop_the_run() {
    let mut prices = vec!["date,price".to_string()];
    for i in 0..100 {
        let date = start() + Duration::days(1000 + i);
        prices.push(format!("{},{}", date.format("%Y-%m-%d"), 2000.0 + i as f64));
    }
    let price_file = csv_file(&prices);
    let climate_file = csv_file(&climate_lines(100));

    let paths = InputPaths {
        prices: price_file.path().to_path_buf(),
        climate: climate_file.path().to_path_buf(),
    };

    assert!(matches!(
        pipeline::run(&paths, &AnalysisConfig::default()),
        Err(ForecastError::JoinMismatch { matched: 0, .. })
    ));
}
