use chrono::NaiveDate;
use climate_forecast::data::{parse_price, DataLoader, TemperatureImputation};
use climate_forecast::utils::date_parser;
use climate_forecast::ForecastError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_prices_from_csv() {
    let file = csv_file(&[
        "date,price",
        "2023-01-03,2010.5",
        "2023-01-01,2000.0",
        "2023-01-02,2005.25",
    ]);

    let prices = DataLoader::prices_from_csv(file.path()).unwrap();

    assert_eq!(prices.len(), 3);
    assert!(prices.prices().iter().all(|p| *p > 0.0 && p.is_finite()));
    assert!(prices.dates().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(prices.prices(), vec![2000.0, 2005.25, 2010.5]);
}

#[test]
fn test_close_column_with_thousands_separators() {
    let file = csv_file(&[
        "Date,Open,Close",
        "01/02/2023,\"2,300.00\",\"2,345.50\"",
        "01/03/2023,\"2,345.50\",\"2,351.75\"",
    ]);

    let prices = DataLoader::prices_from_csv(file.path()).unwrap();

    assert_eq!(prices.prices(), vec![2345.5, 2351.75]);
    assert_eq!(
        prices.dates()[0],
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
    );
}

#[test]
fn test_malformed_price_row_aborts_load() {
    let file = csv_file(&[
        "date,price",
        "2023-01-01,2000.0",
        "2023-01-02,abc",
        "2023-01-03,2010.0",
    ]);

    match DataLoader::prices_from_csv(file.path()) {
        Err(ForecastError::MalformedRecord { line, field, value }) => {
            assert_eq!(line, 3);
            assert_eq!(field, "price");
            assert_eq!(value, "abc");
        }
        other => panic!("Expected MalformedRecord, got {:?}", other),
    }
}

#[rstest]
#[case("2023-13-45,2000.0", "date")]
#[case("2023-01-02,-5.0", "price")]
#[case("2023-01-02,", "price")]
fn test_malformed_fields(#[case] row: &str, #[case] expected_field: &str) {
    let file = csv_file(&["date,price", row]);

    match DataLoader::prices_from_csv(file.path()) {
        Err(ForecastError::MalformedRecord { field, .. }) => assert_eq!(field, expected_field),
        other => panic!("Expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn test_duplicate_price_date_is_rejected() {
    let file = csv_file(&["date,price", "2023-01-01,1.0", "2023-01-01,2.0"]);

    assert!(matches!(
        DataLoader::prices_from_csv(file.path()),
        Err(ForecastError::MalformedRecord { line: 3, .. })
    ));
}

#[test]
fn test_missing_price_column() {
    let file = csv_file(&["date,volume", "2023-01-01,100"]);

    assert!(matches!(
        DataLoader::prices_from_csv(file.path()),
        Err(ForecastError::MissingColumn(_))
    ));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        DataLoader::prices_from_csv("nonexistent_file.csv"),
        Err(ForecastError::IoError(_))
    ));
}

#[test]
fn test_climate_midrange_imputation() {
    let lines = [
        "date,station,tmax,tmin,tavg,prcp",
        "2023-01-01,A,30.0,20.0,,NA",
        "2023-01-01,B,28.0,18.0,22.0,4.2",
        "2023-01-02,A,,,,",
    ];

    let records = DataLoader::climate_from_reader(
        lines.join("\n").as_bytes(),
        TemperatureImputation::Midrange,
    )
    .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records.station_count(), 2);
    let obs = records.observations();
    assert_eq!(obs[0].avg_temp, Some(25.0));
    assert_eq!(obs[0].precipitation, 0.0);
    assert_eq!(obs[1].avg_temp, Some(22.0));
    assert_eq!(obs[1].precipitation, 4.2);
    assert_eq!(obs[2].avg_temp, None);
}

#[test]
fn test_climate_without_imputation_keeps_gaps() {
    let lines = ["date,station,tmax,tmin,tavg", "2023-01-01,A,30.0,20.0,"];

    let records =
        DataLoader::climate_from_reader(lines.join("\n").as_bytes(), TemperatureImputation::None)
            .unwrap();

    assert_eq!(records.observations()[0].avg_temp, None);
    assert_eq!(records.observations()[0].max_temp, Some(30.0));
}

#[test]
fn test_climate_long_header_names() {
    let lines = [
        "date,station,max_temperature,min_temperature,average_temperature,precipitation",
        "2023-01-01,A,30.0,10.0,25.0,1.5",
    ];

    let records = DataLoader::climate_from_reader(
        lines.join("\n").as_bytes(),
        TemperatureImputation::Midrange,
    )
    .unwrap();

    let obs = &records.observations()[0];
    assert_eq!(obs.avg_temp, Some(25.0));
    assert_eq!(obs.max_temp, Some(30.0));
    assert_eq!(obs.min_temp, Some(10.0));
    assert_eq!(obs.precipitation, 1.5);

    let lines = ["date,station,average_temperature", "2023-01-01,A,18.5"];
    let records =
        DataLoader::climate_from_reader(lines.join("\n").as_bytes(), TemperatureImputation::None)
            .unwrap();
    assert_eq!(records.observations()[0].avg_temp, Some(18.5));
}

#[test]
fn test_climate_malformed_temperature() {
    let lines = ["date,station,tavg", "2023-01-01,A,warm"];

    assert!(matches!(
        DataLoader::climate_from_reader(
            lines.join("\n").as_bytes(),
            TemperatureImputation::Midrange
        ),
        Err(ForecastError::MalformedRecord { .. })
    ));
}

#[test]
fn test_climate_needs_a_temperature_column() {
    let lines = ["date,station,prcp", "2023-01-01,A,1.0"];

    assert!(matches!(
        DataLoader::climate_from_reader(
            lines.join("\n").as_bytes(),
            TemperatureImputation::Midrange
        ),
        Err(ForecastError::MissingColumn(_))
    ));
}

#[rstest]
#[case("2023-01-05")]
#[case("2023/01/05")]
#[case("01/05/2023")]
#[case("Jan 05, 2023")]
#[case("05-Jan-2023")]
#[case("2023-01-05 14:30:00")]
#[case("2023-01-05T14:30:00Z")]
fn test_date_layouts_round_trip(#[case] raw: &str) {
    let date = date_parser::parse_date(raw).unwrap();

    assert_eq!(date, NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
    assert_eq!(date_parser::format_date(date), "2023-01-05");
    assert_eq!(
        date_parser::parse_date(&date_parser::format_date(date)).unwrap(),
        date
    );
}

#[test]
fn test_parse_price() {
    assert_eq!(parse_price("\"2,345.50\"").unwrap(), 2345.5);
    assert_eq!(parse_price(" 12 ").unwrap(), 12.0);
    assert!(matches!(
        parse_price("n/a"),
        Err(ForecastError::MalformedRecord { .. })
    ));
}
