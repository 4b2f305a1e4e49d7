use assert_approx_eq::assert_approx_eq;
use climate_forecast::metrics::{
    direction_accuracy, evaluate_forecast, forecast_accuracy, interval_coverage,
};
use climate_forecast::models::{ForecastResult, IntervalLevel};

#[test]
fn test_regression_metrics() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

    let accuracy = forecast_accuracy(&predicted, &actual).unwrap();

    assert_approx_eq!(accuracy.mae, 2.4, 0.01);
    assert_approx_eq!(accuracy.mse, 6.0, 0.01);
    assert_approx_eq!(accuracy.rmse, 6.0f64.sqrt(), 0.01);
    assert!(accuracy.mape > 0.0 && accuracy.mape < 15.0);
    assert!(accuracy.smape > 0.0 && accuracy.smape < 15.0);
}

#[test]
fn test_perfect_forecast() {
    let values = vec![1.0, 2.0, 3.0];
    let accuracy = forecast_accuracy(&values, &values).unwrap();

    assert_eq!(accuracy.rmse, 0.0);
    assert_eq!(accuracy.mape, 0.0);
    assert_eq!(direction_accuracy(&values, &values), 100.0);
}

#[test]
fn test_error_handling() {
    let empty: Vec<f64> = vec![];
    assert!(forecast_accuracy(&empty, &empty).is_err());
    assert!(forecast_accuracy(&[1.0, 2.0], &[1.0]).is_err());

    let result = ForecastResult::new(vec![1.0, 2.0], 2).unwrap();
    assert!(interval_coverage(&result, &[1.0], IntervalLevel::Eighty).is_err());
    assert!(evaluate_forecast(&result, &[1.0, 2.0, 3.0]).is_err());
}

#[test]
fn test_direction_accuracy() {
    let forecast = vec![1.0, 2.0, 1.5, 1.5, 3.0];
    let actual = vec![1.0, 3.0, 4.0, 2.0, 2.5];

    // up/up correct, down/up wrong, flat skipped, up/up correct
    assert_approx_eq!(direction_accuracy(&forecast, &actual), 200.0 / 3.0, 1e-9);
    assert_eq!(direction_accuracy(&[1.0, 1.0], &[2.0, 3.0]), 0.0);
}

#[test]
fn test_interval_coverage() {
    let forecast =
        ForecastResult::from_standard_errors(vec![10.0, 10.0, 10.0, 10.0], vec![1.0; 4]).unwrap();
    // 80% band is about ±1.28, 95% about ±1.96
    let actual = [10.0, 11.0, 11.5, 13.0];

    assert_approx_eq!(
        interval_coverage(&forecast, &actual, IntervalLevel::Eighty).unwrap(),
        0.5
    );
    assert_approx_eq!(
        interval_coverage(&forecast, &actual, IntervalLevel::NinetyFive).unwrap(),
        0.75
    );

    let metrics = evaluate_forecast(&forecast, &actual).unwrap();
    assert!(metrics.coverage_95 >= metrics.coverage_80);
    assert!(metrics.to_string().contains("RMSE"));
}
