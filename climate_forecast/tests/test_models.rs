use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use climate_forecast::config::OptimizerConfig;
use climate_forecast::models::{
    fit_variant, ArimaModel, ForecastModel, ForecastResult, IntervalLevel, ModelFamily,
    ModelVariant, TrainedForecastModel,
};
use climate_forecast::synthetic::{self, SyntheticConfig};
use climate_forecast::{ForecastError, MatchedSeries};
use rstest::rstest;

fn create_test_data(n: usize) -> MatchedSeries {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    synthetic::matched_series(start, n, &SyntheticConfig::default()).unwrap()
}

#[rstest]
#[case(ModelVariant::Arima)]
#[case(ModelVariant::ArimaX)]
#[case(ModelVariant::Garch)]
#[case(ModelVariant::GarchX)]
fn test_variant_fits_and_forecasts(#[case] variant: ModelVariant) {
    let data = create_test_data(600);
    let model = fit_variant(variant, &data, &OptimizerConfig::default()).unwrap();

    let summary = model.summary();
    assert_eq!(summary.variant, variant);
    assert!(summary.log_likelihood.is_finite());
    let k = summary.parameters as f64;
    assert_approx_eq!(summary.aic, -2.0 * summary.log_likelihood + 2.0 * k, 1e-9);
    assert_approx_eq!(
        summary.bic,
        -2.0 * summary.log_likelihood + k * (summary.nobs as f64).ln(),
        1e-9
    );

    let temperatures = vec![20.0; 30];
    let forecast = model.forecast(30, Some(&temperatures)).unwrap();
    assert_eq!(forecast.horizons(), 30);
    assert_eq!(forecast.values().len(), 30);
    assert!(forecast.bands_are_ordered());
    assert!(forecast.std_errors().iter().all(|s| *s > 0.0));
}

#[test]
fn test_parameter_counts() {
    let data = create_test_data(500);
    let config = OptimizerConfig::default();
    let expected = [
        (ModelVariant::Arima, 2),
        (ModelVariant::ArimaX, 3),
        (ModelVariant::Garch, 5),
        (ModelVariant::GarchX, 6),
    ];

    for (variant, parameters) in expected {
        let model = fit_variant(variant, &data, &config).unwrap();
        assert_eq!(model.summary().parameters, parameters, "{}", variant);
        assert_eq!(model.summary().family(), variant.family());
    }
}

#[test]
fn test_fitting_is_deterministic() {
    let data = create_test_data(500);
    let config = OptimizerConfig::default();

    for variant in ModelVariant::ALL {
        let first = fit_variant(variant, &data, &config).unwrap();
        let second = fit_variant(variant, &data, &config).unwrap();
        assert_eq!(first.summary(), second.summary());
    }
}

#[test]
fn test_iteration_budget_exhaustion_is_non_convergence() {
    let data = create_test_data(300);
    let config = OptimizerConfig {
        max_iters: 1,
        sd_tolerance: 1e-12,
    };

    for variant in ModelVariant::ALL {
        match fit_variant(variant, &data, &config) {
            Err(ForecastError::NonConvergence { model, .. }) => assert!(!model.is_empty()),
            other => panic!("Expected NonConvergence for {}, got {:?}", variant, other),
        }
    }
}

#[test]
fn test_exogenous_forecast_needs_matching_horizon() {
    let data = create_test_data(300);
    let model = fit_variant(ModelVariant::GarchX, &data, &OptimizerConfig::default()).unwrap();

    assert!(matches!(
        model.forecast(10, Some(&[1.0; 9])),
        Err(ForecastError::ExogenousMismatch {
            expected: 10,
            actual: 9
        })
    ));
    assert!(matches!(
        model.forecast(10, None),
        Err(ForecastError::ExogenousMismatch { .. })
    ));
}

#[test]
fn test_plain_model_ignores_regressor_values() {
    let data = create_test_data(300);
    let model = fit_variant(ModelVariant::Arima, &data, &OptimizerConfig::default()).unwrap();

    let without = model.forecast(5, None).unwrap();
    let with = model.forecast(5, Some(&[40.0; 5])).unwrap();
    assert_eq!(without, with);
}

#[test]
fn test_arima_model_name() {
    let model = ArimaModel::new(1, 1, 0).unwrap();
    assert_eq!(model.name(), "ARIMA(1,1,0)");
    assert_eq!(model.with_exogenous().name(), "ARIMAX(1,1,0)");
    assert!(ArimaModel::new(1, 3, 0).is_err());
}

#[test]
fn test_forecast_result_intervals() {
    let result = ForecastResult::from_standard_errors(vec![100.0, 101.0], vec![2.0, 3.0]).unwrap();

    let (lower, upper) = result.interval(IntervalLevel::NinetyFive);
    assert_approx_eq!(lower[0], 100.0 - 1.959964 * 2.0, 1e-4);
    assert_approx_eq!(upper[1], 101.0 + 1.959964 * 3.0, 1e-4);

    let custom = result.confidence_intervals(0.80).unwrap();
    let (lower80, _) = result.interval(IntervalLevel::Eighty);
    assert_approx_eq!(custom[0].0, lower80[0], 1e-12);

    assert!(result.confidence_intervals(1.5).is_err());
    assert!(ForecastResult::from_standard_errors(vec![1.0], vec![1.0, 2.0]).is_err());
}

#[test]
fn test_forecast_result_errors_and_json() {
    let result = ForecastResult::new(vec![1.0, 2.0, 3.0], 3).unwrap();
    let actual = [2.0, 2.0, 5.0];

    assert_approx_eq!(result.mean_absolute_error(&actual).unwrap(), 1.0);
    assert_approx_eq!(result.mean_squared_error(&actual).unwrap(), 5.0 / 3.0);
    assert_approx_eq!(
        result.root_mean_squared_error(&actual).unwrap(),
        (5.0f64 / 3.0).sqrt()
    );
    assert!(result.mean_absolute_error(&[1.0]).is_err());

    let json = result.to_json().unwrap();
    assert!(json.contains("lower_95"));
    assert!(ForecastResult::new(vec![1.0], 2).is_err());
}

#[test]
fn test_forecast_json_is_validated_on_read() {
    let result = ForecastResult::from_standard_errors(vec![100.0, 101.0], vec![2.0, 3.0]).unwrap();
    let json = result.to_json().unwrap();

    let restored: ForecastResult = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.horizons(), 2);
    assert_eq!(restored.values(), result.values());
    assert!(restored.bands_are_ordered());

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["horizons"] = serde_json::json!(3);
    assert!(serde_json::from_value::<ForecastResult>(value).is_err());

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["upper_95"] = serde_json::json!([0.0, 0.0]);
    assert!(serde_json::from_value::<ForecastResult>(value).is_err());
}

#[test]
fn test_variant_families() {
    assert_eq!(ModelVariant::of_family(ModelFamily::Arima).len(), 2);
    assert_eq!(
        ModelVariant::of_family(ModelFamily::Garch),
        vec![ModelVariant::Garch, ModelVariant::GarchX]
    );
    assert!(ModelVariant::GarchX.uses_temperature());
    assert!(!ModelVariant::Arima.uses_temperature());
}
