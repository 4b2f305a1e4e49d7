use chrono::NaiveDate;
use climate_forecast::config::OptimizerConfig;
use climate_forecast::models::{fit_variant, IntervalLevel, ModelVariant, TrainedForecastModel};
use climate_forecast::synthetic::{self, SyntheticConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Climate Forecast: Basic Forecasting Example");
    println!("===========================================\n");

    // Two years of generated prices and temperatures
    println!("Creating sample data...");
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).ok_or("invalid start date")?;
    let series = synthetic::matched_series(start, 730, &SyntheticConfig::default())?;
    let (train, test) = series.split_at_fraction(0.8)?;
    println!(
        "Sample data created: {} training days, {} held out\n",
        train.len(),
        test.len()
    );

    println!("Training models...");
    let optimizer = OptimizerConfig::default();
    let mut models = Vec::new();
    for variant in ModelVariant::ALL {
        let model = fit_variant(variant, &train, &optimizer)?;
        let summary = model.summary();
        println!(
            "  {:<20} logL {:>10.2}  AIC {:>10.2}  BIC {:>10.2}",
            summary.name, summary.log_likelihood, summary.aic, summary.bic
        );
        models.push(model);
    }

    // Forecast the held-out days, feeding the realised temperatures
    println!("\nHeld-out RMSE:");
    let temperatures = test.temperatures();
    let actual = test.prices();
    for model in &models {
        let forecast = model.forecast(test.len(), Some(&temperatures))?;
        println!(
            "  {:<20} {:.4}",
            model.name(),
            forecast.root_mean_squared_error(&actual)?
        );
    }

    let forecast = models[0].forecast(5, None)?;
    let (lower, upper) = forecast.interval(IntervalLevel::NinetyFive);
    println!("\n{} 95% bands, first 5 held-out days:", models[0].name());
    for i in 0..forecast.horizons() {
        println!(
            "  Day {}: {:.2} ({:.2}, {:.2})",
            i + 1,
            forecast.values()[i],
            lower[i],
            upper[i]
        );
    }

    Ok(())
}
