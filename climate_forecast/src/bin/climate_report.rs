use chrono::NaiveDate;
use clap::Parser;
use climate_forecast::config::AnalysisConfig;
use climate_forecast::pipeline::{self, InputPaths};
use climate_forecast::report;
use climate_forecast::synthetic::{self, SyntheticConfig};
use log::info;
use std::error::Error;
use std::path::PathBuf;

/// Fit, compare and forecast price models against daily temperature
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Price table (CSV with a date and a price or close column)
    #[arg(long, required_unless_present = "synthetic")]
    prices: Option<PathBuf>,

    /// Station climate table (CSV)
    #[arg(long, required_unless_present = "synthetic")]
    climate: Option<PathBuf>,

    /// JSON analysis configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for charts and the JSON report
    #[arg(long)]
    output: Option<PathBuf>,

    /// Forecast horizon in steps
    #[arg(long)]
    horizon: Option<usize>,

    /// Analyse N days of generated data instead of input files
    #[arg(long, value_name = "N", conflicts_with_all = ["prices", "climate"])]
    synthetic: Option<usize>,

    /// Skip writing charts
    #[arg(long, default_value_t = false)]
    no_plots: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Parsed arguments: {:?}", args);

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(output) = args.output {
        config.report.output_dir = output;
    }
    if let Some(horizon) = args.horizon {
        config.report.horizon = horizon;
    }
    if args.no_plots {
        config.report.render_plots = false;
    }
    config.validate()?;

    let analysis = match args.synthetic {
        Some(days) => {
            let start = NaiveDate::from_ymd_opt(2015, 1, 1).ok_or("invalid start date")?;
            let series = synthetic::matched_series(start, days, &SyntheticConfig::default())?;
            pipeline::analyze(&series, &config)?
        }
        None => {
            let paths = InputPaths {
                prices: args.prices.ok_or("--prices is required")?,
                climate: args.climate.ok_or("--climate is required")?,
            };
            pipeline::run(&paths, &config)?
        }
    };

    println!("{}", report::text_report(&analysis, config.report.table_rows));

    if config.report.render_plots {
        let written = report::render(&analysis, &config.report.output_dir)?;
        for path in written {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
