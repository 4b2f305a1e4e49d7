//! Text tables and SVG charts of an analysis run

use crate::align::MatchedSeries;
use crate::diagnostics::{CorrelationProfile, DiagnosticsReport, SeriesDiagnostics};
use crate::error::{ForecastError, Result};
use crate::models::{FitSummary, ForecastResult, IntervalLevel};
use crate::pipeline::AnalysisReport;
use crate::selection::Selection;
use crate::utils::date_parser::format_date;
use log::info;
use plotters::prelude::*;
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

const CHART_SIZE: (u32, u32) = (1200, 800);

/// Observations of history shown before a forecast
const HISTORY_TAIL: usize = 250;

/// Stationarity and heteroskedasticity findings
pub struct DiagnosticsTable<'a>(pub &'a DiagnosticsReport);

impl fmt::Display for DiagnosticsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(
            f,
            "{:<14} {:>9} {:>8} {:>5} {:>11} {:>10}",
            "Series", "ADF", "p-value", "lag", "stationary", "var ratio"
        )?;
        for series in [&report.price, &report.price_changes, &report.temperature] {
            write_diagnostics_row(f, series)?;
        }
        writeln!(
            f,
            "ARCH LM ({} lags) on price changes: {:.2} (p = {:.4}){}",
            report.arch_effects.lags,
            report.arch_effects.statistic,
            report.arch_effects.p_value,
            if report.arch_effects.heteroskedastic {
                ", conditional heteroskedasticity present"
            } else {
                ""
            }
        )?;
        if let Some((lag, value)) = report.strongest_cross_lag() {
            writeln!(
                f,
                "Strongest price/temperature cross-correlation: {:.3} at lag {}",
                value, lag
            )?;
        }
        Ok(())
    }
}

fn write_diagnostics_row(f: &mut fmt::Formatter<'_>, series: &SeriesDiagnostics) -> fmt::Result {
    writeln!(
        f,
        "{:<14} {:>9.3} {:>8.4} {:>5} {:>11} {:>10.3}",
        series.name,
        series.stationarity.statistic,
        series.stationarity.p_value,
        series.stationarity.used_lag,
        if series.stationarity.is_stationary { "yes" } else { "no" },
        series.variance_split.ratio
    )
}

/// Likelihood and information criteria of every candidate
pub struct CriteriaTable<'a>(pub &'a [FitSummary]);

impl fmt::Display for CriteriaTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<22} {:<6} {:>3} {:>6} {:>12} {:>12} {:>12}",
            "Model", "Family", "k", "nobs", "logL", "AIC", "BIC"
        )?;
        for fit in self.0 {
            writeln!(
                f,
                "{:<22} {:<6} {:>3} {:>6} {:>12.3} {:>12.3} {:>12.3}",
                fit.name,
                fit.family().to_string(),
                fit.parameters,
                fit.nobs,
                fit.log_likelihood,
                fit.aic,
                fit.bic
            )?;
        }
        Ok(())
    }
}

/// Held-out errors of the finalists
pub struct ErrorTable<'a>(pub &'a Selection);

impl fmt::Display for ErrorTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<22} {:>12} {:>12} {:>8} {:>8} {:>8}",
            "Finalist", "RMSE", "MAE", "MAPE %", "in 80 %", "in 95 %"
        )?;
        for score in &self.0.finalists {
            let marker = if score.variant == self.0.chosen { " *" } else { "" };
            writeln!(
                f,
                "{:<22} {:>12.4} {:>12.4} {:>8.2} {:>8.2} {:>8.2}{}",
                score.name,
                score.metrics.accuracy.rmse,
                score.metrics.accuracy.mae,
                score.metrics.accuracy.mape,
                100.0 * score.metrics.coverage_80,
                100.0 * score.metrics.coverage_95,
                marker
            )?;
        }
        Ok(())
    }
}

/// First and last `rows` steps of a forecast with its bands; every step when `rows` is 0
pub struct IntervalTable<'a> {
    pub forecast: &'a ForecastResult,
    pub rows: usize,
}

impl IntervalTable<'_> {
    fn write_step(&self, f: &mut fmt::Formatter<'_>, i: usize) -> fmt::Result {
        let forecast = self.forecast;
        let (lo80, hi80) = forecast.interval(IntervalLevel::Eighty);
        let (lo95, hi95) = forecast.interval(IntervalLevel::NinetyFive);
        let label = forecast
            .dates()
            .map(|d| format_date(d[i]))
            .unwrap_or_else(|| format!("h={}", i + 1));
        writeln!(
            f,
            "{:<12} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            label, lo95[i], lo80[i], forecast.values()[i], hi80[i], hi95[i]
        )
    }
}

impl fmt::Display for IntervalTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "Date", "lower 95", "lower 80", "forecast", "upper 80", "upper 95"
        )?;
        let n = self.forecast.horizons();
        if self.rows == 0 || n <= 2 * self.rows {
            for i in 0..n {
                self.write_step(f, i)?;
            }
        } else {
            for i in 0..self.rows {
                self.write_step(f, i)?;
            }
            writeln!(f, "{:<12}", "...")?;
            for i in n - self.rows..n {
                self.write_step(f, i)?;
            }
        }
        Ok(())
    }
}

/// All tables of a run, separated by headings
pub fn text_report(report: &AnalysisReport, rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Matched observations: {} ({} training, {} held out)\n\n",
        report.series.len(),
        report.train_len,
        report.test_len
    ));
    out.push_str("== Diagnostics ==\n");
    out.push_str(&DiagnosticsTable(&report.diagnostics).to_string());
    out.push_str("\n== Information criteria (training split) ==\n");
    out.push_str(&CriteriaTable(&report.candidates).to_string());
    out.push_str("\n== Held-out forecast error ==\n");
    out.push_str(&ErrorTable(&report.selection).to_string());
    out.push_str(&format!(
        "\n== {} forecast, {} steps ==\n",
        report.final_model.name,
        report.forecast.horizons()
    ));
    out.push_str(
        &IntervalTable {
            forecast: &report.forecast,
            rows,
        }
        .to_string(),
    );
    out
}

fn plot_error<E: fmt::Display>(error: E) -> ForecastError {
    ForecastError::Plot(error.to_string())
}

/// Range covering `values` with 5% headroom; never empty
fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (low, high) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !low.is_finite() || !high.is_finite() {
        return 0.0..1.0;
    }
    let pad = if high > low { (high - low) * 0.05 } else { 1.0 };
    (low - pad)..(high + pad)
}

/// Prices above temperatures, both against observation index
pub fn series_chart(series: &MatchedSeries) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        let panels = root.split_evenly((2, 1));

        let n = series.len() as f64;
        for (panel, (title, values, color)) in panels.iter().zip([
            ("Price", series.prices(), BLUE),
            ("Average temperature", series.temperatures(), RED),
        ]) {
            let mut chart = ChartBuilder::on(panel)
                .caption(title, ("sans-serif", 24))
                .margin(15)
                .x_label_area_size(35)
                .y_label_area_size(60)
                .build_cartesian_2d(0f64..n, padded_range(values.iter().copied()))
                .map_err(plot_error)?;
            chart
                .configure_mesh()
                .x_desc("Observation")
                .draw()
                .map_err(plot_error)?;
            chart
                .draw_series(LineSeries::new(
                    values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                    &color,
                ))
                .map_err(plot_error)?;
        }
        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

/// ACF and PACF bars side by side with the white-noise band
pub fn correlation_chart(title: &str, profile: &CorrelationProfile) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        let panels = root.split_evenly((1, 2));

        for (panel, (name, values)) in panels
            .iter()
            .zip([("ACF", &profile.acf), ("PACF", &profile.pacf)])
        {
            let lags = values.len() as f64;
            let mut chart = ChartBuilder::on(panel)
                .caption(format!("{} {}", title, name), ("sans-serif", 22))
                .margin(15)
                .x_label_area_size(35)
                .y_label_area_size(50)
                .build_cartesian_2d(-0.5f64..lags, -1.05f64..1.05f64)
                .map_err(plot_error)?;
            chart
                .configure_mesh()
                .x_desc("Lag")
                .draw()
                .map_err(plot_error)?;
            chart
                .draw_series(values.iter().enumerate().skip(1).map(|(lag, v)| {
                    let x = lag as f64;
                    Rectangle::new([(x - 0.3, 0.0), (x + 0.3, *v)], BLUE.filled())
                }))
                .map_err(plot_error)?;
            for bound in [profile.band, -profile.band] {
                chart
                    .draw_series(LineSeries::new(
                        vec![(0.0, bound), (lags, bound)],
                        RED.stroke_width(1),
                    ))
                    .map_err(plot_error)?;
            }
        }
        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

/// History tail, forecast path and shaded 80%/95% bands; `actual` overlays
/// realised values on the forecast steps
pub fn forecast_chart(
    title: &str,
    history: &[f64],
    forecast: &ForecastResult,
    actual: Option<&[f64]>,
) -> Result<String> {
    let tail = &history[history.len().saturating_sub(HISTORY_TAIL)..];
    let start = tail.len() as f64;
    let step = |i: usize| start + i as f64;
    let (lo80, hi80) = forecast.interval(IntervalLevel::Eighty);
    let (lo95, hi95) = forecast.interval(IntervalLevel::NinetyFive);

    let y_range = padded_range(
        tail.iter()
            .chain(lo95.iter())
            .chain(hi95.iter())
            .chain(actual.unwrap_or(&[]).iter())
            .copied(),
    );
    let x_end = start + forecast.horizons() as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 26))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..x_end, y_range)
            .map_err(plot_error)?;
        chart
            .configure_mesh()
            .x_desc("Step")
            .y_desc("Price")
            .draw()
            .map_err(plot_error)?;

        for ((lower, upper), shade) in [((lo95, hi95), 0.15), ((lo80, hi80), 0.3)] {
            let outline: Vec<(f64, f64)> = upper
                .iter()
                .enumerate()
                .map(|(i, v)| (step(i), *v))
                .chain(lower.iter().enumerate().rev().map(|(i, v)| (step(i), *v)))
                .collect();
            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline,
                    BLUE.mix(shade).filled(),
                )))
                .map_err(plot_error)?;
        }

        chart
            .draw_series(LineSeries::new(
                tail.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                &BLACK,
            ))
            .map_err(plot_error)?
            .label("history")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
        chart
            .draw_series(LineSeries::new(
                forecast.values().iter().enumerate().map(|(i, v)| (step(i), *v)),
                BLUE.stroke_width(2),
            ))
            .map_err(plot_error)?
            .label("forecast")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
        if let Some(actual) = actual {
            chart
                .draw_series(LineSeries::new(
                    actual.iter().enumerate().map(|(i, v)| (step(i), *v)),
                    &RED,
                ))
                .map_err(plot_error)?
                .label("actual")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_error)?;
        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

/// Write the charts and a JSON dump of the report into `dir`
pub fn render(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut write = |name: &str, contents: String| -> Result<()> {
        let path = dir.join(name);
        fs::write(&path, contents)?;
        written.push(path);
        Ok(())
    };

    write("series.svg", series_chart(&report.series)?)?;
    write(
        "price_correlations.svg",
        correlation_chart("Price", &report.diagnostics.price.correlations)?,
    )?;
    write(
        "price_change_correlations.svg",
        correlation_chart("Price change", &report.diagnostics.price_changes.correlations)?,
    )?;

    let prices = report.series.prices();
    if let Some(score) = report.selection.chosen_score() {
        let train = &prices[..report.train_len];
        let test = &prices[report.train_len..];
        write(
            "holdout.svg",
            forecast_chart(
                &format!("{} on held-out data", score.name),
                train,
                &score.forecast,
                Some(test),
            )?,
        )?;
    }
    write(
        "forecast.svg",
        forecast_chart(
            &format!("{} forecast", report.final_model.name),
            &prices,
            &report.forecast,
            None,
        )?,
    )?;
    write("report.json", report.to_json()?)?;

    info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
