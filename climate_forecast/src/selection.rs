//! Two-stage model selection
//!
//! Information criteria only rank variants inside one family. The choice
//! between families is made on held-out forecast error alone, since the
//! likelihoods of a differenced and an undifferenced model live on
//! different scales.

use crate::align::MatchedSeries;
use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_forecast, ForecastMetrics};
use crate::models::{
    FittedModel, ForecastResult, ModelFamily, ModelVariant, TrainedForecastModel,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Criteria differences below this count as ties
const TIE_TOLERANCE: f64 = 1e-9;

/// Stage-one winner of one family
#[derive(Debug, Clone)]
pub struct FamilyFinalist {
    pub family: ModelFamily,
    pub model: FittedModel,
    /// The AIC winner is also the BIC winner
    pub criteria_agree: bool,
}

impl FamilyFinalist {
    pub fn variant(&self) -> ModelVariant {
        self.model.variant()
    }
}

/// Order by AIC, then BIC, then plain before exogenous
fn compare_within_family(a: &FittedModel, b: &FittedModel) -> Ordering {
    let (sa, sb) = (a.summary(), b.summary());
    by_criterion(sa.aic, sb.aic)
        .then_with(|| by_criterion(sa.bic, sb.bic))
        .then_with(|| {
            a.variant()
                .uses_temperature()
                .cmp(&b.variant().uses_temperature())
        })
}

fn by_criterion(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < TIE_TOLERANCE {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// Stage one: keep the best variant of each family.
///
/// Fails unless every family has at least one candidate.
pub fn select_finalists(candidates: &[FittedModel]) -> Result<Vec<FamilyFinalist>> {
    [ModelFamily::Arima, ModelFamily::Garch]
        .iter()
        .map(|family| -> Result<FamilyFinalist> {
            let members: Vec<&FittedModel> = candidates
                .iter()
                .filter(|m| m.variant().family() == *family)
                .collect();

            let best = members
                .iter()
                .copied()
                .min_by(|a, b| compare_within_family(a, b))
                .ok_or_else(|| {
                    ForecastError::ValidationError(format!("No fitted {} candidate", family))
                })?;
            let best_by_bic = members
                .iter()
                .copied()
                .min_by(|a, b| by_criterion(a.summary().bic, b.summary().bic))
                .map(|m| m.variant());
            let criteria_agree = best_by_bic == Some(best.variant());

            if !criteria_agree {
                warn!(
                    "{} family: AIC prefers {}, BIC disagrees; keeping the AIC choice",
                    family,
                    best.variant()
                );
            }
            info!("{} finalist: {}", family, best.name());

            Ok(FamilyFinalist {
                family: *family,
                model: best.clone(),
                criteria_agree,
            })
        })
        .collect()
}

/// Held-out performance of one finalist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalistScore {
    pub family: ModelFamily,
    pub variant: ModelVariant,
    pub name: String,
    pub aic: f64,
    pub bic: f64,
    pub metrics: ForecastMetrics,
    /// Forecast over the held-out dates
    pub forecast: ForecastResult,
}

impl FinalistScore {
    pub fn rmse(&self) -> f64 {
        self.metrics.accuracy.rmse
    }
}

/// Outcome of stage two
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub finalists: Vec<FinalistScore>,
    pub chosen: ModelVariant,
}

impl Selection {
    pub fn chosen_score(&self) -> Option<&FinalistScore> {
        self.finalists.iter().find(|f| f.variant == self.chosen)
    }
}

/// Stage two: forecast the held-out suffix with each finalist and keep the
/// one with the lowest RMSE. An exact tie goes to the ARIMA family.
///
/// Exogenous finalists are fed the realised held-out temperatures.
pub fn select_final(finalists: &[FamilyFinalist], test: &MatchedSeries) -> Result<Selection> {
    if test.is_empty() {
        return Err(ForecastError::ValidationError(
            "Held-out sample is empty".to_string(),
        ));
    }
    let actual = test.prices();
    let temperatures = test.temperatures();
    let dates = test.dates();

    let finalists = finalists
        .iter()
        .map(|finalist| -> Result<FinalistScore> {
            let summary = finalist.model.summary();
            let forecast = finalist
                .model
                .forecast(test.len(), Some(&temperatures))?
                .with_dates(dates.clone())?;
            let metrics = evaluate_forecast(&forecast, &actual)?;
            info!(
                "{}: held-out RMSE {:.4}",
                summary.name, metrics.accuracy.rmse
            );

            Ok(FinalistScore {
                family: finalist.family,
                variant: summary.variant,
                name: summary.name.clone(),
                aic: summary.aic,
                bic: summary.bic,
                metrics,
                forecast,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let best = finalists
        .iter()
        .min_by(|a, b| {
            a.rmse()
                .partial_cmp(&b.rmse())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.family.cmp(&b.family))
        })
        .ok_or_else(|| ForecastError::ValidationError("No finalists to compare".to_string()))?;
    let chosen = best.variant;

    info!("Selected {} (RMSE {:.4})", best.name, best.rmse());

    Ok(Selection { finalists, chosen })
}
