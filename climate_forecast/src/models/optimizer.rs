//! Nelder-Mead minimisation of negative log-likelihoods

use crate::config::OptimizerConfig;
use crate::error::{ForecastError, Result};
use argmin::core::{
    CostFunction, Error as ArgminError, Executor, State, TerminationReason, TerminationStatus,
};
use argmin::solver::neldermead::NelderMead;
use log::debug;

/// Returned in place of NaN or infinite costs so the simplex can be ordered
pub(crate) const LARGE_COST: f64 = 1e30;

/// Adapts a plain closure to argmin's cost function interface
struct Objective<F> {
    cost: F,
}

impl<F> CostFunction for Objective<F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        let value = (self.cost)(param);
        Ok(if value.is_finite() { value } else { LARGE_COST })
    }
}

/// Located minimum
#[derive(Debug, Clone)]
pub(crate) struct Minimum {
    pub params: Vec<f64>,
    pub value: f64,
    pub iterations: u64,
}

/// Minimise `cost` from `start`.
///
/// Anything other than the simplex collapsing below the tolerance is
/// reported as `NonConvergence`; there is no restart.
pub(crate) fn minimize<F>(
    model: &str,
    cost: F,
    start: &[f64],
    config: &OptimizerConfig,
) -> Result<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let failed = |reason: String| ForecastError::NonConvergence {
        model: model.to_string(),
        reason,
    };

    if start.is_empty() {
        return Err(failed("no free parameters".to_string()));
    }

    let solver = NelderMead::new(initial_simplex(start))
        .with_sd_tolerance(config.sd_tolerance)
        .map_err(|e| failed(e.to_string()))?;

    let result = Executor::new(Objective { cost }, solver)
        .configure(|state| state.max_iters(config.max_iters))
        .run()
        .map_err(|e| failed(e.to_string()))?;

    let state = result.state();
    let iterations = state.get_iter();
    match state.get_termination_status() {
        TerminationStatus::Terminated(TerminationReason::SolverConverged) => {}
        status => {
            return Err(failed(format!(
                "stopped after {} iterations ({:?})",
                iterations, status
            )))
        }
    }

    let params = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| failed("optimizer returned no parameters".to_string()))?;
    let value = state.get_best_cost();
    if !value.is_finite() || value >= LARGE_COST {
        return Err(failed("likelihood is not finite at the optimum".to_string()));
    }

    debug!(
        "{}: converged in {} iterations, cost {:.6}",
        model, iterations, value
    );

    Ok(Minimum {
        params,
        value,
        iterations,
    })
}

/// Start point plus one vertex per coordinate, stepped by 10% (or 0.05 near zero)
fn initial_simplex(start: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(start.len() + 1);
    simplex.push(start.to_vec());
    for i in 0..start.len() {
        let mut vertex = start.to_vec();
        let step = if vertex[i].abs() > 1e-3 {
            0.1 * vertex[i].abs()
        } else {
            0.05
        };
        vertex[i] += step;
        simplex.push(vertex);
    }
    simplex
}
