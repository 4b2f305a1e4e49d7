//! Differencing transforms and their inverses

use crate::{MathError, Result};

/// Difference a series `order` times.
///
/// Order 0 returns the series unchanged. Each pass shortens the output by
/// one observation.
pub fn difference(data: &[f64], order: usize) -> Result<Vec<f64>> {
    if data.len() <= order {
        return Err(MathError::InsufficientData(format!(
            "Differencing of order {} needs more than {} observations, got {}",
            order,
            order,
            data.len()
        )));
    }

    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }

    Ok(result)
}

/// Rebuild a series from its first differences and its first value.
///
/// `integrate(&difference(x, 1)?, x[0])` reproduces `x`.
pub fn integrate(diffs: &[f64], first: f64) -> Vec<f64> {
    let mut result = Vec::with_capacity(diffs.len() + 1);
    let mut level = first;
    result.push(level);
    for d in diffs {
        level += d;
        result.push(level);
    }
    result
}

/// Map forecasts of the `order`-th difference back to levels.
///
/// `history` is the level series the forecasts continue from.
pub fn undifference(forecasts: &[f64], history: &[f64], order: usize) -> Result<Vec<f64>> {
    if order == 0 {
        return Ok(forecasts.to_vec());
    }
    if history.len() < order {
        return Err(MathError::InsufficientData(format!(
            "Undifferencing of order {} needs {} historical values, got {}",
            order,
            order,
            history.len()
        )));
    }

    // last observed value of each intermediate difference level
    let mut seeds = Vec::with_capacity(order);
    let mut level = history.to_vec();
    for _ in 0..order {
        seeds.push(*level.last().unwrap_or(&0.0));
        level = level.windows(2).map(|w| w[1] - w[0]).collect();
    }

    let mut result = forecasts.to_vec();
    for seed in seeds.into_iter().rev() {
        let mut acc = seed;
        for value in result.iter_mut() {
            acc += *value;
            *value = acc;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_difference_orders() {
        let data = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&data, 1).unwrap(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(difference(&data, 2).unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(difference(&data, 0).unwrap(), data);
        assert!(difference(&[1.0], 1).is_err());
    }

    #[test]
    fn test_integrate_inverts_difference() {
        let data = vec![10.5, 9.25, 12.0, 12.0, 7.125, 30.0];
        let rebuilt = integrate(&difference(&data, 1).unwrap(), data[0]);
        assert_eq!(rebuilt.len(), data.len());
        for (a, b) in rebuilt.iter().zip(data.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_undifference_continues_levels() {
        // y = t^2, second differences are all 2
        let history: Vec<f64> = (0..6).map(|t| (t * t) as f64).collect();
        let levels = undifference(&[2.0, 2.0, 2.0], &history, 2).unwrap();
        assert_eq!(levels, vec![36.0, 49.0, 64.0]);

        let levels = undifference(&[1.0, -2.0], &[5.0, 7.0], 1).unwrap();
        assert_eq!(levels, vec![8.0, 6.0]);
    }
}
