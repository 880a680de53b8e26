//! Chain diagnostics: acceptance rates and the Gelman-Rubin potential scale reduction.

use ndarray::prelude::*;
use ndarray_stats::QuantileExt;

use crate::error::{AbcError, Result};

/// Fraction of accepted candidates, zero when no step ran.
pub fn acceptance_rate(accepted: usize, steps: usize) -> f64 {
    if steps == 0 {
        0.0
    } else {
        accepted as f64 / steps as f64
    }
}

/// Potential scale reduction factor per parameter.
///
/// `samples` is laid out chain x sample x parameter. Needs at least two chains with at
/// least two samples each. Parameters that are constant within every chain give `NaN`.
///
/// ```rust
/// use abc_mcmc::stats::rhat;
/// use ndarray::array;
///
/// let samples = array![[[0.0], [1.0]], [[0.0], [1.0]]];
/// let r = rhat(samples.view()).unwrap();
/// assert!((r[0] - (0.5f64).sqrt()).abs() < 1e-12);
/// ```
pub fn rhat(samples: ArrayView3<f64>) -> Result<Array1<f64>> {
    let (n_chains, n, _) = samples.dim();
    if n_chains < 2 || n < 2 {
        return Err(AbcError::InvalidConfig(format!(
            "R-hat needs at least 2 chains of 2 samples, got {n_chains} chains of {n}"
        )));
    }
    let n_f = n as f64;

    // chain x parameter
    let chain_means = samples
        .mean_axis(Axis(1))
        .ok_or_else(|| AbcError::InvalidConfig("empty chains".into()))?;
    let chain_vars = samples.var_axis(Axis(1), 1.0);

    let grand_mean = chain_means
        .mean_axis(Axis(0))
        .ok_or_else(|| AbcError::InvalidConfig("no chains".into()))?;
    let between = (&chain_means - &grand_mean.insert_axis(Axis(0)))
        .pow2()
        .sum_axis(Axis(0))
        * (n_f / (n_chains as f64 - 1.0));
    let within = chain_vars
        .mean_axis(Axis(0))
        .ok_or_else(|| AbcError::InvalidConfig("no chains".into()))?;

    let var = &within * ((n_f - 1.0) / n_f) + between / n_f;
    Ok((var / within).sqrt())
}

/// Largest R-hat over all parameters.
pub fn max_rhat(samples: ArrayView3<f64>) -> Result<f64> {
    let all = rhat(samples)?;
    let max = all
        .max()
        .map_err(|e| AbcError::InvalidConfig(format!("cannot reduce R-hat: {e}")))?;
    Ok(*max)
}
