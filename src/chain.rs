/*!
# Chain runner

Builds one fixed-length chain by repeatedly applying a [`MetropolisKernel`], then drops the
burn-in prefix.

The chain buffer has `chain_length` rows and is owned by a single [`run_chain`] call. Row 0
holds the starting vector. What ends up in rows `1..chain_length` depends on the
[`ThinningMode`]:

- [`ThinningMode::SkipWrite`]: step `i` (for `i` in `0..chain_length - 1`) writes row `i + 1`
  only when `i % take == 0`. Every other row keeps the buffer default `0.0`. With `take = 1`
  every row is written; with `take = k` the written rows are `1, k + 1, 2k + 1, ...`.
- [`ThinningMode::StepBetweenRecords`]: row `i + 1` holds the state reached after `take`
  further steps, so every row is a genuine sample and `take` steps separate neighbours.

# Examples

```rust
use abc_mcmc::chain::{run_chain, ChainConfig};
use abc_mcmc::error::Result;
use abc_mcmc::metropolis::{MetropolisKernel, StepOutcome};
use ndarray::{array, ArrayView1};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Always moves one unit to the right.
struct Drift;

impl MetropolisKernel for Drift {
    fn dim(&self) -> usize {
        1
    }

    fn step(&self, current: ArrayView1<f64>, _rng: &mut dyn RngCore) -> Result<StepOutcome> {
        Ok(StepOutcome {
            state: &current + 1.0,
            accepted: true,
            feasible: true,
            alpha: 1.0,
        })
    }
}

let mut rng = SmallRng::seed_from_u64(0);
let out = run_chain(&Drift, array![0.0].view(), &ChainConfig::new(4), &mut rng).unwrap();
assert_eq!(out.samples.column(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
assert_eq!(out.accepted, 3);
```
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use ndarray::{s, Array1, Array2, ArrayView1};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{AbcError, Result};
use crate::metropolis::MetropolisKernel;

/// How thinning by `take` is applied to the chain buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinningMode {
    /// One step per row; only rows whose step index is a multiple of `take` are written.
    #[default]
    SkipWrite,
    /// `take` steps per row; every row is written.
    StepBetweenRecords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    /// Number of rows in the chain buffer, including the starting vector.
    pub chain_length: usize,
    /// Rows dropped from the front once the chain is complete.
    pub burn: usize,
    /// Thinning interval.
    pub take: usize,
    pub thinning: ThinningMode,
}

impl ChainConfig {
    pub fn new(chain_length: usize) -> Self {
        Self {
            chain_length,
            burn: 0,
            take: 1,
            thinning: ThinningMode::SkipWrite,
        }
    }

    pub fn burn(mut self, burn: usize) -> Self {
        self.burn = burn;
        self
    }

    pub fn take(mut self, take: usize) -> Self {
        self.take = take;
        self
    }

    pub fn thinning(mut self, thinning: ThinningMode) -> Self {
        self.thinning = thinning;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_length == 0 {
            return Err(AbcError::InvalidConfig("chain_length must be at least 1".into()));
        }
        if self.take == 0 {
            return Err(AbcError::InvalidConfig("take must be at least 1".into()));
        }
        if self.burn >= self.chain_length {
            return Err(AbcError::InvalidConfig(format!(
                "burn ({}) must be smaller than chain_length ({})",
                self.burn, self.chain_length
            )));
        }
        Ok(())
    }

    /// Number of kernel steps a full run performs.
    pub fn total_steps(&self) -> usize {
        let records = self.chain_length.saturating_sub(1);
        match self.thinning {
            ThinningMode::SkipWrite => records,
            ThinningMode::StepBetweenRecords => records * self.take,
        }
    }
}

/// Cooperative cancellation flag, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Optional hooks observed between steps.
#[derive(Debug, Clone, Default)]
pub struct RunHooks {
    pub cancel: Option<CancellationToken>,
    pub progress: Option<ProgressBar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutput {
    /// Retained rows, `chain_length - burn` by number of parameters.
    pub samples: Array2<f64>,
    /// Number of accepted candidates.
    pub accepted: usize,
    /// Number of kernel steps performed.
    pub steps: usize,
}

impl ChainOutput {
    pub fn acceptance_rate(&self) -> f64 {
        crate::stats::acceptance_rate(self.accepted, self.steps)
    }
}

/// Runs one chain from `start` without hooks.
pub fn run_chain<K>(
    kernel: &K,
    start: ArrayView1<f64>,
    config: &ChainConfig,
    rng: &mut dyn RngCore,
) -> Result<ChainOutput>
where
    K: MetropolisKernel + ?Sized,
{
    run_chain_with(kernel, start, config, rng, &RunHooks::default())
}

/// Runs one chain from `start`, checking `hooks.cancel` before every step and advancing
/// `hooks.progress` after it.
pub fn run_chain_with<K>(
    kernel: &K,
    start: ArrayView1<f64>,
    config: &ChainConfig,
    rng: &mut dyn RngCore,
    hooks: &RunHooks,
) -> Result<ChainOutput>
where
    K: MetropolisKernel + ?Sized,
{
    config.validate()?;
    if start.len() != kernel.dim() {
        return Err(AbcError::DimensionMismatch {
            expected: kernel.dim(),
            found: start.len(),
        });
    }

    let total = config.total_steps();
    if let Some(pb) = &hooks.progress {
        pb.set_length(total as u64);
    }
    log::debug!(
        "running chain: length {}, burn {}, take {} ({:?}), {} steps",
        config.chain_length,
        config.burn,
        config.take,
        config.thinning,
        total
    );

    let mut samples = Array2::<f64>::zeros((config.chain_length, start.len()));
    samples.row_mut(0).assign(&start);

    let mut state: Array1<f64> = start.to_owned();
    let mut accepted = 0usize;
    let mut steps = 0usize;

    let mut advance = |state: &mut Array1<f64>| -> Result<()> {
        if hooks.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            log::warn!("chain cancelled after {steps} of {total} steps");
            return Err(AbcError::Cancelled {
                completed: steps,
                total,
            });
        }
        let outcome = kernel.step(state.view(), &mut *rng)?;
        accepted += outcome.accepted as usize;
        steps += 1;
        *state = outcome.state;
        if let Some(pb) = &hooks.progress {
            pb.inc(1);
        }
        Ok(())
    };

    for i in 0..config.chain_length - 1 {
        match config.thinning {
            ThinningMode::SkipWrite => {
                advance(&mut state)?;
                if i % config.take == 0 {
                    samples.row_mut(i + 1).assign(&state);
                }
            }
            ThinningMode::StepBetweenRecords => {
                for _ in 0..config.take {
                    advance(&mut state)?;
                }
                samples.row_mut(i + 1).assign(&state);
            }
        }
    }

    let samples = samples.slice(s![config.burn.., ..]).to_owned();
    log::debug!(
        "chain finished: {accepted} of {steps} candidates accepted ({:.3})",
        crate::stats::acceptance_rate(accepted, steps)
    );

    Ok(ChainOutput {
        samples,
        accepted,
        steps,
    })
}
