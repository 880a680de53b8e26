/*!
# Multi-chain ABC sampler

[`AbcSampler`] runs several independent chains of the same [`AbcMetropolis`] kernel in
parallel. Chains share the kernel read-only; each owns its chain buffer and its own
[`SmallRng`], seeded with `seed + chain_index`, so a run is reproducible from its seed.

## Example Usage

```rust
use abc_mcmc::config::SamplerConfig;
use abc_mcmc::distributions::{Normal, Uniform};
use abc_mcmc::error::CollaboratorError;
use abc_mcmc::gate::DistanceGate;
use abc_mcmc::metropolis::AbcMetropolis;
use abc_mcmc::model::{IdentitySummary, Model};
use abc_mcmc::parameters::{ParameterMap, ParameterNames};
use abc_mcmc::prior::PriorSet;
use abc_mcmc::proposal::ProposalSet;
use abc_mcmc::sampler::AbcSampler;
use abc_mcmc::scaler::IdentityScaler;
use ndarray::{array, Array1};
use rand::RngCore;

/// Observes its own parameter.
struct Echo(PriorSet);

impl Model for Echo {
    type Data = Array1<f64>;

    fn simulate(
        &self,
        params: &ParameterMap,
        _rng: &mut dyn RngCore,
    ) -> Result<Array1<f64>, CollaboratorError> {
        Ok(params.values().copied().collect())
    }

    fn prior(&self) -> &PriorSet {
        &self.0
    }
}

let names = ParameterNames::new(["theta"]).unwrap();
let model = Echo(PriorSet::default().with("theta", Uniform::new(0.0, 10.0).unwrap()));
let gate = DistanceGate::new(
    names.clone(),
    model,
    IdentitySummary,
    IdentityScaler,
    array![5.0].view(),
    0.5,
)
.unwrap();
let proposals = ProposalSet::uniform_for(&names, Normal::new(0.0, 0.2).unwrap());
let kernel = AbcMetropolis::new(gate, proposals).unwrap();

let mut config = SamplerConfig::new(200, 0.5);
config.n_chains = 2;
config.seed = Some(42);
let sampler = AbcSampler::new(kernel, config).unwrap();
let out = sampler.run(array![5.0].view()).unwrap();
assert_eq!(out.samples.dim(), (2, 200, 1));
```
*/

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::chain::{run_chain_with, CancellationToken, ChainOutput, RunHooks};
use crate::config::SamplerConfig;
use crate::distance::Distance;
use crate::error::{AbcError, Result};
use crate::metropolis::AbcMetropolis;
use crate::model::{Model, Summarizer};
use crate::scaler::Scaler;
use crate::stats;

pub struct AbcSampler<M, S, C, D> {
    kernel: AbcMetropolis<M, S, C, D>,
    config: SamplerConfig,
    seed: u64,
    cancel: CancellationToken,
}

/// Samples of all chains of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiChainOutput {
    /// chain x sample x parameter
    pub samples: Array3<f64>,
    /// Accepted candidates per chain.
    pub accepted: Vec<usize>,
    /// Kernel steps per chain.
    pub steps: usize,
}

impl MultiChainOutput {
    pub fn acceptance_rates(&self) -> Vec<f64> {
        self.accepted
            .iter()
            .map(|&a| stats::acceptance_rate(a, self.steps))
            .collect()
    }

    /// R-hat per parameter; needs at least two chains.
    pub fn rhat(&self) -> Result<Array1<f64>> {
        stats::rhat(self.samples.view())
    }

    /// All chains stacked into one sample x parameter matrix, chain 0 first.
    pub fn pooled(&self) -> Array2<f64> {
        let (n_chains, n_samples, dim) = self.samples.dim();
        Array2::from_shape_fn((n_chains * n_samples, dim), |(row, j)| {
            self.samples[[row / n_samples, row % n_samples, j]]
        })
    }
}

impl<M, S, C, D> AbcSampler<M, S, C, D>
where
    M: Model,
    S: Summarizer<M::Data>,
    C: Scaler,
    D: Distance,
{
    /// Applies the threshold and degenerate-ratio policy of `config` to `kernel`.
    pub fn new(kernel: AbcMetropolis<M, S, C, D>, config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        let kernel = kernel
            .set_threshold(config.threshold)?
            .with_policy(config.degenerate_ratio);
        let seed = config.seed.unwrap_or_else(|| thread_rng().gen::<u64>());
        Ok(Self {
            kernel,
            config,
            seed,
            cancel: CancellationToken::new(),
        })
    }

    /// Overrides the base seed. Chain `i` is seeded with `seed + i`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn kernel(&self) -> &AbcMetropolis<M, S, C, D> {
        &self.kernel
    }

    /// Token that stops every chain of a running [`AbcSampler::run`] between steps.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs all chains from `start`, with progress bars if the configuration asks for them.
    pub fn run(&self, start: ArrayView1<f64>) -> Result<MultiChainOutput> {
        if self.config.progress {
            self.run_progress(start)
        } else {
            self.run_chains(start, |_| None)
        }
    }

    /// Runs all chains from `start`, showing one progress bar per chain.
    pub fn run_progress(&self, start: ArrayView1<f64>) -> Result<MultiChainOutput> {
        let multi = MultiProgress::new();
        let pb_style = ProgressStyle::default_bar()
            .template("{prefix:8} {bar:40.cyan/blue} {pos}/{len} ({eta}) | {msg}")
            .map_err(|e| AbcError::InvalidConfig(format!("progress template: {e}")))?
            .progress_chars("=>-");
        let total = self.config.chain_config().total_steps() as u64;

        let out = self.run_chains(start, |i| {
            let pb = multi.add(ProgressBar::new(total));
            pb.set_prefix(format!("Chain {i}"));
            pb.set_style(pb_style.clone());
            Some(pb)
        })?;
        for rate in out.acceptance_rates() {
            log::info!("acceptance rate {rate:.3}");
        }
        Ok(out)
    }

    fn run_chains<F>(&self, start: ArrayView1<f64>, progress_for: F) -> Result<MultiChainOutput>
    where
        F: Fn(usize) -> Option<ProgressBar> + Sync,
    {
        let chain_config = self.config.chain_config();
        log::debug!(
            "running {} chains with base seed {}",
            self.config.n_chains,
            self.seed
        );

        let outputs: Vec<ChainOutput> = (0..self.config.n_chains)
            .into_par_iter()
            .map(|i| {
                let mut rng = SmallRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let hooks = RunHooks {
                    cancel: Some(self.cancel.clone()),
                    progress: progress_for(i),
                };
                let out = run_chain_with(&self.kernel, start, &chain_config, &mut rng, &hooks);
                if let Some(pb) = &hooks.progress {
                    match &out {
                        Ok(o) => pb.finish_with_message(format!(
                            "p(accept)≈{:.2}",
                            o.acceptance_rate()
                        )),
                        Err(_) => pb.abandon_with_message("failed"),
                    }
                }
                out
            })
            .collect::<Result<_>>()?;

        let n_rows = chain_config.chain_length - chain_config.burn;
        let dim = start.len();
        let mut samples = Array3::<f64>::zeros((outputs.len(), n_rows, dim));
        for (mut slot, out) in samples.axis_iter_mut(Axis(0)).zip(&outputs) {
            slot.assign(&out.samples);
        }
        Ok(MultiChainOutput {
            samples,
            accepted: outputs.iter().map(|o| o.accepted).collect(),
            steps: chain_config.total_steps(),
        })
    }
}

impl<M, S, C, D> std::fmt::Debug for AbcSampler<M, S, C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbcSampler")
            .field("kernel", &self.kernel)
            .field("config", &self.config)
            .field("seed", &self.seed)
            .finish()
    }
}
