//! ABC demo: infer the mean of a Gaussian from the mean of 20 noisy observations.
//!
//! Usage: `abc_demo [config.toml]`. Without a config file four chains of 5000 rows are run.

use abc_mcmc::config::SamplerConfig;
use abc_mcmc::distributions::{Normal, Uniform};
use abc_mcmc::error::CollaboratorError;
use abc_mcmc::gate::DistanceGate;
use abc_mcmc::metropolis::AbcMetropolis;
use abc_mcmc::model::{Model, Summarizer};
use abc_mcmc::parameters::{ParameterMap, ParameterNames};
use abc_mcmc::prior::PriorSet;
use abc_mcmc::proposal::ProposalSet;
use abc_mcmc::sampler::AbcSampler;
use abc_mcmc::scaler::IdentityScaler;
use ndarray::{array, Array1, Axis};
use rand::RngCore;
use rand_distr::Distribution;
use std::error::Error;

const N_OBS: usize = 20;

/// `N_OBS` draws from N(mu, 1).
struct GaussianMean {
    prior: PriorSet,
    noise: rand_distr::Normal<f64>,
}

impl Model for GaussianMean {
    type Data = Vec<f64>;

    fn simulate(
        &self,
        params: &ParameterMap,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>, CollaboratorError> {
        let mu = params.get("mu").copied().ok_or("missing parameter `mu`")?;
        Ok((0..N_OBS).map(|_| mu + self.noise.sample(&mut *rng)).collect())
    }

    fn prior(&self) -> &PriorSet {
        &self.prior
    }
}

struct SampleMean;

impl Summarizer<Vec<f64>> for SampleMean {
    fn summarize(&self, data: &Vec<f64>) -> Result<Array1<f64>, CollaboratorError> {
        if data.is_empty() {
            return Err("no data to summarize".into());
        }
        Ok(array![data.iter().sum::<f64>() / data.len() as f64])
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => SamplerConfig::from_path(path)?,
        None => {
            let mut config = SamplerConfig::new(5_000, 0.2);
            config.burn = 500;
            config.n_chains = 4;
            config.seed = Some(42);
            config.progress = true;
            config
        }
    };

    let names = ParameterNames::new(["mu"])?;
    let model = GaussianMean {
        prior: PriorSet::default().with("mu", Uniform::new(0.0, 10.0)?),
        noise: rand_distr::Normal::new(0.0, 1.0)?,
    };
    let gate = DistanceGate::new(
        names.clone(),
        model,
        SampleMean,
        IdentityScaler,
        array![5.0].view(),
        config.threshold,
    )?;
    let proposals = ProposalSet::uniform_for(&names, Normal::new(0.0, 0.5)?);
    let kernel = AbcMetropolis::new(gate, proposals)?;
    let sampler = AbcSampler::new(kernel, config)?;

    let out = sampler.run(array![5.0].view())?;
    let pooled = out.pooled();
    let mean = pooled.mean_axis(Axis(0)).ok_or("no samples")?;
    let std = pooled.std_axis(Axis(0), 1.0);

    println!("Collected {} samples from {} chains", pooled.nrows(), out.accepted.len());
    println!("Acceptance rates: {:?}", out.acceptance_rates());
    println!("Posterior mean of mu: {:.3} (sd {:.3})", mean[0], std[0]);
    if out.accepted.len() > 1 {
        println!("R-hat: {:.4}", out.rhat()?[0]);
    }
    Ok(())
}
