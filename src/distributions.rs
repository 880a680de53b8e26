/*!
Univariate distributions consumed by the sampler, together with the traits the sampler
uses to talk to them.

- [`PriorDistribution`]: evaluates a log-density at a single parameter value.
- [`ProposalDistribution`]: draws a random increment from a caller-supplied random source.

[`Uniform`] and [`Normal`] implement both traits, so the same type can serve as a prior
and as a proposal.

# Examples

```rust
use abc_mcmc::distributions::{Normal, PriorDistribution, ProposalDistribution, Uniform};
use rand::rngs::SmallRng;
use rand::SeedableRng;

let prior = Uniform::new(0.0, 10.0).unwrap();
assert_eq!(prior.log_density(5.0), -(10.0f64).ln());
assert_eq!(prior.log_density(11.0), f64::NEG_INFINITY);

let proposal = Normal::new(0.0, 0.5).unwrap();
let mut rng = SmallRng::seed_from_u64(42);
let increment = proposal.sample(&mut rng);
assert!(increment.is_finite());
```
*/

use rand::RngCore;
use rand_distr::Distribution;
use std::f64::consts::PI;

use crate::error::{AbcError, Result};

/// A univariate prior factor. The total prior is a sum of these in log-space.
pub trait PriorDistribution: Send + Sync {
    /// Log of the (normalized) density at `x`. Outside the support this is `-inf`.
    fn log_density(&self, x: f64) -> f64;
}

/// A univariate proposal producing additive increments.
pub trait ProposalDistribution: Send + Sync {
    /// Draws one sample using `rng` as the only source of randomness.
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
}

/// Continuous uniform distribution on `[low, high]`.
#[derive(Debug, Clone)]
pub struct Uniform {
    pub low: f64,
    pub high: f64,
    sampler: rand_distr::Uniform<f64>,
}

impl Uniform {
    /// Fails unless both bounds are finite and `low < high`.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return Err(AbcError::InvalidDistribution(format!(
                "uniform bounds must be finite with low < high, got [{low}, {high}]"
            )));
        }
        Ok(Self {
            low,
            high,
            sampler: rand_distr::Uniform::new_inclusive(low, high),
        })
    }
}

impl PriorDistribution for Uniform {
    fn log_density(&self, x: f64) -> f64 {
        if x >= self.low && x <= self.high {
            -(self.high - self.low).ln()
        } else {
            f64::NEG_INFINITY
        }
    }
}

impl ProposalDistribution for Uniform {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.sampler.sample(rng)
    }
}

/// Normal distribution with mean `mean` and standard deviation `std_dev`.
#[derive(Debug, Clone)]
pub struct Normal {
    pub mean: f64,
    pub std_dev: f64,
    sampler: rand_distr::Normal<f64>,
}

impl Normal {
    /// Fails unless `mean` is finite and `std_dev` is finite and strictly positive.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        if !mean.is_finite() || !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(AbcError::InvalidDistribution(format!(
                "normal needs finite mean and positive std_dev, got mean={mean}, std_dev={std_dev}"
            )));
        }
        let sampler = rand_distr::Normal::new(mean, std_dev)
            .map_err(|e| AbcError::InvalidDistribution(e.to_string()))?;
        Ok(Self {
            mean,
            std_dev,
            sampler,
        })
    }

    /// The standard normal N(0, 1).
    pub fn standard() -> Self {
        Self {
            mean: 0.0,
            std_dev: 1.0,
            sampler: rand_distr::Normal::new(0.0, 1.0).expect("unit normal is valid"),
        }
    }
}

impl PriorDistribution for Normal {
    fn log_density(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.std_dev;
        -0.5 * (2.0 * PI).ln() - self.std_dev.ln() - 0.5 * z * z
    }
}

impl ProposalDistribution for Normal {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.sampler.sample(rng)
    }
}
