//! # abc-mcmc
//!
//! Likelihood-free **Markov Chain Monte Carlo** for **Approximate Bayesian Computation**.
//!
//! When a model can be simulated but its likelihood cannot be evaluated, the sampler replaces
//! the likelihood by a feasibility check: a proposed parameter is only accepted if data
//! simulated under it reproduces the observed summary statistics within a distance
//! `threshold`, and if it passes a Metropolis test on the prior density ratio.
//!
//! You provide:
//! - a simulator implementing [`model::Model`] (it also carries the [`prior::PriorSet`]),
//! - a [`model::Summarizer`] reducing simulated data to a statistic vector,
//! - a [`scaler::Scaler`] fitted on the observed data,
//! - one [`distributions::ProposalDistribution`] per parameter.
//!
//! The pieces, leaf first:
//! - [`proposal::ProposalSet::draw_increment`] draws a random-walk increment,
//! - [`prior::PriorSet::log_density`] sums independent prior log-densities,
//! - [`gate::DistanceGate::check`] simulates once and compares distances,
//! - [`metropolis::AbcMetropolis`] combines them into one accept/reject step,
//! - [`chain::run_chain`] builds a chain with burn-in and thinning,
//! - [`sampler::AbcSampler`] runs independent chains in parallel.
//!
//! All randomness comes from caller-supplied random sources, so runs are reproducible.

pub mod chain;
pub mod config;
pub mod distance;
pub mod distributions;
pub mod error;
pub mod gate;
pub mod io;
pub mod metropolis;
pub mod model;
pub mod parameters;
pub mod prior;
pub mod proposal;
pub mod sampler;
pub mod scaler;
pub mod stats;

pub use error::{AbcError, Result};
