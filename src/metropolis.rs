/*!
# ABC Metropolis step

One accept/reject decision of the likelihood-free Metropolis sampler. Starting from the
current state `old`:

1. a random-walk candidate `new = old + increment` is drawn from the [`ProposalSet`],
2. the prior ratio `alpha = min(p(new) / p(old), 1)` is computed in linear space,
3. a uniform `u` in `[0, 1)` is drawn,
4. the [`DistanceGate`] simulates once under `new`,
5. `new` is accepted iff the gate passed and `u < alpha`.

The random source is consumed in the fixed order proposal, `u`, simulation, so a chain is
reproducible from its seed. The gate runs on every step, whatever `alpha` is.

When `p(old)` is zero (or `log p(old)` is `+inf`) the ratio is undefined;
[`DegenerateRatioPolicy`] decides what happens. Otherwise the ratio is taken as
`exp(log p(new) - log p(old))`, which stays finite where `p` itself would overflow.
*/

use ndarray::{Array1, ArrayView1};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::distance::Distance;
use crate::error::{AbcError, Result};
use crate::gate::DistanceGate;
use crate::model::{Model, Summarizer};
use crate::parameters::ParameterNames;
use crate::proposal::ProposalSet;
use crate::scaler::Scaler;

/// What to do when the prior density of the current state is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateRatioPolicy {
    /// Treat the ratio as one, so the candidate only has to pass the distance gate.
    #[default]
    AcceptIfFeasible,
    /// Treat the ratio as zero, so the chain never leaves the current state.
    Reject,
    /// Fail the step with [`AbcError::DegenerateRatio`].
    Error,
}

/// Result of a single Metropolis step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// State after the step: the candidate if accepted, the old state otherwise.
    pub state: Array1<f64>,
    pub accepted: bool,
    /// Whether the candidate passed the distance gate.
    pub feasible: bool,
    /// Prior acceptance ratio `min(p(new) / p(old), 1)`.
    pub alpha: f64,
}

/// A Markov transition driven by an explicit random source.
pub trait MetropolisKernel: Send + Sync {
    /// Length of the parameter vectors this kernel moves.
    fn dim(&self) -> usize;

    /// Performs one transition from `current`.
    fn step(&self, current: ArrayView1<f64>, rng: &mut dyn RngCore) -> Result<StepOutcome>;
}

/// Prior ratio `min(exp(lp_new) / exp(lp_old), 1)`, evaluated as `exp(lp_new - lp_old)`.
///
/// ```rust
/// use abc_mcmc::metropolis::{prior_ratio, DegenerateRatioPolicy};
///
/// let alpha = prior_ratio(0.0, -(2.0f64).ln(), DegenerateRatioPolicy::default()).unwrap();
/// assert!((alpha - 0.5).abs() < 1e-12);
/// assert_eq!(prior_ratio(-1.0, 0.0, DegenerateRatioPolicy::default()).unwrap(), 1.0);
/// ```
pub fn prior_ratio(lp_old: f64, lp_new: f64, policy: DegenerateRatioPolicy) -> Result<f64> {
    if lp_old.exp() == 0.0 || lp_old == f64::INFINITY {
        log::debug!("prior ratio undefined for current state (log density {lp_old})");
        return match policy {
            DegenerateRatioPolicy::AcceptIfFeasible => Ok(1.0),
            DegenerateRatioPolicy::Reject => Ok(0.0),
            DegenerateRatioPolicy::Error => Err(AbcError::DegenerateRatio),
        };
    }
    Ok((lp_new - lp_old).exp().min(1.0))
}

/// The ABC Metropolis sampler kernel.
pub struct AbcMetropolis<M, S, C, D> {
    gate: DistanceGate<M, S, C, D>,
    proposals: ProposalSet,
    policy: DegenerateRatioPolicy,
}

impl<M, S, C, D> AbcMetropolis<M, S, C, D>
where
    M: Model,
    S: Summarizer<M::Data>,
    C: Scaler,
    D: Distance,
{
    pub fn new(gate: DistanceGate<M, S, C, D>, proposals: ProposalSet) -> Result<Self> {
        if proposals.len() != gate.names().len() {
            return Err(AbcError::DimensionMismatch {
                expected: gate.names().len(),
                found: proposals.len(),
            });
        }
        let pairs = gate.names().iter().zip(proposals.names());
        for (position, (expected, found)) in pairs.enumerate() {
            if expected != found {
                return Err(AbcError::ProposalOrder {
                    position,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(Self {
            gate,
            proposals,
            policy: DegenerateRatioPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: DegenerateRatioPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the distance threshold of the gate.
    pub fn set_threshold(mut self, threshold: f64) -> Result<Self> {
        self.gate = self.gate.set_threshold(threshold)?;
        Ok(self)
    }

    pub fn policy(&self) -> DegenerateRatioPolicy {
        self.policy
    }

    pub fn gate(&self) -> &DistanceGate<M, S, C, D> {
        &self.gate
    }

    pub fn names(&self) -> &ParameterNames {
        self.gate.names()
    }

    /// Total prior log-density of `theta`.
    pub fn log_prior(&self, theta: ArrayView1<f64>) -> Result<f64> {
        self.gate.model().prior().log_density(self.gate.names(), theta)
    }
}

impl<M, S, C, D> MetropolisKernel for AbcMetropolis<M, S, C, D>
where
    M: Model,
    S: Summarizer<M::Data>,
    C: Scaler,
    D: Distance,
{
    fn dim(&self) -> usize {
        self.gate.names().len()
    }

    fn step(&self, current: ArrayView1<f64>, rng: &mut dyn RngCore) -> Result<StepOutcome> {
        self.gate.names().check_len(current)?;
        let proposed = &current + &self.proposals.draw_increment(rng);

        let lp_old = self.log_prior(current)?;
        let lp_new = self.log_prior(proposed.view())?;
        let alpha = prior_ratio(lp_old, lp_new, self.policy)?;
        let u: f64 = rng.gen();

        // Simulate on every step so the simulator's draws do not depend on `alpha`.
        let feasible = self.gate.check(proposed.view(), rng)?;
        let accepted = feasible && u < alpha;
        log::trace!("proposed {proposed}, alpha {alpha:.4}, u {u:.4}, feasible {feasible}");

        Ok(StepOutcome {
            state: if accepted {
                proposed
            } else {
                current.to_owned()
            },
            accepted,
            feasible,
            alpha,
        })
    }
}

impl<M, S, C, D> std::fmt::Debug for AbcMetropolis<M, S, C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbcMetropolis")
            .field("gate", &self.gate)
            .field("proposals", &self.proposals)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Euclidean;
    use crate::distributions::Normal;
    use crate::gate::tests::EchoModel;
    use crate::model::IdentitySummary;
    use crate::scaler::IdentityScaler;
    use approx::assert_abs_diff_eq;
    use indexmap::IndexMap;
    use ndarray::array;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::atomic::Ordering;

    type EchoKernel = AbcMetropolis<EchoModel, IdentitySummary, IdentityScaler, Euclidean>;

    fn echo_kernel(low: f64, high: f64, threshold: f64, step: f64) -> EchoKernel {
        let names = ParameterNames::new(["theta"]).unwrap();
        let gate = DistanceGate::new(
            names.clone(),
            EchoModel::uniform(low, high),
            IdentitySummary,
            IdentityScaler,
            array![5.0].view(),
            threshold,
        )
        .unwrap();
        let proposals = ProposalSet::uniform_for(&names, Normal::new(0.0, step).unwrap());
        AbcMetropolis::new(gate, proposals).unwrap()
    }

    #[test]
    fn ratio_is_capped_at_one() {
        let policy = DegenerateRatioPolicy::default();
        assert_eq!(prior_ratio(-3.0, -1.0, policy).unwrap(), 1.0);
        let alpha = prior_ratio(-1.0, -3.0, policy).unwrap();
        assert!((alpha - (-2.0f64).exp()).abs() < 1e-12);
        assert_eq!(prior_ratio(-1.0, f64::NEG_INFINITY, policy).unwrap(), 0.0);
    }

    #[test]
    fn large_log_densities_keep_their_ratio() {
        let policy = DegenerateRatioPolicy::Reject;
        let expected = (-10.0f64).exp();
        // exp(710) and exp(720) overflow to infinity
        let alpha = prior_ratio(710.0, 700.0, policy).unwrap();
        assert_abs_diff_eq!(alpha, expected, epsilon = 1e-15);
        let alpha = prior_ratio(720.0, 710.0, policy).unwrap();
        assert_abs_diff_eq!(alpha, expected, epsilon = 1e-15);
        assert_eq!(prior_ratio(700.0, 710.0, policy).unwrap(), 1.0);
    }

    #[test]
    fn infinite_old_density_follows_policy() {
        assert_eq!(
            prior_ratio(f64::INFINITY, 1.0, DegenerateRatioPolicy::AcceptIfFeasible).unwrap(),
            1.0
        );
        assert!(matches!(
            prior_ratio(f64::INFINITY, f64::INFINITY, DegenerateRatioPolicy::Error),
            Err(AbcError::DegenerateRatio)
        ));
    }

    #[test]
    fn zero_old_density_follows_policy() {
        let lp_old = f64::NEG_INFINITY;
        assert_eq!(
            prior_ratio(lp_old, -1.0, DegenerateRatioPolicy::AcceptIfFeasible).unwrap(),
            1.0
        );
        assert_eq!(
            prior_ratio(lp_old, -1.0, DegenerateRatioPolicy::Reject).unwrap(),
            0.0
        );
        assert!(matches!(
            prior_ratio(lp_old, -1.0, DegenerateRatioPolicy::Error),
            Err(AbcError::DegenerateRatio)
        ));
        // exp(-1000) underflows to zero as well
        assert_eq!(
            prior_ratio(-1000.0, -999.0, DegenerateRatioPolicy::Reject).unwrap(),
            0.0
        );
    }

    #[test]
    fn start_outside_support_escapes_with_accepting_policy() {
        // Prior support [6, 10] excludes the start 5.0, the gate accepts within 2.0 of 5.0.
        let kernel = echo_kernel(6.0, 10.0, 2.0, 1.0);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = array![5.0];
        for _ in 0..200 {
            state = kernel.step(state.view(), &mut rng).unwrap().state;
        }
        assert!(state[0] >= 6.0 && state[0] < 7.0, "state {state}");
    }

    #[test]
    fn start_outside_support_is_stuck_with_reject_policy() {
        let kernel = echo_kernel(6.0, 10.0, 2.0, 1.0).with_policy(DegenerateRatioPolicy::Reject);
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..50 {
            let outcome = kernel.step(array![5.0].view(), &mut rng).unwrap();
            assert!(!outcome.accepted);
            assert_eq!(outcome.state, array![5.0]);
        }
    }

    #[test]
    fn error_policy_fails_the_step() {
        let kernel = echo_kernel(6.0, 10.0, 2.0, 1.0).with_policy(DegenerateRatioPolicy::Error);
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(matches!(
            kernel.step(array![5.0].view(), &mut rng),
            Err(AbcError::DegenerateRatio)
        ));
    }

    #[test]
    fn gate_runs_once_per_step_even_when_ratio_rejects() {
        // Tiny support: almost every candidate has zero prior density.
        let kernel = echo_kernel(4.999, 5.001, 10.0, 5.0);
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..25 {
            kernel.step(array![5.0].view(), &mut rng).unwrap();
        }
        assert_eq!(kernel.gate().model().calls.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn infeasible_candidates_are_never_accepted() {
        // A zero threshold can never be beaten strictly.
        let kernel = echo_kernel(0.0, 10.0, 0.0, 0.5);
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..100 {
            let outcome = kernel.step(array![5.0].view(), &mut rng).unwrap();
            assert!(!outcome.feasible);
            assert!(!outcome.accepted);
            assert_eq!(outcome.state, array![5.0]);
        }
    }

    #[test]
    fn steps_are_reproducible_under_seed() {
        let kernel = echo_kernel(0.0, 10.0, 0.5, 0.3);
        let run = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut state = array![5.0];
            let mut trace = Vec::new();
            for _ in 0..30 {
                state = kernel.step(state.view(), &mut rng).unwrap().state;
                trace.push(state[0]);
            }
            trace
        };
        assert_eq!(run(42), run(42));
    }

    /// Adds a fixed amount to every draw.
    #[derive(Clone)]
    struct Shift(f64);

    impl crate::distributions::ProposalDistribution for Shift {
        fn sample(&self, _rng: &mut dyn RngCore) -> f64 {
            self.0
        }
    }

    type FlatGate = DistanceGate<EchoModel, IdentitySummary, IdentityScaler>;

    fn flat_gate(names: &ParameterNames) -> FlatGate {
        let model = EchoModel {
            prior: crate::prior::PriorSet::default(),
            calls: Default::default(),
        };
        DistanceGate::new(
            names.clone(),
            model,
            IdentitySummary,
            IdentityScaler,
            array![0.0, 0.0].view(),
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn proposals_in_other_parameter_order_are_rejected() {
        let proposal_names = ParameterNames::new(["a", "b"]).unwrap();
        let mut map: IndexMap<String, Box<dyn crate::distributions::ProposalDistribution>> =
            IndexMap::new();
        map.insert("a".into(), Box::new(Shift(1.0)));
        map.insert("b".into(), Box::new(Shift(0.0)));
        let proposals = ProposalSet::new(&proposal_names, map).unwrap();

        let gate = flat_gate(&ParameterNames::new(["b", "a"]).unwrap());
        let err = AbcMetropolis::new(gate, proposals).unwrap_err();
        assert!(matches!(
            err,
            AbcError::ProposalOrder { position: 0, ref expected, ref found }
                if expected == "b" && found == "a"
        ));
    }

    #[test]
    fn increments_land_on_their_own_parameter() {
        let names = ParameterNames::new(["a", "b"]).unwrap();
        let mut map: IndexMap<String, Box<dyn crate::distributions::ProposalDistribution>> =
            IndexMap::new();
        map.insert("a".into(), Box::new(Shift(1.0)));
        map.insert("b".into(), Box::new(Shift(0.0)));
        let proposals = ProposalSet::new(&names, map).unwrap();
        let kernel = AbcMetropolis::new(flat_gate(&names), proposals).unwrap();

        let mut rng = SmallRng::seed_from_u64(0);
        let outcome = kernel.step(array![0.0, 0.0].view(), &mut rng).unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.state, array![1.0, 0.0]);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let kernel = echo_kernel(0.0, 10.0, 0.5, 0.3);
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(matches!(
            kernel.step(array![1.0, 2.0].view(), &mut rng),
            Err(AbcError::DimensionMismatch { .. })
        ));
    }
}
