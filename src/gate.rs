/*!
The likelihood-free feasibility check.

A candidate parameter vector passes the gate when data simulated under it, once summarized
and scaled, lies strictly closer than `threshold` to the scaled observed statistic. Every call
runs exactly one simulation, which dominates the cost of sampling.
*/

use ndarray::{Array1, ArrayView1};
use rand::RngCore;

use crate::distance::{Distance, Euclidean};
use crate::error::{AbcError, Result};
use crate::model::{Model, Summarizer};
use crate::parameters::ParameterNames;
use crate::scaler::Scaler;

pub struct DistanceGate<M, S, C, D = Euclidean> {
    names: ParameterNames,
    model: M,
    summarizer: S,
    scaler: C,
    distance: D,
    scaled_observed: Array1<f64>,
    threshold: f64,
}

impl<M, S, C> DistanceGate<M, S, C, Euclidean>
where
    M: Model,
    S: Summarizer<M::Data>,
    C: Scaler,
{
    /// Builds a gate using the Euclidean distance.
    ///
    /// `observed` is the raw observed summary statistic; it is scaled once here.
    pub fn new(
        names: ParameterNames,
        model: M,
        summarizer: S,
        scaler: C,
        observed: ArrayView1<f64>,
        threshold: f64,
    ) -> Result<Self> {
        Self::with_distance(names, model, summarizer, scaler, Euclidean, observed, threshold)
    }
}

impl<M, S, C, D> DistanceGate<M, S, C, D>
where
    M: Model,
    S: Summarizer<M::Data>,
    C: Scaler,
    D: Distance,
{
    pub fn with_distance(
        names: ParameterNames,
        model: M,
        summarizer: S,
        scaler: C,
        distance: D,
        observed: ArrayView1<f64>,
        threshold: f64,
    ) -> Result<Self> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(AbcError::InvalidConfig(format!(
                "threshold must be finite and nonnegative, got {threshold}"
            )));
        }
        model.prior().validate(&names)?;
        let scaled_observed = scaler.transform(observed).map_err(AbcError::Scaling)?;
        Ok(Self {
            names,
            model,
            summarizer,
            scaler,
            distance,
            scaled_observed,
            threshold,
        })
    }

    /// Replaces the threshold, keeping everything else.
    pub fn set_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(AbcError::InvalidConfig(format!(
                "threshold must be finite and nonnegative, got {threshold}"
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }

    pub fn names(&self) -> &ParameterNames {
        &self.names
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn scaled_observed(&self) -> ArrayView1<f64> {
        self.scaled_observed.view()
    }

    /// Simulates under `theta` and returns the distance of its scaled summary statistic
    /// to the observed one.
    pub fn distance_to_observed(
        &self,
        theta: ArrayView1<f64>,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        let params = self.names.to_map(theta)?;
        let data = self
            .model
            .simulate(&params, rng)
            .map_err(AbcError::Simulation)?;
        let stat = self
            .summarizer
            .summarize(&data)
            .map_err(AbcError::Summary)?;
        let scaled = self
            .scaler
            .transform(stat.view())
            .map_err(AbcError::Scaling)?;
        if scaled.len() != self.scaled_observed.len() {
            return Err(AbcError::StatisticMismatch {
                expected: self.scaled_observed.len(),
                found: scaled.len(),
            });
        }
        let d = self
            .distance
            .distance(self.scaled_observed.view(), scaled.view());
        if d.is_nan() {
            return Err(AbcError::InvalidDistance);
        }
        Ok(d)
    }

    /// `true` iff the simulated statistic is strictly closer than the threshold.
    pub fn check(&self, theta: ArrayView1<f64>, rng: &mut dyn RngCore) -> Result<bool> {
        let d = self.distance_to_observed(theta, rng)?;
        log::trace!("distance {d:.6} against threshold {}", self.threshold);
        Ok(d < self.threshold)
    }
}

impl<M, S, C, D> std::fmt::Debug for DistanceGate<M, S, C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceGate")
            .field("names", &self.names)
            .field("scaled_observed", &self.scaled_observed)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::distributions::Uniform;
    use crate::error::CollaboratorError;
    use crate::model::IdentitySummary;
    use crate::parameters::ParameterMap;
    use crate::prior::PriorSet;
    use crate::scaler::IdentityScaler;
    use ndarray::array;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the parameters unchanged and counts how often it ran.
    pub(crate) struct EchoModel {
        pub prior: PriorSet,
        pub calls: AtomicUsize,
    }

    impl EchoModel {
        pub(crate) fn uniform(low: f64, high: f64) -> Self {
            Self {
                prior: PriorSet::default().with("theta", Uniform::new(low, high).unwrap()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Model for EchoModel {
        type Data = Array1<f64>;

        fn simulate(
            &self,
            params: &ParameterMap,
            _rng: &mut dyn RngCore,
        ) -> Result<Array1<f64>, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(params.values().copied().collect())
        }

        fn prior(&self) -> &PriorSet {
            &self.prior
        }
    }

    fn echo_gate(threshold: f64) -> DistanceGate<EchoModel, IdentitySummary, IdentityScaler> {
        DistanceGate::new(
            ParameterNames::new(["theta"]).unwrap(),
            EchoModel::uniform(0.0, 10.0),
            IdentitySummary,
            IdentityScaler,
            array![5.0].view(),
            threshold,
        )
        .unwrap()
    }

    #[test]
    fn threshold_is_strict() {
        let gate = echo_gate(0.5);
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        assert!(gate.check(array![5.2].view(), &mut rng).unwrap());
        assert!(gate.check(array![4.6].view(), &mut rng).unwrap());
        assert!(!gate.check(array![5.5].view(), &mut rng).unwrap());
        assert!(!gate.check(array![3.0].view(), &mut rng).unwrap());
    }

    #[test]
    fn one_simulation_per_check() {
        let gate = echo_gate(1.0);
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        for x in [1.0, 5.0, 9.0] {
            gate.check(array![x].view(), &mut rng).unwrap();
        }
        assert_eq!(gate.model().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let err = DistanceGate::new(
            ParameterNames::new(["theta"]).unwrap(),
            EchoModel::uniform(0.0, 1.0),
            IdentitySummary,
            IdentityScaler,
            array![0.5].view(),
            -1.0,
        )
        .unwrap_err();
        assert!(matches!(err, AbcError::InvalidConfig(_)));
    }

    #[test]
    fn statistic_length_mismatch_is_reported() {
        let gate = DistanceGate::new(
            ParameterNames::new(["theta"]).unwrap(),
            EchoModel::uniform(0.0, 10.0),
            IdentitySummary,
            IdentityScaler,
            array![5.0, 1.0].view(),
            1.0,
        )
        .unwrap();
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        assert!(matches!(
            gate.check(array![5.0].view(), &mut rng),
            Err(AbcError::StatisticMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn simulator_failure_propagates() {
        struct Failing(PriorSet);
        impl Model for Failing {
            type Data = Array1<f64>;
            fn simulate(
                &self,
                _params: &ParameterMap,
                _rng: &mut dyn RngCore,
            ) -> Result<Array1<f64>, CollaboratorError> {
                Err("solver diverged".into())
            }
            fn prior(&self) -> &PriorSet {
                &self.0
            }
        }

        let gate = DistanceGate::new(
            ParameterNames::new(["theta"]).unwrap(),
            Failing(PriorSet::default()),
            IdentitySummary,
            IdentityScaler,
            array![0.0].view(),
            1.0,
        )
        .unwrap();
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let err = gate.check(array![0.0].view(), &mut rng).unwrap_err();
        assert!(matches!(err, AbcError::Simulation(_)));
        assert_eq!(
            std::error::Error::source(&err).unwrap().to_string(),
            "solver diverged"
        );
    }
}
