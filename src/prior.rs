//! Prior log-density as a sum of independent univariate factors.

use indexmap::IndexMap;
use ndarray::ArrayView1;

use crate::distributions::PriorDistribution;
use crate::error::{AbcError, Result};
use crate::parameters::ParameterNames;

/// One prior specification: parameter name to its marginal prior.
pub type PriorSpec = IndexMap<String, Box<dyn PriorDistribution>>;

/// Ordered sequence of prior specifications.
///
/// The prior is treated as a product of independent marginals: each distribution is
/// evaluated at the component of the parameter vector carrying its name and the
/// log-densities are summed. Correlated joint priors cannot be expressed here.
#[derive(Default)]
pub struct PriorSet {
    specs: Vec<PriorSpec>,
}

impl PriorSet {
    pub fn new(specs: Vec<PriorSpec>) -> Self {
        Self { specs }
    }

    /// Appends a single-parameter specification.
    pub fn with<P>(mut self, name: impl Into<String>, prior: P) -> Self
    where
        P: PriorDistribution + 'static,
    {
        let mut spec = PriorSpec::new();
        spec.insert(name.into(), Box::new(prior));
        self.specs.push(spec);
        self
    }

    pub fn specs(&self) -> &[PriorSpec] {
        &self.specs
    }

    /// Fails if a prior refers to a parameter that is not declared.
    pub fn validate(&self, names: &ParameterNames) -> Result<()> {
        for name in self.specs.iter().flat_map(|spec| spec.keys()) {
            if names.index_of(name).is_none() {
                return Err(AbcError::UnknownParameter(name.clone()));
            }
        }
        Ok(())
    }

    /// Total log-density of `theta`. May be `-inf`; never `NaN`.
    ///
    /// ```rust
    /// use abc_mcmc::distributions::Uniform;
    /// use abc_mcmc::parameters::ParameterNames;
    /// use abc_mcmc::prior::PriorSet;
    /// use ndarray::array;
    ///
    /// let names = ParameterNames::new(["theta"]).unwrap();
    /// let prior = PriorSet::default().with("theta", Uniform::new(0.0, 10.0).unwrap());
    /// let lp = prior.log_density(&names, array![2.0].view()).unwrap();
    /// assert!((lp + (10.0f64).ln()).abs() < 1e-12);
    /// ```
    pub fn log_density(&self, names: &ParameterNames, theta: ArrayView1<f64>) -> Result<f64> {
        names.check_len(theta)?;
        let mut total = 0.0;
        for (name, dist) in self.specs.iter().flat_map(|spec| spec.iter()) {
            let index = names
                .index_of(name)
                .ok_or_else(|| AbcError::UnknownParameter(name.clone()))?;
            total += dist.log_density(theta[index]);
        }
        if total.is_nan() {
            return Err(AbcError::InvalidDensity(theta.to_vec()));
        }
        Ok(total)
    }
}

impl std::fmt::Debug for PriorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.specs.iter().map(|spec| spec.keys().collect::<Vec<_>>()))
            .finish()
    }
}
