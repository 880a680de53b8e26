//! Per-parameter random-walk increments.

use indexmap::IndexMap;
use ndarray::Array1;
use rand::RngCore;

use crate::distributions::ProposalDistribution;
use crate::error::{AbcError, Result};
use crate::parameters::ParameterNames;

/// Ordered mapping from parameter name to its proposal distribution.
///
/// The iteration order must match the positional order of [`ParameterNames`];
/// [`ProposalSet::new`] enforces this.
pub struct ProposalSet {
    proposals: IndexMap<String, Box<dyn ProposalDistribution>>,
}

impl ProposalSet {
    /// ```rust
    /// use abc_mcmc::distributions::{Normal, ProposalDistribution};
    /// use abc_mcmc::parameters::ParameterNames;
    /// use abc_mcmc::proposal::ProposalSet;
    /// use indexmap::IndexMap;
    ///
    /// let names = ParameterNames::new(["mu"]).unwrap();
    /// let mut proposals: IndexMap<String, Box<dyn ProposalDistribution>> = IndexMap::new();
    /// proposals.insert("mu".into(), Box::new(Normal::new(0.0, 0.5).unwrap()));
    /// let set = ProposalSet::new(&names, proposals).unwrap();
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn new(
        names: &ParameterNames,
        proposals: IndexMap<String, Box<dyn ProposalDistribution>>,
    ) -> Result<Self> {
        if proposals.len() != names.len() {
            return Err(AbcError::DimensionMismatch {
                expected: names.len(),
                found: proposals.len(),
            });
        }
        for (position, (expected, found)) in names.iter().zip(proposals.keys()).enumerate() {
            if expected != found.as_str() {
                return Err(AbcError::ProposalOrder {
                    position,
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }
        Ok(Self { proposals })
    }

    /// Same proposal for every parameter.
    pub fn uniform_for<P>(names: &ParameterNames, proposal: P) -> Self
    where
        P: ProposalDistribution + Clone + 'static,
    {
        let proposals = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    Box::new(proposal.clone()) as Box<dyn ProposalDistribution>,
                )
            })
            .collect();
        Self { proposals }
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Parameter names in the order increments are drawn.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.proposals.keys().map(String::as_str)
    }

    /// Draws one independent increment per parameter, in canonical order.
    pub fn draw_increment(&self, rng: &mut dyn RngCore) -> Array1<f64> {
        self.proposals
            .values()
            .map(|proposal| proposal.sample(&mut *rng))
            .collect()
    }
}

impl std::fmt::Debug for ProposalSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProposalSet")
            .field("names", &self.proposals.keys().collect::<Vec<_>>())
            .finish()
    }
}
