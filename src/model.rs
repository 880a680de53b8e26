//! Collaborator traits: the simulator model and the summary-statistic reducer.

use ndarray::Array1;
use rand::RngCore;

use crate::error::CollaboratorError;
use crate::parameters::ParameterMap;
use crate::prior::PriorSet;

/// A simulator whose likelihood is intractable.
pub trait Model: Send + Sync {
    /// Synthetic data produced by one simulation.
    type Data;

    /// Runs one simulation. Any internal randomness must come from `rng`.
    fn simulate(
        &self,
        params: &ParameterMap,
        rng: &mut dyn RngCore,
    ) -> Result<Self::Data, CollaboratorError>;

    /// Prior over the model's parameters.
    fn prior(&self) -> &PriorSet;
}

/// Reduces synthetic data to a summary-statistic vector.
pub trait Summarizer<D>: Send + Sync {
    fn summarize(&self, data: &D) -> Result<Array1<f64>, CollaboratorError>;
}

/// Passes data that already is a statistic vector through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySummary;

impl Summarizer<Array1<f64>> for IdentitySummary {
    fn summarize(&self, data: &Array1<f64>) -> Result<Array1<f64>, CollaboratorError> {
        Ok(data.clone())
    }
}

impl Summarizer<Vec<f64>> for IdentitySummary {
    fn summarize(&self, data: &Vec<f64>) -> Result<Array1<f64>, CollaboratorError> {
        Ok(Array1::from(data.clone()))
    }
}

impl<D, F> Summarizer<D> for F
where
    F: Fn(&D) -> Result<Array1<f64>, CollaboratorError> + Send + Sync,
{
    fn summarize(&self, data: &D) -> Result<Array1<f64>, CollaboratorError> {
        self(data)
    }
}
