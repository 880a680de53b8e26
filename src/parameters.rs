//! Parameter names and the positional/named forms of a parameter vector.

use indexmap::{IndexMap, IndexSet};
use ndarray::{Array1, ArrayView1};

use crate::error::{AbcError, Result};

/// Named form of a parameter vector, as handed to a simulator.
pub type ParameterMap = IndexMap<String, f64>;

/// Ordered set of parameter names. Position `i` of every parameter vector
/// holds the value of the `i`-th name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterNames {
    names: IndexSet<String>,
}

impl ParameterNames {
    /// Builds the name set, rejecting duplicates.
    ///
    /// ```rust
    /// use abc_mcmc::parameters::ParameterNames;
    ///
    /// let names = ParameterNames::new(["mu", "sigma"]).unwrap();
    /// assert_eq!(names.len(), 2);
    /// assert_eq!(names.index_of("sigma"), Some(1));
    /// assert!(ParameterNames::new(["mu", "mu"]).is_err());
    /// ```
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = IndexSet::new();
        for name in names {
            let name = name.into();
            if set.contains(&name) {
                return Err(AbcError::DuplicateParameter(name));
            }
            set.insert(name);
        }
        Ok(Self { names: set })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Fails unless `theta` has one entry per name.
    pub fn check_len(&self, theta: ArrayView1<f64>) -> Result<()> {
        if theta.len() != self.len() {
            return Err(AbcError::DimensionMismatch {
                expected: self.len(),
                found: theta.len(),
            });
        }
        Ok(())
    }

    /// Converts a positional vector into its named form.
    pub fn to_map(&self, theta: ArrayView1<f64>) -> Result<ParameterMap> {
        self.check_len(theta)?;
        Ok(self
            .names
            .iter()
            .cloned()
            .zip(theta.iter().copied())
            .collect())
    }

    /// Converts a named mapping back into a positional vector.
    pub fn to_vector(&self, map: &ParameterMap) -> Result<Array1<f64>> {
        if let Some(extra) = map.keys().find(|k| !self.names.contains(*k)) {
            return Err(AbcError::UnknownParameter(extra.clone()));
        }
        self.names
            .iter()
            .map(|name| {
                map.get(name)
                    .copied()
                    .ok_or_else(|| AbcError::UnknownParameter(name.clone()))
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }
}
