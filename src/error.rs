//! Error type shared by every sampler component.

use thiserror::Error;

/// Boxed error returned by user-supplied collaborators (simulators, summarizers, scalers).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AbcError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("parameter vector has length {found}, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("duplicate parameter name `{0}`")]
    DuplicateParameter(String),

    #[error(
        "proposal order does not match parameter order at position {position}: \
         expected `{expected}`, found `{found}`"
    )]
    ProposalOrder {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("prior log-density is NaN at {0:?}")]
    InvalidDensity(Vec<f64>),

    #[error("prior density of the current state is zero, acceptance ratio is undefined")]
    DegenerateRatio,

    #[error("simulation failed")]
    Simulation(#[source] CollaboratorError),

    #[error("summary statistic computation failed")]
    Summary(#[source] CollaboratorError),

    #[error("scaling summary statistics failed")]
    Scaling(#[source] CollaboratorError),

    #[error("simulated summary statistic has length {found}, observed has {expected}")]
    StatisticMismatch { expected: usize, found: usize },

    #[error("distance between summary statistics is NaN")]
    InvalidDistance,

    #[error("sampling cancelled after {completed} of {total} steps")]
    Cancelled { completed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = AbcError> = std::result::Result<T, E>;
