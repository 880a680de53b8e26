//! TOML-configurable sampler settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chain::{ChainConfig, ThinningMode};
use crate::error::{AbcError, Result};
use crate::metropolis::DegenerateRatioPolicy;

/// Settings for one sampling run.
///
/// ```rust
/// use abc_mcmc::config::SamplerConfig;
///
/// let config = SamplerConfig::from_toml_str(
///     r#"
///     chain_length = 1000
///     threshold = 0.5
///     burn = 100
///     n_chains = 4
///     seed = 42
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.take, 1);
/// assert_eq!(config.chain_config().burn, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerConfig {
    /// Rows per chain, including the starting vector.
    pub chain_length: usize,
    /// Maximum (exclusive) distance between simulated and observed statistics.
    pub threshold: f64,
    /// Rows discarded from the front of each chain.
    #[serde(default)]
    pub burn: usize,
    /// Thinning interval.
    #[serde(default = "default_take")]
    pub take: usize,
    #[serde(default)]
    pub thinning: ThinningMode,
    /// Number of independent chains.
    #[serde(default = "default_n_chains")]
    pub n_chains: usize,
    /// Base seed; chain `i` is seeded with `seed + i`. Drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub degenerate_ratio: DegenerateRatioPolicy,
    /// Show progress bars while sampling.
    #[serde(default)]
    pub progress: bool,
}

fn default_take() -> usize {
    1
}

fn default_n_chains() -> usize {
    1
}

impl SamplerConfig {
    pub fn new(chain_length: usize, threshold: f64) -> Self {
        Self {
            chain_length,
            threshold,
            burn: 0,
            take: default_take(),
            thinning: ThinningMode::default(),
            n_chains: default_n_chains(),
            seed: None,
            degenerate_ratio: DegenerateRatioPolicy::default(),
            progress: false,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.chain_config().validate()?;
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(AbcError::InvalidConfig(format!(
                "threshold must be finite and nonnegative, got {}",
                self.threshold
            )));
        }
        if self.n_chains == 0 {
            return Err(AbcError::InvalidConfig("n_chains must be at least 1".into()));
        }
        Ok(())
    }

    /// Per-chain part of the configuration.
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            chain_length: self.chain_length,
            burn: self.burn,
            take: self.take,
            thinning: self.thinning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn full_config_parses() {
        let config = SamplerConfig::from_toml_str(
            r#"
            chain_length = 50
            threshold = 0.25
            burn = 10
            take = 3
            thinning = "step_between_records"
            n_chains = 2
            seed = 7
            degenerate_ratio = "reject"
            progress = true
            "#,
        )
        .unwrap();
        assert_eq!(config.thinning, ThinningMode::StepBetweenRecords);
        assert_eq!(config.degenerate_ratio, DegenerateRatioPolicy::Reject);
        assert_eq!(config.seed, Some(7));
        assert!(config.progress);
    }

    #[test]
    fn defaults_apply() {
        let config = SamplerConfig::from_toml_str("chain_length = 5\nthreshold = 1.0").unwrap();
        assert_eq!(config, SamplerConfig::new(5, 1.0));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "chain_length = 0\nthreshold = 1.0",
            "chain_length = 5\nthreshold = -1.0",
            "chain_length = 5\nthreshold = 1.0\nburn = 5",
            "chain_length = 5\nthreshold = 1.0\ntake = 0",
            "chain_length = 5\nthreshold = 1.0\nn_chains = 0",
        ] {
            assert!(
                matches!(SamplerConfig::from_toml_str(text), Err(AbcError::InvalidConfig(_))),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn unknown_keys_are_toml_errors() {
        assert!(matches!(
            SamplerConfig::from_toml_str("chain_length = 5\nthreshold = 1.0\nchains = 3"),
            Err(AbcError::Toml(_))
        ));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chain_length = 20\nthreshold = 0.5\nseed = 3").unwrap();
        let config = SamplerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.chain_length, 20);
        assert_eq!(config.seed, Some(3));
    }
}
