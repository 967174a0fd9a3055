use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

fn default_scaling_factor() -> f64 {
    1.
}

/// Settings for one reweighting run
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the prior ensemble
    #[builder(setter(into))]
    pub prior: String,
    /// Name of the posterior ensemble
    ///
    /// The likelihoods of the prior samples are taken from the data
    /// set with the same name.
    #[builder(setter(into))]
    pub posterior: String,
    /// Number of samples (replicas) in each ensemble
    pub n_reps: usize,
    /// Minimum KS statistic for a constrained parameter
    #[builder(default)]
    #[serde(default)]
    pub ks_level: f64,
    /// Minimum standard deviation reduction for a constrained parameter
    #[builder(default)]
    #[serde(default)]
    pub reduction_level: f64,
    /// χ² scaling factor in the weight computation
    #[builder(default = "1.")]
    #[serde(default = "default_scaling_factor")]
    pub scaling_factor: f64,
}

impl From<Config> for ConfigBuilder {
    fn from(c: Config) -> Self {
        let mut builder = ConfigBuilder::default();
        builder
            .prior(c.prior)
            .posterior(c.posterior)
            .n_reps(c.n_reps)
            .ks_level(c.ks_level)
            .reduction_level(c.reduction_level)
            .scaling_factor(c.scaling_factor);
        builder
    }
}

impl Config {
    /// Read settings from a YAML file and validate them
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_owned(), err))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|err| ConfigError::Yaml(path.to_owned(), err))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.n_reps == 0 {
            return Err(Error::InvalidInput(
                "number of replicas has to be positive".to_owned(),
            ));
        }
        if !(self.scaling_factor > 0.) || !self.scaling_factor.is_finite() {
            return Err(Error::InvalidInput(format!(
                "scaling factor has to be positive, is {}",
                self.scaling_factor
            )));
        }
        for (name, level) in [
            ("KS", self.ks_level),
            ("reduction", self.reduction_level),
        ] {
            if !level.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "{name} level has to be finite, is {level}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0:?}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file {0:?}: {1}")]
    Yaml(PathBuf, #[source] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Error),
}
