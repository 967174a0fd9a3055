use std::collections::HashSet;
use std::convert::From;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Ordered set of unique parameter (Wilson coefficient) names
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterSet(Vec<String>);

impl ParameterSet {
    pub fn new<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate parameter name `{name}`"
                )));
            }
        }
        Ok(Self(names))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        self.0.as_slice()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }
}

impl Index<usize> for ParameterSet {
    type Output = str;

    fn index(&self, idx: usize) -> &str {
        &self.0[idx]
    }
}

/// Goodness-of-fit of one sample against the new data
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Likelihood {
    pub chi2: f64,
    pub n_datapoints: u32,
    pub chi2_normalised: f64,
}

impl Likelihood {
    pub fn new(chi2: f64, n_datapoints: u32) -> Self {
        Self {
            chi2,
            n_datapoints,
            chi2_normalised: chi2 / n_datapoints as f64,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuilder {
    id: usize,
    values: Vec<f64>,
    likelihood: Option<Likelihood>,
}

impl SampleBuilder {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            values: Vec::new(),
            likelihood: None,
        }
    }

    pub fn with_capacity(id: usize, cap: usize) -> Self {
        Self {
            id,
            values: Vec::with_capacity(cap),
            likelihood: None,
        }
    }

    pub fn add_value(&mut self, value: f64) -> &mut Self {
        self.values.push(value);
        self
    }

    pub fn values(&mut self, values: Vec<f64>) -> &mut Self {
        self.values = values;
        self
    }

    pub fn likelihood(&mut self, likelihood: Likelihood) -> &mut Self {
        self.likelihood = Some(likelihood);
        self
    }

    pub fn build(self) -> Sample {
        Sample {
            id: self.id,
            values: self.values,
            likelihood: self.likelihood,
        }
    }
}

impl From<SampleBuilder> for Sample {
    fn from(b: SampleBuilder) -> Self {
        b.build()
    }
}

/// One parameter vector with optional likelihood statistics
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Sample {
    id: usize,
    values: Vec<f64>,
    likelihood: Option<Likelihood>,
}

impl Sample {
    /// Position of the sample in the ensemble it was loaded from
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn values(&self) -> &[f64] {
        self.values.as_slice()
    }

    pub fn value(&self, parameter: usize) -> f64 {
        self.values[parameter]
    }

    pub fn likelihood(&self) -> Option<&Likelihood> {
        self.likelihood.as_ref()
    }
}

/// Ordered sequence of samples sharing one [ParameterSet]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ensemble {
    parameters: ParameterSet,
    samples: Vec<Sample>,
}

impl Ensemble {
    /// Create an ensemble, checking that every sample has one value per parameter
    pub fn new(parameters: ParameterSet, samples: Vec<Sample>) -> Result<Self, Error> {
        if let Some(bad) = samples
            .iter()
            .position(|s| s.values.len() != parameters.len())
        {
            return Err(Error::InvalidInput(format!(
                "sample {bad} has {} values, expected {}",
                samples[bad].values.len(),
                parameters.len()
            )));
        }
        Ok(Self {
            parameters,
            samples,
        })
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn samples(&self) -> &[Sample] {
        self.samples.as_slice()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All values of the given parameter, in sample order
    pub fn column(&self, parameter: usize) -> Vec<f64> {
        self.samples.iter().map(|s| s.values[parameter]).collect()
    }

    /// Likelihood statistics of all samples
    ///
    /// Fails if any sample was loaded without likelihood data.
    pub fn likelihoods(&self) -> Result<Vec<Likelihood>, Error> {
        self.samples
            .iter()
            .map(|s| {
                s.likelihood.ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "sample {} has no likelihood data",
                        s.id
                    ))
                })
            })
            .collect()
    }
}
