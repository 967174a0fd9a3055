use std::ops::Index;

use noisy_float::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::ensemble::Sample;
use crate::error::{Error, Location};
use crate::util::compensated_sum;

/// Mean, variance, and standard deviation of one parameter
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize)]
pub struct Moments {
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
}

/// Moments of all parameters of a sample set, in parameter order
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
pub struct MomentSet(Vec<Moments>);

impl MomentSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Moments> {
        self.0.iter()
    }

    pub fn means(&self) -> Vec<f64> {
        self.0.iter().map(|m| m.mean).collect()
    }

    pub fn std_devs(&self) -> Vec<f64> {
        self.0.iter().map(|m| m.std_dev).collect()
    }
}

impl Index<usize> for MomentSet {
    type Output = Moments;

    fn index(&self, idx: usize) -> &Moments {
        &self.0[idx]
    }
}

/// Standard deviation for the given variance
///
/// Negative variances are an error, not clamped.
pub fn std_dev(variance: f64, parameter: usize) -> Result<f64, Error> {
    if variance < 0. || variance.is_nan() {
        return Err(Error::numeric(
            Location::Parameter(parameter),
            format!("cannot take square root of variance {variance:e}"),
        ));
    }
    Ok(variance.sqrt())
}

/// Compute per-parameter moments of a (weighted) sample set
///
/// Without weights this is the sample mean and the unbiased variance.
/// With weights `W_i` normalised to their number `N` the mean is
/// `1/N Σ W_i x_i` and the variance is `1/(N-1) Σ W_i (x_i - mean)²`.
pub fn compute_moments(samples: &[Sample], weights: Option<&[N64]>) -> Result<MomentSet, Error> {
    let dof = samples.len() as f64 - 1.;
    compute_moments_with_dof(samples, weights, dof)
}

/// Like [compute_moments], but divide the sum of squared deviations
/// by `dof` instead of `N - 1`
pub fn compute_moments_with_dof(
    samples: &[Sample],
    weights: Option<&[N64]>,
    dof: f64,
) -> Result<MomentSet, Error> {
    let Some(first) = samples.first() else {
        return Err(Error::InvalidInput("no samples".to_owned()));
    };
    if let Some(weights) = weights {
        if weights.len() != samples.len() {
            return Err(Error::InvalidInput(format!(
                "got {} weights for {} samples",
                weights.len(),
                samples.len()
            )));
        }
    }
    if !(dof > 0.) {
        return Err(Error::numeric(
            Location::Ensemble,
            format!("variance normalisation {dof} is not positive"),
        ));
    }
    let n = samples.len() as f64;
    let weight = |i: usize| weights.map_or(1., |w| w[i].raw());
    let n_params = first.values().len();
    let moments: Result<Vec<_>, _> = (0..n_params)
        .into_par_iter()
        .map(|k| {
            let mean = compensated_sum(
                samples.iter().enumerate().map(|(i, s)| weight(i) * s.value(k)),
            ) / n;
            let variance = compensated_sum(samples.iter().enumerate().map(|(i, s)| {
                let dev = s.value(k) - mean;
                weight(i) * dev * dev
            })) / dof;
            let std_dev = std_dev(variance, k)?;
            Ok(Moments {
                mean,
                variance,
                std_dev,
            })
        })
        .collect();
    Ok(MomentSet(moments?))
}
