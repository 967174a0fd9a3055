use std::ops::Index;

use log::{debug, info, warn};
use noisy_float::prelude::*;

use crate::ensemble::Likelihood;
use crate::error::{Error, Location};
use crate::util::{approx_eq, compensated_sum};

/// Weights below this value are replaced by it
///
/// Keeps the logarithm in the Shannon entropy finite.
pub const MIN_WEIGHT: f64 = 1e-300;

/// Relative tolerance for the normalisation `Σ W_i == N`
pub const NORMALISATION_TOLERANCE: f64 = 1e-6;

/// Tolerance for snapping the effective sample size to an integer
pub const TARGET_SIZE_TOLERANCE: f64 = 1e-9;

/// Normalised importance weights, one per prior sample
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Weights {
    values: Vec<N64>,
    n_clamped: usize,
}

impl Weights {
    /// Normalise the given unnormalised weights such that they sum
    /// up to their number, then clamp weights below [MIN_WEIGHT]
    pub fn from_unnormalised(weights: &[f64]) -> Result<Self, Error> {
        if weights.is_empty() {
            return Err(Error::InvalidInput("no weights".to_owned()));
        }
        if let Some(bad) = weights.iter().position(|w| !(*w >= 0.) || w.is_infinite()) {
            return Err(Error::numeric(
                Location::Sample(bad),
                format!("invalid unnormalised weight {}", weights[bad]),
            ));
        }
        let n = weights.len() as f64;
        let norm = compensated_sum(weights.iter().copied()) / n;
        if !(norm > 0.) || !norm.is_finite() {
            return Err(Error::numeric(
                Location::Ensemble,
                format!("cannot normalise weights with mean {norm:e}"),
            ));
        }
        let mut values: Vec<_> = weights.iter().map(|w| n64(w / norm)).collect();

        let sum = compensated_sum(values.iter().map(|w| w.raw()));
        if !approx_eq(sum, n, NORMALISATION_TOLERANCE, n) {
            return Err(Error::InvariantViolation(format!(
                "sum of weights is {sum}, should be {n}"
            )));
        }

        let min_wt = n64(MIN_WEIGHT);
        let mut n_clamped = 0;
        for w in &mut values {
            if *w < min_wt {
                *w = min_wt;
                n_clamped += 1;
            }
        }
        if n_clamped > 0 {
            warn!("{n_clamped} weights below {MIN_WEIGHT:e} were replaced by {MIN_WEIGHT:e}");
        }
        Ok(Self { values, n_clamped })
    }

    /// Number of weights that were raised to [MIN_WEIGHT]
    pub fn n_clamped(&self) -> usize {
        self.n_clamped
    }

    pub fn as_slice(&self) -> &[N64] {
        self.values.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(|w| w.raw())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sum(&self) -> f64 {
        compensated_sum(self.iter())
    }

    /// The `n` largest weights in descending order
    pub fn largest(&self, n: usize) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.into_iter().take(n).map(|w| w.raw()).collect()
    }
}

impl Index<usize> for Weights {
    type Output = N64;

    fn index(&self, idx: usize) -> &N64 {
        &self.values[idx]
    }
}

/// Logarithm of the unnormalised weight
///
/// `w = (χ²/s²)^((k-1)/2) exp(-χ²/(2s²))` for `k` data points and
/// scaling factor `s`.
pub fn log_weight(likelihood: &Likelihood, scaling_factor: f64) -> f64 {
    let scaled_chi2 = likelihood.chi2 / (scaling_factor * scaling_factor);
    let exponent = 0.5 * (likelihood.n_datapoints as f64 - 1.);
    // 0^0 = 1
    let power = if exponent == 0. {
        0.
    } else {
        exponent * scaled_chi2.ln()
    };
    power - 0.5 * scaled_chi2
}

fn check_likelihoods(likelihoods: &[Likelihood], scaling_factor: f64) -> Result<(), Error> {
    if likelihoods.is_empty() {
        return Err(Error::InvalidInput("no likelihood data".to_owned()));
    }
    if !(scaling_factor > 0.) || !scaling_factor.is_finite() {
        return Err(Error::InvalidInput(format!(
            "scaling factor has to be positive, is {scaling_factor}"
        )));
    }
    for (n, l) in likelihoods.iter().enumerate() {
        if !(l.chi2 >= 0.) || !l.chi2.is_finite() {
            return Err(Error::InvalidInput(format!(
                "sample {n} has invalid chi2 {}",
                l.chi2
            )));
        }
        if l.n_datapoints < 1 {
            return Err(Error::InvalidInput(format!(
                "sample {n} has no data points"
            )));
        }
    }
    Ok(())
}

/// Compute normalised weights `W_i` with `Σ W_i = N`
///
/// The weights are evaluated in logarithmic space and shifted by the
/// largest logarithm before exponentiation, which leaves the
/// normalised weights unchanged but avoids overflow for large χ² or
/// many data points.
pub fn compute_weights(likelihoods: &[Likelihood], scaling_factor: f64) -> Result<Weights, Error> {
    check_likelihoods(likelihoods, scaling_factor)?;
    let log_wts: Vec<_> = likelihoods
        .iter()
        .map(|l| log_weight(l, scaling_factor))
        .collect();
    let max = log_wts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(Error::numeric(
            Location::Ensemble,
            "all unnormalised weights vanish",
        ));
    }
    debug!("Largest log weight: {max}");
    let rel_wts: Vec<_> = log_wts.into_iter().map(|l| (l - max).exp()).collect();
    let weights = Weights::from_unnormalised(&rel_wts)?;
    info!("Sum of weights: {}", weights.sum());
    Ok(weights)
}

/// Effective number of samples from the Shannon entropy of the weights
///
/// `N_eff = exp(1/N Σ W_i ln(N/W_i))`. The result is at most `N`.
pub fn effective_sample_size(weights: &[N64]) -> Result<f64, Error> {
    if weights.is_empty() {
        return Err(Error::InvalidInput("no weights".to_owned()));
    }
    let n = weights.len() as f64;
    if let Some(bad) = weights.iter().position(|w| *w <= 0.) {
        return Err(Error::numeric(
            Location::Sample(bad),
            format!("non-positive weight {}", weights[bad]),
        ));
    }
    let entropy = compensated_sum(weights.iter().map(|w| {
        let w = w.raw();
        w * (n / w).ln()
    })) / n;
    let n_eff = f64::min(entropy.exp(), n);
    info!("N_eff after reweighting: {n_eff:.2}");
    Ok(n_eff)
}

/// Size of the unweighted sample for the given effective sample size
///
/// This is `floor(n_eff)`, except that values within rounding
/// distance of an integer are taken to be that integer.
pub fn target_size(n_eff: f64) -> usize {
    let nearest = n_eff.round();
    if approx_eq(n_eff, nearest, TARGET_SIZE_TOLERANCE, n_eff) {
        nearest as usize
    } else {
        n_eff.floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn likelihoods(chi2: &[f64], ndat: u32) -> Vec<Likelihood> {
        chi2.iter().map(|&c| Likelihood::new(c, ndat)).collect()
    }

    #[test]
    fn four_replicas() {
        log_init();

        let lls = likelihoods(&[1., 2., 3., 4.], 2);
        let weights = compute_weights(&lls, 1.).unwrap();
        let unnormalised: Vec<f64> = [1f64, 2., 3., 4.]
            .iter()
            .map(|c| c.sqrt() * (-c / 2.).exp())
            .collect();
        let norm: f64 = unnormalised.iter().sum::<f64>() / 4.;
        for (w, u) in weights.iter().zip(unnormalised) {
            assert!((w - u / norm).abs() < 1e-12);
        }
        assert!((weights.sum() - 4.).abs() < 1e-12);
        assert_eq!(weights.n_clamped(), 0);
        assert!(weights[0] > weights[3]);

        let n_eff = effective_sample_size(weights.as_slice()).unwrap();
        assert!(n_eff < 4.);
        assert!(n_eff > 3.);
        assert_eq!(target_size(n_eff), 3);
    }

    #[test]
    fn uniform() {
        log_init();

        for n in 1..20 {
            let lls = likelihoods(&vec![7.3; n], 5);
            let weights = compute_weights(&lls, 1.).unwrap();
            let n_eff = effective_sample_size(weights.as_slice()).unwrap();
            assert!((n_eff - n as f64).abs() < 1e-9);
            assert_eq!(target_size(n_eff), n);
        }
    }

    #[test]
    fn scaling_factor() {
        let lls = likelihoods(&[1., 9.], 1);
        let w1 = compute_weights(&lls, 1.).unwrap();
        let w2 = compute_weights(&lls, 2.).unwrap();
        assert!((w1[0].raw() / w1[1].raw() - 4f64.exp()).abs() < 1e-9);
        assert!((w2[0].raw() / w2[1].raw() - 1f64.exp()).abs() < 1e-9);
    }

    #[test]
    fn clamping() {
        log_init();

        let lls = likelihoods(&[10., 12., 2000., 11.], 1);
        let weights = compute_weights(&lls, 1.).unwrap();
        assert_eq!(weights.n_clamped(), 1);
        assert_eq!(weights[2], MIN_WEIGHT);
        assert!(effective_sample_size(weights.as_slice()).is_ok());
    }

    #[test]
    fn single_datapoint_zero_chi2() {
        let lls = likelihoods(&[0., 1.], 1);
        let weights = compute_weights(&lls, 1.).unwrap();
        assert!(weights[0] > weights[1]);
    }

    #[test]
    fn huge_chi2() {
        // the naive formula gives 0/0 here
        let lls = likelihoods(&[5000., 5001.], 4000);
        let weights = compute_weights(&lls, 1.).unwrap();
        assert!((weights.sum() - 2.).abs() < 1e-12);
        assert!(weights[0] > 0.);
        assert!(weights[1] > 0.);
    }

    #[test]
    fn invalid_input() {
        assert!(matches!(compute_weights(&[], 1.), Err(Error::InvalidInput(_))));
        let lls = likelihoods(&[-1., 2.], 3);
        assert!(matches!(compute_weights(&lls, 1.), Err(Error::InvalidInput(_))));
        let lls = likelihoods(&[1., 2.], 0);
        assert!(matches!(compute_weights(&lls, 1.), Err(Error::InvalidInput(_))));
        let lls = likelihoods(&[1., 2.], 3);
        assert!(matches!(compute_weights(&lls, 0.), Err(Error::InvalidInput(_))));
        let lls = likelihoods(&[0., 0.], 3);
        assert!(matches!(compute_weights(&lls, 1.), Err(Error::Numeric { .. })));
        assert!(effective_sample_size(&[n64(1.), n64(0.)]).is_err());
    }

    #[test]
    fn tst_target_size() {
        assert_eq!(target_size(3.9999999999999), 4);
        assert_eq!(target_size(3.99), 3);
        assert_eq!(target_size(4.), 4);
        assert_eq!(target_size(1.5), 1);
    }

    proptest! {
        #[test]
        fn normalisation(
            chi2 in prop::collection::vec(1e-3..200.0f64, 1..100),
            ndat in 1u32..50,
            scaling in 0.5..3.0f64,
        ) {
            let lls = likelihoods(&chi2, ndat);
            let weights = compute_weights(&lls, scaling).unwrap();
            let n = chi2.len() as f64;
            prop_assert!((weights.sum() - n).abs() <= 1e-6 * n);
            prop_assert!(weights.iter().all(|w| w >= MIN_WEIGHT));
        }

        #[test]
        fn n_eff_bound(wts in prop::collection::vec(1e-3..1e3f64, 1..100)) {
            let weights = Weights::from_unnormalised(&wts).unwrap();
            let n_eff = effective_sample_size(weights.as_slice()).unwrap();
            prop_assert!(n_eff <= wts.len() as f64);
            prop_assert!(n_eff >= 1. - 1e-9);
        }
    }
}
