use itertools::repeat_n;
use log::{debug, info};
use noisy_float::prelude::*;

use crate::ensemble::{Ensemble, ParameterSet, Sample};
use crate::error::Error;
use crate::traits::Unweight;
use crate::weights::Weights;

/// Tolerance for the total cumulative probability
pub const CUMULANT_TOLERANCE: f64 = 1e-4;

/// Slot points closer than this (in units of `1/M`) to a cumulative
/// probability are considered to lie on it
pub const TIE_TOLERANCE: f64 = 1e-9;

/// Cumulative probabilities `C_i = Σ_{j ≤ i} W_j / N`
///
/// The last entry is checked to be one up to [CUMULANT_TOLERANCE]
/// and then set to exactly one.
pub fn cumulative_probabilities(weights: &[N64]) -> Result<Vec<f64>, Error> {
    if weights.is_empty() {
        return Err(Error::InvalidInput("no weights".to_owned()));
    }
    if let Some(bad) = weights.iter().position(|w| *w < 0.) {
        return Err(Error::InvalidInput(format!(
            "negative weight {} for sample {bad}",
            weights[bad]
        )));
    }
    let n = weights.len() as f64;
    // a plain running sum is monotonic, which the binning relies on
    let mut cumulant = 0.;
    let mut cumulants: Vec<f64> = weights
        .iter()
        .map(|w| {
            cumulant += w.raw() / n;
            cumulant
        })
        .collect();
    if (cumulant - 1.).abs() > CUMULANT_TOLERANCE {
        return Err(Error::InvariantViolation(format!(
            "probability cumulants add up to {cumulant}, not 1"
        )));
    }
    if let Some(last) = cumulants.last_mut() {
        *last = 1.;
    }
    Ok(cumulants)
}

/// Integer multiplicities for an unweighted sample of size `target`
///
/// The interval `(0, 1]` is split into the cumulative-probability
/// intervals `(C_{i-1}, C_i]` of the samples. Sample `i` is assigned
/// one copy for each slot `t = 1..=target` whose point `t/target`
/// falls into its interval, so its multiplicity is
/// `floor(target C_i) - floor(target C_{i-1})`. A point that coincides
/// with a boundary `C_i` belongs to sample `i`. Samples with vanishing
/// probability have empty intervals and never receive copies.
///
/// The multiplicities always add up to `target`.
pub fn multiplicities(weights: &[N64], target: usize) -> Result<Vec<usize>, Error> {
    let cumulants = cumulative_probabilities(weights)?;
    let m = target as f64;
    let last = cumulants.len() - 1;
    let mut prev_slots = 0;
    let mut res = Vec::with_capacity(cumulants.len());
    for (i, c) in cumulants.into_iter().enumerate() {
        let slots = if i == last {
            target
        } else {
            usize::min((m * c + TIE_TOLERANCE).floor() as usize, target)
        };
        if slots < prev_slots {
            return Err(Error::InvariantViolation(format!(
                "cumulative slot count decreases at sample {i}"
            )));
        }
        res.push(slots - prev_slots);
        prev_slots = slots;
    }
    let total: usize = res.iter().sum();
    if total != target {
        return Err(Error::InvariantViolation(format!(
            "integer weights add up to {total}, should be {target}"
        )));
    }
    Ok(res)
}

/// Sample set produced by unweighting
///
/// Each surviving prior sample appears as often as its multiplicity,
/// in the order of the prior ensemble.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnweightedEnsemble {
    ensemble: Ensemble,
    multiplicities: Vec<usize>,
}

impl UnweightedEnsemble {
    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    pub fn into_ensemble(self) -> Ensemble {
        self.ensemble
    }

    pub fn parameters(&self) -> &ParameterSet {
        self.ensemble.parameters()
    }

    pub fn samples(&self) -> &[Sample] {
        self.ensemble.samples()
    }

    pub fn len(&self) -> usize {
        self.ensemble.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ensemble.is_empty()
    }

    /// Multiplicity of each prior sample
    pub fn multiplicities(&self) -> &[usize] {
        self.multiplicities.as_slice()
    }

    /// Number of distinct prior samples that survived unweighting
    pub fn n_surviving(&self) -> usize {
        self.multiplicities.iter().filter(|&&m| m > 0).count()
    }
}

/// Replicate each prior sample according to its multiplicity
pub fn expand(prior: &Ensemble, multiplicities: &[usize]) -> Result<UnweightedEnsemble, Error> {
    if multiplicities.len() != prior.len() {
        return Err(Error::InvalidInput(format!(
            "got {} multiplicities for {} samples",
            multiplicities.len(),
            prior.len()
        )));
    }
    let total = multiplicities.iter().sum();
    let mut samples = Vec::with_capacity(total);
    for (sample, &m) in prior.samples().iter().zip(multiplicities) {
        samples.extend(repeat_n(sample, m).cloned());
    }
    let ensemble = Ensemble::new(prior.parameters().clone(), samples)?;
    Ok(UnweightedEnsemble {
        ensemble,
        multiplicities: multiplicities.to_vec(),
    })
}

/// Deterministic unweighting by inverse-CDF binning
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Unweighter {}

impl Unweighter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Unweight for Unweighter {
    type Error = Error;

    fn unweight(
        &mut self,
        prior: &Ensemble,
        weights: &Weights,
        target: usize,
    ) -> Result<UnweightedEnsemble, Self::Error> {
        let multiplicities = multiplicities(weights.as_slice(), target)?;
        let unweighted = expand(prior, &multiplicities)?;
        info!(
            "Sum of integer weights after unweighting: {}",
            unweighted.len()
        );
        debug!(
            "{} of {} samples survive unweighting",
            unweighted.n_surviving(),
            prior.len()
        );
        Ok(unweighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::{Likelihood, SampleBuilder};
    use crate::weights::{compute_weights, effective_sample_size, target_size};
    use proptest::prelude::*;

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn wts(w: &[f64]) -> Vec<N64> {
        Weights::from_unnormalised(w).unwrap().as_slice().to_vec()
    }

    fn prior(values: &[f64]) -> Ensemble {
        let samples = values
            .iter()
            .enumerate()
            .map(|(id, &v)| {
                let mut b = SampleBuilder::new(id);
                b.add_value(v);
                b.build()
            })
            .collect();
        Ensemble::new(ParameterSet::new(["A"]).unwrap(), samples).unwrap()
    }

    #[test]
    fn four_replicas() {
        log_init();

        let lls: Vec<_> = [1., 2., 3., 4.]
            .into_iter()
            .map(|c| Likelihood::new(c, 2))
            .collect();
        let weights = compute_weights(&lls, 1.).unwrap();
        let n_eff = effective_sample_size(weights.as_slice()).unwrap();
        let target = target_size(n_eff);
        assert_eq!(target, 3);

        let prior = prior(&[1., 2., 3., 4.]);
        let unweighted = Unweighter::new().unweight(&prior, &weights, target).unwrap();
        let mult = unweighted.multiplicities();
        assert_eq!(mult.iter().sum::<usize>(), target);
        assert!(mult[0] >= mult[3]);
        assert_eq!(mult, &[1, 0, 1, 1]);
        assert_eq!(unweighted.ensemble().column(0), vec![1., 3., 4.]);
        assert_eq!(unweighted.n_surviving(), 3);
    }

    #[test]
    fn boundary_belongs_to_lower_sample() {
        let w = wts(&[1., 1.]);
        assert_eq!(multiplicities(&w, 2).unwrap(), vec![1, 1]);
        assert_eq!(multiplicities(&w, 1).unwrap(), vec![0, 1]);
        assert_eq!(multiplicities(&w, 4).unwrap(), vec![2, 2]);
        assert_eq!(multiplicities(&w, 3).unwrap(), vec![1, 2]);
    }

    #[test]
    fn uniform() {
        for n in 1..40 {
            let w = wts(&vec![1.; n]);
            for m in 0..100 {
                let mult = multiplicities(&w, m).unwrap();
                assert_eq!(mult.iter().sum::<usize>(), m);
                for k in mult {
                    assert!(k == m / n || k == (m + n - 1) / n);
                }
            }
        }
        let w = wts(&[1.; 5]);
        assert_eq!(multiplicities(&w, 5).unwrap(), vec![1; 5]);
    }

    #[test]
    fn clamped_weight() {
        log_init();

        let lls: Vec<_> = [10., 12., 2000., 11.]
            .into_iter()
            .map(|c| Likelihood::new(c, 1))
            .collect();
        let weights = compute_weights(&lls, 1.).unwrap();
        assert_eq!(weights.n_clamped(), 1);
        let n_eff = effective_sample_size(weights.as_slice()).unwrap();
        let mult = multiplicities(weights.as_slice(), target_size(n_eff)).unwrap();
        assert_eq!(mult[2], 0);
    }

    #[test]
    fn zero_weights_do_not_shift() {
        let w = Weights::from_unnormalised(&[2., 0., 1., 0., 1.]).unwrap();
        let mult = multiplicities(w.as_slice(), 7).unwrap();
        assert_eq!(mult[1], 0);
        assert_eq!(mult[3], 0);
        let dense = wts(&[2., 1., 1.]);
        let dense_mult = multiplicities(&dense, 7).unwrap();
        assert_eq!(vec![mult[0], mult[2], mult[4]], dense_mult);
    }

    #[test]
    fn errors() {
        assert!(matches!(multiplicities(&[], 3), Err(Error::InvalidInput(_))));
        assert!(matches!(
            multiplicities(&[n64(-1.), n64(3.)], 1),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            multiplicities(&[n64(1.), n64(3.)], 1),
            Err(Error::InvariantViolation(_))
        ));
        let prior = prior(&[1., 2.]);
        assert!(expand(&prior, &[1]).is_err());
    }

    proptest! {
        #[test]
        fn sum_rule(
            w in prop::collection::vec(0.0..100.0f64, 1..200),
            target in 0usize..500,
        ) {
            prop_assume!(w.iter().any(|&w| w > 0.));
            let w = wts(&w);
            let mult = multiplicities(&w, target).unwrap();
            prop_assert_eq!(mult.len(), w.len());
            prop_assert_eq!(mult.iter().sum::<usize>(), target);
            prop_assert_eq!(mult, multiplicities(&w, target).unwrap());
        }

        #[test]
        fn monotonic(
            w in prop::collection::vec(0.01..10.0f64, 1..50),
            idx in any::<prop::sample::Index>(),
            factor in 1.5..10.0f64,
            target in 1usize..100,
        ) {
            let idx = idx.index(w.len());
            let mut bumped = w.clone();
            bumped[idx] *= factor;
            let before = multiplicities(&wts(&w), target).unwrap();
            let after = multiplicities(&wts(&bumped), target).unwrap();
            prop_assert!(after[idx] >= before[idx]);
        }
    }
}
