use log::{debug, warn};
use noisy_float::prelude::*;
use rayon::prelude::*;

use crate::ensemble::Ensemble;
use crate::error::Error;
use crate::moments::MomentSet;

/// Minimum number of values in each sample for a KS test
pub const MIN_KS_VALUES: usize = 2;

fn sorted(values: &[f64]) -> Result<Vec<N64>, Error> {
    if let Some(bad) = values.iter().position(|v| v.is_nan()) {
        return Err(Error::InvalidInput(format!("value {bad} is NaN")));
    }
    let mut sorted: Vec<_> = values.iter().map(|&v| n64(v)).collect();
    sorted.sort_unstable();
    Ok(sorted)
}

/// Two-sample Kolmogorov-Smirnov statistic
///
/// The largest absolute difference between the empirical cumulative
/// distribution functions of `a` and `b`.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> Result<f64, Error> {
    for len in [a.len(), b.len()] {
        if len < MIN_KS_VALUES {
            return Err(Error::InsufficientData {
                needed: MIN_KS_VALUES,
                got: len,
            });
        }
    }
    let a = sorted(a)?;
    let b = sorted(b)?;
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut max_dist: f64 = 0.;
    while i < a.len() && j < b.len() {
        let x = std::cmp::min(a[i], b[j]);
        while i < a.len() && a[i] == x {
            i += 1;
        }
        while j < b.len() && b[j] == x {
            j += 1;
        }
        let dist = (i as f64 / na - j as f64 / nb).abs();
        max_dist = max_dist.max(dist);
    }
    Ok(max_dist)
}

/// Per-parameter KS statistics between two ensembles
///
/// Parameters with too few values for a KS test get `None`.
pub fn ks_statistics(a: &Ensemble, b: &Ensemble) -> Result<Vec<Option<f64>>, Error> {
    if a.parameters() != b.parameters() {
        return Err(Error::InvalidInput(
            "cannot compare ensembles with different parameters".to_owned(),
        ));
    }
    (0..a.parameters().len())
        .into_par_iter()
        .map(|k| match ks_statistic(&a.column(k), &b.column(k)) {
            Ok(ks) => Ok(Some(ks)),
            Err(err @ Error::InsufficientData { .. }) => {
                warn!(
                    "Excluding {} from KS test: {err}",
                    &a.parameters()[k]
                );
                Ok(None)
            }
            Err(err) => Err(err),
        })
        .collect()
}

/// Relative reduction `1 - comparison/reference` of a standard deviation
///
/// The result is in `[0, 1]`. Increases, as well as a vanishing
/// reference, count as no reduction.
pub fn std_dev_reduction(reference: f64, comparison: f64) -> f64 {
    let reduction = 1. - comparison / reference;
    if reduction > 0. {
        reduction.min(1.)
    } else {
        0.
    }
}

/// Per-parameter standard deviation reductions
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reductions {
    values: Vec<f64>,
    n_clamped: usize,
}

impl Reductions {
    pub fn values(&self) -> &[f64] {
        self.values.as_slice()
    }

    /// Number of parameters whose standard deviation did not decrease
    pub fn n_clamped(&self) -> usize {
        self.n_clamped
    }
}

/// Standard deviation reductions of `comparison` relative to `reference`
pub fn reductions(reference: &MomentSet, comparison: &MomentSet) -> Result<Reductions, Error> {
    if reference.len() != comparison.len() {
        return Err(Error::InvalidInput(format!(
            "cannot compare moments of {} and {} parameters",
            reference.len(),
            comparison.len()
        )));
    }
    let mut n_clamped = 0;
    let values = reference
        .iter()
        .zip(comparison.iter())
        .map(|(r, c)| {
            if !(1. - c.std_dev / r.std_dev > 0.) {
                n_clamped += 1;
            }
            std_dev_reduction(r.std_dev, c.std_dev)
        })
        .collect();
    if n_clamped > 0 {
        debug!("{n_clamped} standard deviations did not decrease, set reduction to 0");
    }
    Ok(Reductions { values, n_clamped })
}

/// Indices of parameters passing both the KS and the reduction threshold
///
/// Both comparisons are strict. Parameters without KS statistic are
/// never selected.
pub fn select_constrained(
    ks_stats: &[Option<f64>],
    reductions: &[f64],
    ks_level: f64,
    reduction_level: f64,
) -> Result<Vec<usize>, Error> {
    if ks_stats.len() != reductions.len() {
        return Err(Error::InvalidInput(format!(
            "got {} KS statistics for {} reductions",
            ks_stats.len(),
            reductions.len()
        )));
    }
    let selected = ks_stats
        .iter()
        .zip(reductions)
        .enumerate()
        .filter_map(|(idx, (ks, red))| match ks {
            Some(ks) if *ks > ks_level && *red > reduction_level => Some(idx),
            _ => None,
        })
        .collect();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::{ParameterSet, SampleBuilder};
    use crate::moments::compute_moments;
    use proptest::prelude::*;

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn ks() {
        let a = [1., 2., 3., 4.];
        assert_eq!(ks_statistic(&a, &a).unwrap(), 0.);
        assert_eq!(ks_statistic(&a, &[10., 11.]).unwrap(), 1.);
        assert_eq!(ks_statistic(&a, &[3., 4., 5., 6.]).unwrap(), 0.5);
        // ties across the samples
        assert_eq!(ks_statistic(&[1., 1., 2., 2.], &[1., 2.]).unwrap(), 0.);
        assert_eq!(ks_statistic(&[1., 2.], &[2., 2., 2., 2.]).unwrap(), 0.5);
        assert_eq!(
            ks_statistic(&[1.], &a),
            Err(Error::InsufficientData { needed: 2, got: 1 })
        );
        assert!(matches!(
            ks_statistic(&[1., f64::NAN], &a),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn ks_per_parameter() {
        log_init();

        let params = ParameterSet::new(["a", "b"]).unwrap();
        let make = |values: &[[f64; 2]]| {
            let samples = values
                .iter()
                .enumerate()
                .map(|(id, v)| {
                    let mut b = SampleBuilder::new(id);
                    b.values(v.to_vec());
                    b.build()
                })
                .collect();
            Ensemble::new(params.clone(), samples).unwrap()
        };
        let prior = make(&[[1., 0.], [2., 0.], [3., 1.], [4., 1.]]);
        let unw = make(&[[1., 0.], [1., 1.], [2., 1.], [2., 1.]]);
        let ks = ks_statistics(&prior, &unw).unwrap();
        assert_eq!(ks, vec![Some(0.5), Some(0.25)]);

        let single = make(&[[1., 0.]]);
        assert_eq!(ks_statistics(&prior, &single).unwrap(), vec![None, None]);
    }

    #[test]
    fn reduction() {
        assert_eq!(std_dev_reduction(2., 1.), 0.5);
        assert_eq!(std_dev_reduction(2., 3.), 0.);
        assert_eq!(std_dev_reduction(0., 0.), 0.);
        assert_eq!(std_dev_reduction(0., 1.), 0.);
        assert_eq!(std_dev_reduction(1., 0.), 1.);
    }

    #[test]
    fn reductions_clamped() {
        let make = |values: &[[f64; 2]]| {
            let samples: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(id, v)| {
                    let mut b = SampleBuilder::new(id);
                    b.values(v.to_vec());
                    b.build()
                })
                .collect();
            compute_moments(&samples, None).unwrap()
        };
        let reference = make(&[[0., 0.], [2., 1.]]);
        let comparison = make(&[[0., 0.], [1., 2.]]);
        let red = reductions(&reference, &comparison).unwrap();
        assert_eq!(red.values(), &[0.5, 0.]);
        assert_eq!(red.n_clamped(), 1);
    }

    #[test]
    fn selection() {
        let ks = [Some(0.3), Some(0.1), None, Some(0.5), Some(0.2)];
        let red = [0.5, 0.9, 0.9, 0.2, 0.4];
        assert_eq!(select_constrained(&ks, &red, 0.2, 0.3).unwrap(), vec![0]);
        assert_eq!(
            select_constrained(&ks, &red, 0.0, 0.0).unwrap(),
            vec![0, 1, 3, 4]
        );
        assert!(select_constrained(&ks, &red[..2], 0.2, 0.3).is_err());
    }

    proptest! {
        #[test]
        fn reduction_bounds(reference in 0.0..1e3f64, comparison in 0.0..1e3f64) {
            let red = std_dev_reduction(reference, comparison);
            prop_assert!((0. ..=1.).contains(&red));
        }

        #[test]
        fn ks_self(values in prop::collection::vec(-1e3..1e3f64, 2..100)) {
            prop_assert_eq!(ks_statistic(&values, &values).unwrap(), 0.);
        }

        #[test]
        fn ks_bounds(
            a in prop::collection::vec(-10.0..10.0f64, 2..50),
            b in prop::collection::vec(-10.0..10.0f64, 2..50),
        ) {
            let ks = ks_statistic(&a, &b).unwrap();
            prop_assert!((0. ..=1.).contains(&ks));
        }
    }
}
