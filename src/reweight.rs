use std::convert::From;

use itertools::Itertools;
use log::{debug, info};
use noisy_float::prelude::*;
use thiserror::Error;

use crate::config::Config;
use crate::ensemble::{Ensemble, ParameterSet};
use crate::error::Error;
use crate::moments::{compute_moments, compute_moments_with_dof, MomentSet};
use crate::traits::*;
use crate::unweight::UnweightedEnsemble;
use crate::validation::{ks_statistics, reductions, select_constrained, Reductions};
use crate::weights::{compute_weights, effective_sample_size, target_size, Weights};

#[derive(Clone, PartialEq, Debug)]
pub struct ReweighterBuilder<L, U, R, W> {
    pub loader: L,
    pub unweighter: U,
    pub reporter: R,
    pub writer: W,
    pub config: Config,
}

impl<L, U, R, W> ReweighterBuilder<L, U, R, W> {
    pub fn build(self) -> Reweighter<L, U, R, W> {
        Reweighter {
            loader: self.loader,
            unweighter: self.unweighter,
            reporter: self.reporter,
            writer: self.writer,
            config: self.config,
        }
    }
}

impl<L, U, R, W> From<Reweighter<L, U, R, W>> for ReweighterBuilder<L, U, R, W> {
    fn from(r: Reweighter<L, U, R, W>) -> Self {
        ReweighterBuilder {
            loader: r.loader,
            unweighter: r.unweighter,
            reporter: r.reporter,
            writer: r.writer,
            config: r.config,
        }
    }
}

/// Reweighting and unweighting of a prior ensemble
///
/// The steps performed by [run](Reweighter::run) are
///
/// 1. Load the prior ensemble together with the likelihoods of its
///    samples for the new data.
/// 2. Compute normalised weights and the effective sample size.
/// 3. Compute reweighted moments.
/// 4. Unweight to `floor(N_eff)` samples and compute their moments.
/// 5. Compute KS statistics between the prior and the unweighted ensemble.
/// 6. Load the posterior ensemble and compute standard deviation reductions.
/// 7. Select the constrained parameters.
/// 8. Hand the results to the reporter and the writer.
#[derive(Clone, PartialEq, Debug)]
pub struct Reweighter<L, U, R, W> {
    loader: L,
    unweighter: U,
    reporter: R,
    writer: W,
    config: Config,
}

impl<L, U, R, W> From<ReweighterBuilder<L, U, R, W>> for Reweighter<L, U, R, W> {
    fn from(b: ReweighterBuilder<L, U, R, W>) -> Self {
        b.build()
    }
}

#[derive(Debug, Error)]
pub enum ReweightError<E1, E2, E3, E4> {
    #[error("Failed to load ensemble `{0}`: {1}")]
    LoadErr(String, E1),
    #[error("{0}")]
    StatsErr(#[from] Error),
    #[error("Unweighting error: {0}")]
    UnweightErr(E2),
    #[error("Failed to report results: {0}")]
    ReportErr(E3),
    #[error("Failed to write unweighted ensemble: {0}")]
    WriteErr(E4),
}

/// Standard deviations and KS statistic of a constrained parameter
#[derive(Clone, Debug, PartialEq)]
pub struct Constrained {
    pub name: String,
    pub prior_std_dev: f64,
    pub posterior_std_dev: f64,
    pub reweighted_std_dev: f64,
    pub unweighted_std_dev: f64,
    pub ks: f64,
}

/// Results of a reweighting run
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub parameters: ParameterSet,
    pub weights: Weights,
    pub n_eff: f64,
    pub prior_moments: MomentSet,
    pub posterior_moments: MomentSet,
    pub reweighted_moments: MomentSet,
    pub unweighted: UnweightedEnsemble,
    pub unweighted_moments: MomentSet,
    /// KS statistics between prior and unweighted ensemble,
    /// `None` where the test is undefined
    pub ks_stats: Vec<Option<f64>>,
    /// Reduction of posterior relative to prior standard deviations
    pub posterior_reduction: Reductions,
    /// Reduction of reweighted relative to prior standard deviations
    pub reweighted_reduction: Reductions,
    /// Indices of the constrained parameters
    pub constrained: Vec<usize>,
}

impl Outcome {
    pub fn constrained(&self) -> Vec<Constrained> {
        self.constrained
            .iter()
            .map(|&k| Constrained {
                name: self.parameters[k].to_owned(),
                prior_std_dev: self.prior_moments[k].std_dev,
                posterior_std_dev: self.posterior_moments[k].std_dev,
                reweighted_std_dev: self.reweighted_moments[k].std_dev,
                unweighted_std_dev: self.unweighted_moments[k].std_dev,
                ks: self.ks_stats[k].unwrap_or(f64::NAN),
            })
            .collect()
    }
}

fn check_size(ensemble: &Ensemble, name: &str, n_reps: usize) -> Result<(), Error> {
    if ensemble.len() != n_reps {
        return Err(Error::InvalidInput(format!(
            "ensemble `{name}` has {} samples, expected {n_reps}",
            ensemble.len()
        )));
    }
    Ok(())
}

impl<L, U, R, W> Reweighter<L, U, R, W>
where
    L: LoadEnsemble,
    U: Unweight,
    R: Report,
    W: Write,
{
    pub fn run(&mut self) -> Result<Outcome, ReweightError<L::Error, U::Error, R::Error, W::Error>> {
        use ReweightError::*;

        let config = &self.config;
        config.validate()?;
        debug!("settings: {config:#?}");

        let prior = self
            .loader
            .load(&config.prior, Some(&config.posterior))
            .map_err(|err| LoadErr(config.prior.clone(), err))?;
        check_size(&prior, &config.prior, config.n_reps)?;
        info!(
            "Read {} samples with {} parameters from `{}`",
            prior.len(),
            prior.parameters().len(),
            config.prior
        );
        let prior_moments = compute_moments(prior.samples(), None)?;

        let likelihoods = prior.likelihoods()?;
        let lowest_chi2 = likelihoods
            .iter()
            .map(|l| n64(l.chi2_normalised))
            .sorted()
            .take(5)
            .map(|c| format!("{:.2}", c.raw()))
            .join(", ");
        info!("Lowest normalised χ²: {lowest_chi2}");

        let weights = compute_weights(&likelihoods, config.scaling_factor)?;
        info!("Highest weights: {:.2?}", weights.largest(5));
        let n_eff = effective_sample_size(weights.as_slice())?;
        let reweighted_moments = compute_moments(prior.samples(), Some(weights.as_slice()))?;

        let target = target_size(n_eff);
        let unweighted = self
            .unweighter
            .unweight(&prior, &weights, target)
            .map_err(UnweightErr)?;
        let unweighted_moments =
            compute_moments_with_dof(unweighted.samples(), None, n_eff - 1.)?;
        let ks_stats = ks_statistics(&prior, unweighted.ensemble())?;

        let posterior = self
            .loader
            .load(&config.posterior, None)
            .map_err(|err| LoadErr(config.posterior.clone(), err))?;
        check_size(&posterior, &config.posterior, config.n_reps)?;
        if posterior.parameters() != prior.parameters() {
            return Err(Error::InvalidInput(format!(
                "parameters of `{}` and `{}` differ",
                config.prior, config.posterior
            ))
            .into());
        }
        let posterior_moments = compute_moments(posterior.samples(), None)?;

        let posterior_reduction = reductions(&prior_moments, &posterior_moments)?;
        let reweighted_reduction = reductions(&prior_moments, &reweighted_moments)?;
        info!(
            "Standard deviation increased for {} parameters in the posterior, {} after reweighting",
            posterior_reduction.n_clamped(),
            reweighted_reduction.n_clamped()
        );
        let constrained = select_constrained(
            &ks_stats,
            posterior_reduction.values(),
            config.ks_level,
            config.reduction_level,
        )?;
        info!(
            "{} of {} parameters are constrained",
            constrained.len(),
            prior.parameters().len()
        );

        let outcome = Outcome {
            parameters: prior.parameters().clone(),
            weights,
            n_eff,
            prior_moments,
            posterior_moments,
            reweighted_moments,
            unweighted,
            unweighted_moments,
            ks_stats,
            posterior_reduction,
            reweighted_reduction,
            constrained,
        };
        self.reporter.report(&outcome).map_err(ReportErr)?;
        self.writer.write(&outcome.unweighted).map_err(WriteErr)?;
        Ok(outcome)
    }
}
