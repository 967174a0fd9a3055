//! `bayesrw` is a crate for Bayesian reweighting and unweighting of
//! ensembles of Wilson coefficient fits.
//!
//! A prior ensemble of coefficient samples is reweighted with the
//! likelihood of each sample for new data. The weighted ensemble is
//! then turned back into an unweighted one of size `floor(N_eff)` by
//! inverse-CDF resampling, and compared to a posterior ensemble
//! obtained from a full refit.
//!
//! # How to use
//!
//! Probably the best way to get started is to look at the demo in
//! `demos/minimal.rs`.
//!
//! ## Most relevant modules
//!
//! - [prelude] exports a list of the most relevant classes and objects
//! - [reweight] contains the main class and lists the steps that are performed
//! - [reader] loads ensembles from the on-disk replica layout
//! - [writer] for writing the unweighted ensemble to a file
//! - [weights], [moments], [unweight], and [validation] for the statistics
//!

/// Run settings
pub mod config;
/// Parameter sets, samples, and ensembles
pub mod ensemble;
/// Error taxonomy of the statistics core
pub mod error;
/// Mean, variance, and standard deviation per parameter
pub mod moments;
/// Most important exports
pub mod prelude;
/// Ensemble readers
pub mod reader;
/// Report constrained parameters
pub mod report;
pub mod reweight;
/// Common traits
pub mod traits;
/// Inverse-CDF unweighting
pub mod unweight;
/// Kolmogorov-Smirnov statistics and constrained parameter selection
pub mod validation;
/// Bayesian weights and effective sample size
pub mod weights;
/// Unweighted ensemble writer
pub mod writer;

mod util;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_REV: Option<&str> = option_env!("VERGEN_GIT_SHA");
pub const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
