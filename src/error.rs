use std::fmt::{self, Display};

use thiserror::Error;

/// Where a numerical problem was encountered
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    /// The parameter with the given index
    Parameter(usize),
    /// The sample with the given index
    Sample(usize),
    /// The ensemble as a whole
    Ensemble,
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Parameter(idx) => write!(f, "parameter {idx}"),
            Location::Sample(idx) => write!(f, "sample {idx}"),
            Location::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// Errors of the reweighting core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed or out-of-domain likelihood or parameter data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Negative variance, vanishing normalisation, ...
    #[error("Numerical error for {location}: {reason}")]
    Numeric {
        location: Location,
        reason: String,
    },
    /// A normalisation or sum rule does not hold
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    /// Too few values for a statistical test
    #[error("Insufficient data: need at least {needed} values, got {got}")]
    InsufficientData {
        needed: usize,
        got: usize,
    },
}

impl Error {
    pub(crate) fn numeric(location: Location, reason: impl Into<String>) -> Self {
        Self::Numeric {
            location,
            reason: reason.into(),
        }
    }
}
