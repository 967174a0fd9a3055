use crate::ensemble::Ensemble;
use crate::reweight::Outcome;
use crate::unweight::UnweightedEnsemble;
use crate::weights::Weights;

/// Supply an ensemble by name
pub trait LoadEnsemble {
    type Error;

    /// Load the ensemble `name`
    ///
    /// If `likelihood` is given, each sample is augmented with the
    /// likelihood statistics of the data set with that name.
    fn load(&mut self, name: &str, likelihood: Option<&str>) -> Result<Ensemble, Self::Error>;
}

pub trait Unweight {
    type Error;

    fn unweight(
        &mut self,
        prior: &Ensemble,
        weights: &Weights,
        target: usize,
    ) -> Result<UnweightedEnsemble, Self::Error>;
}

pub trait Report {
    type Error;

    fn report(&mut self, outcome: &Outcome) -> Result<(), Self::Error>;
}

pub trait Write {
    type Error;

    fn write(&mut self, unweighted: &UnweightedEnsemble) -> Result<(), Self::Error>;
}
