pub use crate::{
    config::{Config, ConfigBuilder},
    ensemble::{Ensemble, ParameterSet},
    reader::FileLoader,
    report::{TableReporter, NO_REPORT},
    reweight::{Reweighter, ReweighterBuilder},
    traits::*,
    unweight::Unweighter,
    writer::{UnweightedWriter, NO_WRITE},
};
