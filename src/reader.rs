use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::num::ParseFloatError;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::ensemble::{Ensemble, Likelihood, ParameterSet, SampleBuilder};
use crate::error::Error;
use crate::traits::LoadEnsemble;

/// Subdirectory with the coefficient ensembles
pub const COEFFICIENT_DIR: &str = "wilson_coeffs";
/// Subdirectory with the χ² data sets
pub const CHI2_DIR: &str = "chi2_data";

/// Path of the coefficients of replica `rep` (starting at 1) in an ensemble
pub fn coefficient_path(root: &Path, ensemble: &str, rep: usize) -> PathBuf {
    root.join(COEFFICIENT_DIR)
        .join(ensemble)
        .join(format!("SMEFT_coeffs_{rep}.txt"))
}

/// Path of the χ² of replica `rep` (starting at 1) for a data set
pub fn chi2_path(root: &Path, dataset: &str, rep: usize) -> PathBuf {
    root.join(CHI2_DIR)
        .join(dataset)
        .join(format!("x2_total_rep_{rep}.txt"))
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing {0}")]
    MissingLine(&'static str),
    #[error("Failed to parse `{0}` as number: {1}")]
    Number(String, #[source] ParseFloatError),
    #[error("Number of data points `{0}` is not a positive integer")]
    DataPoints(String),
    #[error("Expected {expected} values, found {found}")]
    ValueCount { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open {0:?}: {1}")]
    Open(PathBuf, #[source] io::Error),
    #[error("Failed to parse {0:?}: {1}")]
    Parse(PathBuf, #[source] ParseError),
    #[error("Parameters in {0:?} differ from the first replica")]
    ParameterMismatch(PathBuf),
    #[error(transparent)]
    Ensemble(#[from] Error),
}

fn next_line<R: BufRead>(reader: &mut R, what: &'static str) -> Result<String, ParseError> {
    loop {
        let mut buf = String::new();
        if reader.read_line(&mut buf)? == 0 {
            return Err(ParseError::MissingLine(what));
        }
        if !buf.trim().is_empty() {
            return Ok(buf);
        }
    }
}

fn parse_number(s: &str) -> Result<f64, ParseError> {
    s.parse().map_err(|err| ParseError::Number(s.to_owned(), err))
}

/// Parse the coefficients of one replica
///
/// The first line contains the tab-separated parameter names, the
/// second line the values. Anything after that (confidence levels) is
/// ignored.
pub fn parse_coefficients<R: BufRead>(mut reader: R) -> Result<(Vec<String>, Vec<f64>), ParseError> {
    let names: Vec<_> = next_line(&mut reader, "parameter names")?
        .split('\t')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned)
        .collect();
    let values: Vec<_> = next_line(&mut reader, "parameter values")?
        .split_whitespace()
        .map(parse_number)
        .collect::<Result<_, _>>()?;
    if values.len() != names.len() {
        return Err(ParseError::ValueCount {
            expected: names.len(),
            found: values.len(),
        });
    }
    Ok((names, values))
}

/// Parse the χ² statistics of one replica
///
/// After a header line, the first row holds the χ², the number of
/// data points, and the normalised χ².
pub fn parse_likelihood<R: BufRead>(mut reader: R) -> Result<Likelihood, ParseError> {
    next_line(&mut reader, "header")?;
    let line = next_line(&mut reader, "χ² data")?;
    let entries: Vec<_> = line.split_whitespace().collect();
    if entries.len() < 3 {
        return Err(ParseError::ValueCount {
            expected: 3,
            found: entries.len(),
        });
    }
    let chi2 = parse_number(entries[0])?;
    let ndat = parse_number(entries[1])?;
    if !(ndat >= 1.) || ndat.fract() != 0. || ndat > u32::MAX as f64 {
        return Err(ParseError::DataPoints(entries[1].to_owned()));
    }
    let chi2_normalised = parse_number(entries[2])?;
    Ok(Likelihood {
        chi2,
        n_datapoints: ndat as u32,
        chi2_normalised,
    })
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| LoadError::Open(path.to_owned(), err))
}

/// Load ensembles from one file per replica below a root directory
///
/// Coefficients are read from
/// `ROOT/wilson_coeffs/ENSEMBLE/SMEFT_coeffs_<i>.txt`, χ² data from
/// `ROOT/chi2_data/DATASET/x2_total_rep_<i>.txt` for replicas `i = 1..=n_reps`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileLoader {
    root: PathBuf,
    n_reps: usize,
}

impl FileLoader {
    pub fn new<P: Into<PathBuf>>(root: P, n_reps: usize) -> Self {
        Self {
            root: root.into(),
            n_reps,
        }
    }
}

impl LoadEnsemble for FileLoader {
    type Error = LoadError;

    fn load(&mut self, name: &str, likelihood: Option<&str>) -> Result<Ensemble, Self::Error> {
        let mut parameters = None;
        let mut samples = Vec::with_capacity(self.n_reps);
        for rep in 1..=self.n_reps {
            let path = coefficient_path(&self.root, name, rep);
            debug!("Reading {path:?}");
            let (names, values) =
                parse_coefficients(open(&path)?).map_err(|err| LoadError::Parse(path.clone(), err))?;
            match &parameters {
                None => parameters = Some(ParameterSet::new(names)?),
                Some(p) => {
                    if p.names() != names.as_slice() {
                        return Err(LoadError::ParameterMismatch(path));
                    }
                }
            }
            let mut sample = SampleBuilder::new(rep - 1);
            sample.values(values);
            if let Some(dataset) = likelihood {
                let path = chi2_path(&self.root, dataset, rep);
                debug!("Reading {path:?}");
                let ll = parse_likelihood(open(&path)?)
                    .map_err(|err| LoadError::Parse(path.clone(), err))?;
                sample.likelihood(ll);
            }
            samples.push(sample.build());
        }
        let ensemble = Ensemble::new(parameters.unwrap_or_default(), samples)?;
        Ok(ensemble)
    }
}
