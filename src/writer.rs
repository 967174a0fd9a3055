use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;

use itertools::Itertools;
use log::info;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::traits::Write;
use crate::unweight::UnweightedEnsemble;

/// Default name of the file with the unweighted coefficients
pub const UNWEIGHTED_FILENAME: &str = "unw_coeffs.txt";

/// Width of the centred parameter names in the header line
const NAME_WIDTH: usize = 11;

/// Write the unweighted samples as a whitespace-separated table
///
/// The header line has the parameter names, each centred in a field
/// of width 11. It is followed by one line per sample with the values
/// in `%10.5f` format.
pub fn write_unweighted<W: io::Write>(
    mut out: W,
    unweighted: &UnweightedEnsemble,
) -> io::Result<()> {
    let header = unweighted
        .parameters()
        .names()
        .iter()
        .map(|name| format!("{name:^NAME_WIDTH$}"))
        .join("");
    writeln!(out, "{header}")?;
    for sample in unweighted.samples() {
        let line = sample.values().iter().map(|v| format!("{v:10.5}")).join(" ");
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// Writes the unweighted ensemble into a file in an output directory
///
/// The directory is created if it does not exist.
#[derive(Clone, Debug, TypedBuilder)]
pub struct UnweightedWriter {
    #[builder(setter(into))]
    outdir: PathBuf,
    #[builder(default = PathBuf::from(UNWEIGHTED_FILENAME), setter(into))]
    filename: PathBuf,
}

impl UnweightedWriter {
    pub fn path(&self) -> PathBuf {
        self.outdir.join(&self.filename)
    }
}

impl Write for UnweightedWriter {
    type Error = WriteError;

    fn write(&mut self, unweighted: &UnweightedEnsemble) -> Result<(), Self::Error> {
        use WriteError::*;

        fs::create_dir_all(&self.outdir)
            .map_err(|err| CreateDir(self.outdir.clone(), err))?;
        let path = self.path();
        let file = File::create(&path).map_err(|err| CreateFile(path.clone(), err))?;
        write_unweighted(BufWriter::new(file), unweighted)
            .map_err(|err| Io(path.clone(), err))?;
        info!("Unweighted set saved in {path:?}");
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to create output directory {0:?}: {1}")]
    CreateDir(PathBuf, #[source] io::Error),
    #[error("Failed to create output file {0:?}: {1}")]
    CreateFile(PathBuf, #[source] io::Error),
    #[error("Failed to write to {0:?}: {1}")]
    Io(PathBuf, #[source] io::Error),
}

pub struct NoWrite {}
impl Write for NoWrite {
    type Error = std::convert::Infallible;

    fn write(&mut self, _unweighted: &UnweightedEnsemble) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub const NO_WRITE: NoWrite = NoWrite {};
