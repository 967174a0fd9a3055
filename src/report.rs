use std::io;

use itertools::Itertools;

use crate::reweight::{Constrained, Outcome};
use crate::traits::Report;

const HEADERS: [&str; 6] = [
    "operator",
    "prior st dev",
    "poster st dev",
    "rw st dev",
    "unw st dev",
    "KS stat",
];

fn row(c: &Constrained) -> [String; 6] {
    [
        c.name.clone(),
        format!("{:.2}", c.prior_std_dev),
        format!("{:.2}", c.posterior_std_dev),
        format!("{:.2}", c.reweighted_std_dev),
        format!("{:.2}", c.unweighted_std_dev),
        format!("{:.2}", c.ks),
    ]
}

/// Markdown table of the constrained parameters
///
/// The first column is left-aligned, all others are right-aligned.
pub fn constrained_table(constrained: &[Constrained]) -> String {
    let rows: Vec<_> = constrained.iter().map(row).collect();
    let widths: Vec<_> = HEADERS
        .iter()
        .enumerate()
        .map(|(col, h)| {
            rows.iter()
                .map(|r| r[col].chars().count())
                .fold(h.chars().count(), usize::max)
        })
        .collect();
    let format_row = |cells: &[String]| {
        let cells = cells.iter().zip(&widths).enumerate().map(|(col, (cell, &w))| {
            if col == 0 {
                format!(" {cell:<w$} ")
            } else {
                format!(" {cell:>w$} ")
            }
        });
        format!("|{}|", cells.format("|"))
    };
    let headers = HEADERS.map(|h| h.to_owned());
    let separator = format!(
        "|{}|",
        widths.iter().map(|w| "-".repeat(w + 2)).format("|")
    );
    std::iter::once(format_row(&headers[..]))
        .chain(std::iter::once(separator))
        .chain(rows.iter().map(|r| format_row(&r[..])))
        .join("\n")
}

/// Print a table of constrained parameters
#[derive(Debug)]
pub struct TableReporter<W> {
    out: W,
}

impl<W: io::Write> TableReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> Report for TableReporter<W> {
    type Error = io::Error;

    fn report(&mut self, outcome: &Outcome) -> Result<(), Self::Error> {
        writeln!(self.out, "\n\t\t\t     +--------------------------------+")?;
        writeln!(self.out, "\t\t\t --- | Table of constrained operators | ---")?;
        writeln!(self.out, "\t\t\t     +--------------------------------+\n")?;
        writeln!(self.out, "{}", constrained_table(&outcome.constrained()))?;
        self.out.flush()
    }
}

pub struct NoReport {}
impl Report for NoReport {
    type Error = std::convert::Infallible;

    fn report(&mut self, _outcome: &Outcome) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub const NO_REPORT: NoReport = NoReport {};
