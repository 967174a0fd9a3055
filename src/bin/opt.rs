use std::path::PathBuf;

use anyhow::{Context, Result};
use bayesrw::config::{Config, ConfigBuilder};
use clap::Parser;

#[derive(Debug, Default, Clone, Parser)]
pub(crate) struct ConfigOpt {
    /// Name of the prior ensemble.
    #[clap(long)]
    pub(crate) prior: Option<String>,

    /// Name of the posterior ensemble.
    ///
    /// The χ² values used to reweight the prior are read from the
    /// data set with the same name.
    #[clap(long)]
    pub(crate) posterior: Option<String>,

    /// Number of replicas in each ensemble.
    #[clap(short, long)]
    pub(crate) n_reps: Option<usize>,

    /// Minimum KS statistic for constrained operators.
    #[clap(long)]
    pub(crate) ks_level: Option<f64>,

    /// Minimum standard deviation reduction for constrained operators.
    #[clap(long)]
    pub(crate) reduction_level: Option<f64>,

    /// Scaling factor for the χ² in the weights.
    #[clap(long)]
    pub(crate) scaling_factor: Option<f64>,
}

#[derive(Debug, Parser)]
#[clap(about, author, version)]
pub(crate) struct Opt {
    /// Configuration file in YAML format.
    ///
    /// Settings given on the command line take precedence over the
    /// ones in the file.
    #[clap(long, short, value_parser)]
    pub(crate) config: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) settings: ConfigOpt,

    /// Input directory.
    ///
    /// Coefficients are read from `INDIR/wilson_coeffs` and χ² values
    /// from `INDIR/chi2_data`.
    #[clap(long, short, value_parser, default_value = "rw_input_data")]
    pub(crate) indir: PathBuf,

    /// Output directory.
    #[clap(long, short, value_parser, default_value = "rw_output")]
    pub(crate) outdir: PathBuf,

    /// Verbosity level
    #[clap(
        short,
        long,
        default_value = "Info",
        help = "Verbosity level.
Possible values with increasing amount of output are
'off', 'error', 'warn', 'info', 'debug', 'trace'.\n"
    )]
    pub(crate) loglevel: String,

    #[clap(
        short,
        long,
        default_value_t,
        help = "Number of threads.
If set to 0, a default number of threads is chosen.
The default can be set with the `RAYON_NUM_THREADS` environment
variable."
    )]
    pub(crate) threads: usize,
}

impl Opt {
    /// Combine the configuration file with the command line settings
    pub(crate) fn to_config(&self) -> Result<Config> {
        let mut builder = if let Some(file) = &self.config {
            let config = Config::from_yaml_file(file)?;
            ConfigBuilder::from(config)
        } else {
            ConfigBuilder::default()
        };
        let settings = self.settings.clone();
        if let Some(prior) = settings.prior {
            builder.prior(prior);
        }
        if let Some(posterior) = settings.posterior {
            builder.posterior(posterior);
        }
        if let Some(n_reps) = settings.n_reps {
            builder.n_reps(n_reps);
        }
        if let Some(ks_level) = settings.ks_level {
            builder.ks_level(ks_level);
        }
        if let Some(reduction_level) = settings.reduction_level {
            builder.reduction_level(reduction_level);
        }
        if let Some(scaling_factor) = settings.scaling_factor {
            builder.scaling_factor(scaling_factor);
        }
        let config = builder
            .build()
            .with_context(|| "Incomplete settings, use a configuration file or the command line options")?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn command_line_only() {
        let opt = Opt::parse_from([
            "bayesrw",
            "--prior",
            "NS_prior",
            "--posterior",
            "NS_new",
            "-n",
            "10",
        ]);
        let config = opt.to_config().unwrap();
        assert_eq!(config.prior, "NS_prior");
        assert_eq!(config.n_reps, 10);
        assert_eq!(config.scaling_factor, 1.);
        assert_eq!(opt.indir, PathBuf::from("rw_input_data"));

        let opt = Opt::parse_from(["bayesrw", "--prior", "NS_prior"]);
        assert!(opt.to_config().is_err());
    }

    #[test]
    fn override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prior: a\nposterior: b\nn_reps: 20\nks_level: 0.3").unwrap();
        let path = file.path().to_str().unwrap();
        let opt = Opt::parse_from(["bayesrw", "-c", path, "--ks-level", "0.1"]);
        let config = opt.to_config().unwrap();
        assert_eq!(config.prior, "a");
        assert_eq!(config.n_reps, 20);
        assert_eq!(config.ks_level, 0.1);
    }
}
