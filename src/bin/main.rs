mod opt;

use std::io;

use crate::opt::Opt;

use anyhow::{Context, Result};
use bayesrw::{prelude::*, GIT_BRANCH, GIT_REV, VERSION};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args);

    let env = Env::default().filter_or("BAYESRW_LOG", &opt.loglevel);
    env_logger::init_from_env(env);

    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build_global()?;

    if let (Some(rev), Some(branch)) = (GIT_REV, GIT_BRANCH) {
        info!("bayesrw {VERSION} rev {rev} ({branch})");
    } else {
        info!("bayesrw {VERSION}");
    }

    debug!("settings: {:#?}", opt);
    let config = opt.to_config()?;

    let loader = FileLoader::new(&opt.indir, config.n_reps);
    let writer = UnweightedWriter::builder().outdir(opt.outdir).build();

    let mut reweighter = ReweighterBuilder {
        loader,
        unweighter: Unweighter::new(),
        reporter: TableReporter::new(io::stdout()),
        writer,
        config,
    }
    .build();
    reweighter.run()?;

    info!("done");
    Ok(())
}
