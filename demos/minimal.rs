// minimal example for reweighting a prior ensemble
// run with `cargo run --release --example minimal -- INDIR PRIOR POSTERIOR NREPS`
// set the environment variable `RUST_LOG=info` for command-line output
use std::error::Error;

use bayesrw::prelude::*;

use env_logger;

fn main() -> Result<(), Box<dyn Error>> {
    // initialise logging from the RUST_LOG environment variable
    env_logger::init();

    // access command line arguments, ignoring the program name
    let mut args = std::env::args().skip(1);
    let (Some(indir), Some(prior), Some(posterior), Some(n_reps)) =
        (args.next(), args.next(), args.next(), args.next())
    else {
        return Err("usage: minimal INDIR PRIOR POSTERIOR NREPS".into());
    };
    let n_reps: usize = n_reps.parse()?;

    // Which ensembles to compare
    let config = ConfigBuilder::default()
        .prior(prior)
        .posterior(posterior)
        .n_reps(n_reps)
        .build()?;

    // How to read the ensembles
    let loader = FileLoader::new(indir, n_reps);

    let mut reweighter = ReweighterBuilder {
        loader,
        unweighter: Unweighter::new(),
        reporter: TableReporter::new(std::io::stdout()),
        writer: NO_WRITE, // don't save the unweighted ensemble
        config,
    }
    .build();
    // Run the reweighting
    let outcome = reweighter.run()?;
    println!("effective sample size: {:.1}", outcome.n_eff);
    Ok(())
}
