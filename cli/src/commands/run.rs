//! `tillbed run`: drive a simulation to completion.

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Args;
use engine::progress::RscriptPlotter;
use engine::snapshots::FileSink;
use engine::{BedModel, SimParams};
use tracing::{debug, info};

use crate::timeprinter::TimePrinter;

/// Arguments of `tillbed run`.
#[derive(Args)]
pub struct RunArgs {
    /// Simfile describing the run
    pub simfile: PathBuf,

    /// Seed for the random source (overrides the simfile `seed` key)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Check physical invariants after every step
    #[arg(long)]
    pub check: bool,

    /// Log plotting utility failures instead of stopping the run
    #[arg(long)]
    pub lenient_plots: bool,
}

/// Execute `tillbed run`.
pub fn execute(args: RunArgs) -> Result<()> {
    let mut params = SimParams::from_path(&args.simfile)
        .with_context(|| format!("loading simfile {}", args.simfile.display()))?;
    params.check_state |= args.check;
    debug!(?params, "simfile values");

    let seed = args.seed.or(params.seed).unwrap_or_else(clock_seed);
    let max_iterations = params.max_iterations;
    info!(simfile = %args.simfile.display(), seed, max_iterations, "starting run");

    let plotter = RscriptPlotter::new(params.progress.clone(), params.output_prefix.clone(), params.ydim, params.xdim)
        .lenient(args.lenient_plots);
    let mut sink = FileSink::with_plotter(&params.output_prefix, plotter)?;
    let mut model = BedModel::new(params, seed)?;

    let start = Instant::now();
    let mut printer = TimePrinter::new(max_iterations);
    for t in 0..max_iterations {
        model.run(t, &mut sink).with_context(|| format!("timestep {t}"))?;
        printer.tick();
    }
    model.finalize(max_iterations, &mut sink)?;

    info!(elapsed_s = start.elapsed().as_secs_f64(), ledger = %sink.status_path().display(), "run complete");
    Ok(())
}

/// Seed from the wall clock, for runs that do not pin one.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
