//! `tillbed validate`: parse and check a simfile.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use engine::config::InitMode;
use engine::SimParams;
use tracing::info;

/// Arguments of `tillbed validate`.
#[derive(Args)]
pub struct ValidateArgs {
    /// Simfile to check
    pub simfile: PathBuf,
}

/// Execute `tillbed validate`.
pub fn execute(args: ValidateArgs) -> Result<()> {
    let p = SimParams::from_path(&args.simfile)
        .with_context(|| format!("validating simfile {}", args.simfile.display()))?;

    info!(ydim = p.ydim, xdim = p.xdim, cellsize = p.cellsize, "grid");
    info!(ns = %p.boundaries_ns, ew = %p.boundaries_ew, "boundaries");
    info!(courant = p.courant(), len_timestep = p.len_timestep, max_iterations = p.max_iterations, "time stepping");
    match &p.init {
        InitMode::Flat { basement_elev, sedfill_elev, .. } => {
            info!(basement_elev, sedfill_elev, "flat initial condition")
        }
        InitMode::Existing { surf_file, bsmt_file, erodibility_file } => info!(
            surf = %surf_file.display(),
            bsmt = %bsmt_file.display(),
            erodibility = %erodibility_file.display(),
            "initial condition from grids"
        ),
    }
    info!(enabled = p.progress.enabled(), on_the_fly = p.progress.on_the_fly, "progress plotting");
    info!("simfile ok");
    Ok(())
}
