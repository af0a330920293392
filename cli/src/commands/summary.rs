//! `tillbed summary`: statistics of an ASCII grid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use engine::raster::Raster;
use engine::topology::BoundaryMode;
use tracing::info;

/// Arguments of `tillbed summary`.
#[derive(Args)]
pub struct SummaryArgs {
    /// ASCII grid to read
    pub grid: PathBuf,

    /// Treat the north-south axis as periodic
    #[arg(long)]
    pub periodic_ns: bool,

    /// Treat the east-west axis as periodic
    #[arg(long)]
    pub periodic_ew: bool,
}

fn mode(periodic: bool) -> BoundaryMode {
    if periodic {
        BoundaryMode::Periodic
    } else {
        BoundaryMode::NonPeriodic
    }
}

/// Execute `tillbed summary`.
pub fn execute(args: SummaryArgs) -> Result<()> {
    let r = Raster::read_ascii(&args.grid, mode(args.periodic_ns), mode(args.periodic_ew))
        .with_context(|| format!("reading {}", args.grid.display()))?;
    let s = r.summary();
    info!(ncols = r.xdim, nrows = r.ydim, cellsize = r.cellsize, "geometry");
    info!(mean = s.mean, min = s.min, max = s.max, nodata = s.nodata, sum = r.sum(), "values");

    let slope = r.slope_horn()?.summary();
    info!(mean = slope.mean, max = slope.max, "Horn slope (degrees)");
    let d8 = r.slope_d8()?.summary();
    info!(mean = d8.mean, max = d8.max, "D8 slope (degrees)");
    let relief = r.queens_mean()?;
    let rough: f64 = r
        .data()
        .iter()
        .zip(relief.data())
        .filter(|(v, m)| !r.is_nodata(**v) && !r.is_nodata(**m))
        .map(|(v, m)| (v - m).abs())
        .sum::<f64>()
        / (r.data().len() - s.nodata).max(1) as f64;
    info!(roughness = rough, "mean deviation from 3x3 neighbourhood");
    Ok(())
}
