//! Output collaborators: model-state rasters, the status ledger and plotting.
//!
//! The engine talks to all three through [`OutputSink`]. [`FileSink`] writes ASCII grids
//! named `{prefix}_{field}_{t}.asc` and appends one CSV row per report to `kinematics.csv`
//! next to them. [`MemorySink`] keeps everything in memory.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::SimParams;
use crate::error::{EngineError, Result};
use crate::ledger::StatusReport;
use crate::progress::{PlotRequest, RscriptPlotter};
use crate::raster::Raster;

/// File name of the status ledger.
pub const STATUS_FILE: &str = "kinematics.csv";

/// Borrowed view of the grids written at each snapshot.
pub struct StateView<'a> {
    /// Sediment surface.
    pub surf: &'a Raster,
    /// Basal pressure.
    pub basal_pres: &'a Raster,
    /// Ice base elevation.
    pub ice: &'a Raster,
    /// Sediment carried in the ice.
    pub iceload: &'a Raster,
    /// Basement.
    pub bsmt: &'a Raster,
}

impl<'a> StateView<'a> {
    /// `(field name, raster)` pairs in output order.
    pub fn fields(&self) -> [(&'static str, &'a Raster); 5] {
        [
            ("surf", self.surf),
            ("pres", self.basal_pres),
            ("ice", self.ice),
            ("iceload", self.iceload),
            ("bsmt", self.bsmt),
        ]
    }
}

/// Receiver for everything the engine reports.
pub trait OutputSink {
    /// Persist the model state at `step`.
    fn write_state(&mut self, step: u64, state: &StateView<'_>) -> Result<()>;
    /// Record one row of statistics.
    fn push_status(&mut self, report: &StatusReport) -> Result<()>;
    /// Run the plotting utility.
    fn plot(&mut self, request: PlotRequest) -> Result<()>;
}

/// File name for one snapshot field.
pub fn state_file_name(prefix: &str, field: &str, step: u64) -> String {
    format!("{prefix}_{field}_{step}.asc")
}

/// Writes rasters and the ledger to disk and delegates plotting to R.
#[derive(Debug)]
pub struct FileSink {
    prefix: String,
    status_path: PathBuf,
    plotter: RscriptPlotter,
}

impl FileSink {
    /// Create the sink for `params` and start a fresh ledger with its header row.
    pub fn create(params: &SimParams) -> Result<Self> {
        let plotter =
            RscriptPlotter::new(params.progress.clone(), params.output_prefix.clone(), params.ydim, params.xdim);
        Self::with_plotter(&params.output_prefix, plotter)
    }

    /// Create the sink with an explicit plotter.
    pub fn with_plotter(prefix: &str, plotter: RscriptPlotter) -> Result<Self> {
        let dir = Path::new(prefix).parent().unwrap_or_else(|| Path::new(""));
        let status_path = dir.join(STATUS_FILE);
        let mut f = File::create(&status_path).map_err(|e| EngineError::io(&status_path, e))?;
        writeln!(f, "{}", StatusReport::csv_header()).map_err(|e| EngineError::io(&status_path, e))?;
        info!(path = %status_path.display(), "status ledger created");
        Ok(Self { prefix: prefix.to_owned(), status_path, plotter })
    }

    /// Path of the status ledger.
    pub fn status_path(&self) -> &Path {
        &self.status_path
    }
}

impl OutputSink for FileSink {
    fn write_state(&mut self, step: u64, state: &StateView<'_>) -> Result<()> {
        for (field, raster) in state.fields() {
            raster.write_ascii(state_file_name(&self.prefix, field, step))?;
        }
        Ok(())
    }

    fn push_status(&mut self, report: &StatusReport) -> Result<()> {
        let path = &self.status_path;
        let mut f = OpenOptions::new().append(true).open(path).map_err(|e| EngineError::io(path, e))?;
        writeln!(f, "{}", report.csv_row()).map_err(|e| EngineError::io(path, e))
    }

    fn plot(&mut self, request: PlotRequest) -> Result<()> {
        self.plotter.plot(request)
    }
}

/// Keeps snapshots, reports and plot requests in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Step and surface values of every snapshot.
    pub states: Vec<(u64, Vec<f64>)>,
    /// Every status report in order.
    pub reports: Vec<StatusReport>,
    /// Every plot request in order.
    pub plots: Vec<PlotRequest>,
}

impl OutputSink for MemorySink {
    fn write_state(&mut self, step: u64, state: &StateView<'_>) -> Result<()> {
        self.states.push((step, state.surf.data().to_vec()));
        Ok(())
    }

    fn push_status(&mut self, report: &StatusReport) -> Result<()> {
        self.reports.push(*report);
        Ok(())
    }

    fn plot(&mut self, request: PlotRequest) -> Result<()> {
        self.plots.push(request);
        Ok(())
    }
}
