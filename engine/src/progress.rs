//! External progress-plotting utility.
//!
//! The utility is an R script run as `Rscript <utility> <prefix> <ydim> <xdim> <t>`, where
//! `t` is the step index, `-1` for "produce all images now" or `-2` for "final analyses".

use std::process::Command;

use tracing::{debug, warn};

use crate::config::ProgressParams;
use crate::error::{EngineError, Result};

/// Stray PDF that R leaves in the working directory.
const R_DEFAULT_DEVICE_FILE: &str = "Rplots.pdf";

/// What the plotting utility should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotRequest {
    /// Images for the snapshot taken at this step.
    Step(u64),
    /// Every image, at the end of a run without on-the-fly plotting.
    AllImages,
    /// Final summary analyses.
    FinalAnalyses,
}

impl PlotRequest {
    /// Integer passed on the command line.
    pub fn code(self) -> i64 {
        match self {
            Self::Step(t) => i64::try_from(t).unwrap_or(i64::MAX),
            Self::AllImages => -1,
            Self::FinalAnalyses => -2,
        }
    }
}

/// Runs the configured R script.
#[derive(Clone, Debug)]
pub struct RscriptPlotter {
    params: ProgressParams,
    prefix: String,
    ydim: usize,
    xdim: usize,
    lenient: bool,
}

impl RscriptPlotter {
    /// Plotter for a run with the given output prefix and grid size.
    pub fn new(params: ProgressParams, prefix: impl Into<String>, ydim: usize, xdim: usize) -> Self {
        Self { params, prefix: prefix.into(), ydim, xdim, lenient: false }
    }

    /// Downgrade utility failures to warnings.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Program and arguments for `req`, or `None` when plotting is disabled.
    pub fn command_line(&self, req: PlotRequest) -> Option<(String, Vec<String>)> {
        if !self.params.enabled() {
            return None;
        }
        let args = vec![
            self.params.utility_name.clone(),
            self.prefix.clone(),
            self.ydim.to_string(),
            self.xdim.to_string(),
            req.code().to_string(),
        ];
        Some((self.params.rscript_path.clone(), args))
    }

    /// Run the utility for `req`. A missing interpreter or script skips silently.
    pub fn plot(&self, req: PlotRequest) -> Result<()> {
        let Some((program, args)) = self.command_line(req) else {
            debug!(?req, "progress utility not configured; skipping");
            return Ok(());
        };
        let command = format!("{program} {}", args.join(" "));
        let outcome = match Command::new(&program).args(&args).status() {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(format!("exited with {status}")),
            Err(e) => Err(format!("could not start: {e}")),
        };
        // Ignore the error: the file only exists when R opened its default device.
        let _ = std::fs::remove_file(R_DEFAULT_DEVICE_FILE);
        match outcome {
            Ok(()) => Ok(()),
            Err(reason) if self.lenient => {
                warn!(%command, %reason, "progress utility failed");
                Ok(())
            }
            Err(reason) => Err(EngineError::Progress { command, reason }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_codes() {
        assert_eq!(PlotRequest::Step(40).code(), 40);
        assert_eq!(PlotRequest::AllImages.code(), -1);
        assert_eq!(PlotRequest::FinalAnalyses.code(), -2);
    }

    #[test]
    fn disabled_without_script() {
        let p = ProgressParams { rscript_path: "Rscript".into(), ..Default::default() };
        let plotter = RscriptPlotter::new(p, "out", 3, 4);
        assert!(plotter.command_line(PlotRequest::AllImages).is_none());
        assert!(plotter.plot(PlotRequest::AllImages).is_ok());
    }

    #[test]
    fn command_line_order() {
        let p = ProgressParams {
            rscript_path: "Rscript".into(),
            utility_name: "progress.R".into(),
            on_the_fly: false,
        };
        let plotter = RscriptPlotter::new(p, "run1", 3, 4);
        let (prog, args) = plotter.command_line(PlotRequest::FinalAnalyses).unwrap_or_default();
        assert_eq!(prog, "Rscript");
        assert_eq!(args, ["progress.R", "run1", "3", "4", "-2"]);
    }
}
