//! The bed model: co-registered grids and the per-timestep pipeline.
//!
//! One call to [`BedModel::run`] advances the bed one timestep through, in order:
//! 1) ice advection with pressure/contact resolution,
//! 2) an optional snapshot,
//! 3) sediment squish in a freshly shuffled visitation order,
//! 4) advection/entrainment exchange into pending-change buffers,
//! 5) basal abrasion,
//! 6) commit of the pending changes,
//! 7) surface and ice-load bleed,
//! 8) ice settling onto any surface that rose above it.
//!
//! Squish mutates shared state cell by cell and must stay single-writer; every other phase
//! reads the previous state only, through the `n_*`/`d*` buffers.

mod abrasion;
mod bleed;
mod exchange;
mod ice;
mod squish;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::{InitMode, SimParams};
use crate::error::{EngineError, Result};
use crate::ledger::{MassInventory, PhaseTotals, StatusReport};
use crate::progress::PlotRequest;
use crate::raster::Raster;
use crate::snapshots::{OutputSink, StateView};
use crate::topology::Topology;
use crate::visitation::Visitation;

/// Absolute slack allowed by [`BedModel::check_state`].
const STATE_TOLERANCE: f64 = 1.0e-8;

/// Lifecycle of a model. Construction performs initialisation, so a model is never
/// observable uninitialised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelState {
    /// Initialised, no step taken.
    Ready,
    /// At least one step taken.
    Running,
    /// Final output flushed; no further steps allowed.
    Finalized,
}

/// Grids, parameters and random source of one simulation.
pub struct BedModel {
    params: SimParams,
    topo: Arc<Topology>,
    rng: StdRng,
    seed: u64,
    visit: Visitation,
    state: ModelState,
    basal_pres_fudge: f64,
    /// Fluxes of the step in progress.
    step_totals: PhaseTotals,
    /// Fluxes since the last status report.
    period_totals: PhaseTotals,

    /// Ice base elevation.
    pub ice: Raster,
    /// Sediment surface elevation.
    pub surf: Raster,
    /// Basement rock elevation.
    pub bsmt: Raster,
    /// Basal pressure.
    pub basal_pres: Raster,
    /// Basal deformation this step.
    pub basal_def: Raster,
    /// 1 where ice touches the bed, 0 under a cavity.
    pub contact: Raster,
    /// Sediment carried in the ice.
    pub iceload: Raster,
    /// Local basement erodibility.
    pub erodibility: Raster,
    /// Zero-pressure ice elevation of this step.
    pub zero_elev: Raster,
    /// Pending surface change.
    pub dsurf: Raster,
    /// Pending ice-load change.
    pub diceload: Raster,
    n_ice: Raster,
    n_iceload: Raster,
}

impl BedModel {
    /// Validate `params`, allocate every grid and apply the initial condition.
    pub fn new(params: SimParams, seed: u64) -> Result<Self> {
        params.validate()?;
        let topo = Arc::new(Topology::new(params.ydim, params.xdim, params.boundaries_ns, params.boundaries_ew)?);
        let grid = || Raster::new(topo.clone(), params.xll_corner, params.yll_corner, params.cellsize);

        let mut rng = StdRng::seed_from_u64(seed);
        let visit = Visitation::new(params.ydim, params.xdim, &mut rng)?;

        let mut m = Self {
            ice: grid()?,
            surf: grid()?,
            bsmt: grid()?,
            basal_pres: grid()?,
            basal_def: grid()?,
            contact: grid()?,
            iceload: grid()?,
            erodibility: grid()?,
            zero_elev: grid()?,
            dsurf: grid()?,
            diceload: grid()?,
            n_ice: grid()?,
            n_iceload: grid()?,
            basal_pres_fudge: 1.0e-12 * params.global_basal_pres,
            step_totals: PhaseTotals::default(),
            period_totals: PhaseTotals::default(),
            state: ModelState::Ready,
            visit,
            rng,
            seed,
            topo,
            params,
        };
        m.initial_condition()?;
        info!(
            ydim = m.params.ydim,
            xdim = m.params.xdim,
            seed,
            ns = %m.params.boundaries_ns,
            ew = %m.params.boundaries_ew,
            "bed model initialised"
        );
        m.log_summaries();
        Ok(m)
    }

    fn initial_condition(&mut self) -> Result<()> {
        match &self.params.init {
            InitMode::Flat { basement_elev, sedfill_elev, erodibility } => {
                self.surf.fill(*sedfill_elev);
                self.bsmt.fill(*basement_elev);
                self.erodibility.fill(*erodibility);
            }
            InitMode::Existing { surf_file, bsmt_file, erodibility_file } => {
                let (ns, ew) = (self.params.boundaries_ns, self.params.boundaries_ew);
                self.surf.copy_from(&Raster::read_ascii(surf_file, ns, ew)?)?;
                self.bsmt.copy_from(&Raster::read_ascii(bsmt_file, ns, ew)?)?;
                self.erodibility.copy_from(&Raster::read_ascii(erodibility_file, ns, ew)?)?;
            }
        }
        self.ice.copy_from(&self.surf)?;
        self.zero_elev.copy_from(&self.surf)?;
        self.iceload.fill(self.params.init_iceload);
        self.contact.fill(1.0);
        self.basal_def.fill(0.0);
        self.basal_pres.fill(self.params.global_basal_pres);
        self.dsurf.fill(0.0);
        self.diceload.fill(0.0);
        Ok(())
    }

    /// Parameters the model was built with.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Seed of the random source.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Shared neighbour tables.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topo
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Fluxes accumulated since the last status report.
    pub fn period_totals(&self) -> &PhaseTotals {
        &self.period_totals
    }

    /// True where ice touches the bed.
    #[inline]
    pub fn in_contact(&self, y: usize, x: usize) -> bool {
        self.contact.get(y, x) == 1.0
    }

    /// Advance one timestep. `t` is the caller's step counter and drives snapshot cadence.
    pub fn run(&mut self, t: u64, sink: &mut dyn OutputSink) -> Result<PhaseTotals> {
        if self.state == ModelState::Finalized {
            return Err(EngineError::Lifecycle("run called after finalize"));
        }
        self.state = ModelState::Running;
        self.step_totals = PhaseTotals::default();

        self.move_ice();
        if t % self.params.output_interval == 0 {
            self.push_model_state(t, sink)?;
        }
        self.squish_sediment()?;
        self.advect_entrainment();
        self.erode_basement();
        self.apply_dsurf();
        self.surf_bleed();
        self.iceload_bleed();
        self.settle_ice();

        if self.params.check_state {
            self.check_state()?;
        }
        Ok(self.step_totals)
    }

    /// Flush the final state and request the end-of-run plots. Allowed exactly once.
    pub fn finalize(&mut self, t: u64, sink: &mut dyn OutputSink) -> Result<()> {
        if self.state == ModelState::Finalized {
            return Err(EngineError::Lifecycle("finalize called twice"));
        }
        self.push_model_state(t, sink)?;
        if !self.params.progress.on_the_fly {
            sink.plot(PlotRequest::AllImages)?;
        }
        sink.plot(PlotRequest::FinalAnalyses)?;
        self.state = ModelState::Finalized;
        info!(t, "bed model finalised");
        Ok(())
    }

    /// Write the state rasters, hand the status report over and reset the period fluxes.
    pub fn push_model_state(&mut self, t: u64, sink: &mut dyn OutputSink) -> Result<()> {
        let view = StateView {
            surf: &self.surf,
            basal_pres: &self.basal_pres,
            ice: &self.ice,
            iceload: &self.iceload,
            bsmt: &self.bsmt,
        };
        sink.write_state(t, &view)?;
        let report = self.status_report(t);
        sink.push_status(&report)?;
        self.period_totals = PhaseTotals::default();
        info!(t, surf_mean = report.surf.mean, contact_mean = report.contact_mean, "snapshot");
        if self.params.progress.on_the_fly {
            sink.plot(PlotRequest::Step(t))?;
        }
        self.log_summaries();
        Ok(())
    }

    /// Statistics of the current state together with the fluxes since the last report.
    pub fn status_report(&self, t: u64) -> StatusReport {
        let area = self.params.cellsize * self.params.cellsize;
        let bedsed: f64 = self.surf.data().iter().zip(self.bsmt.data()).map(|(s, b)| s - b).sum();
        StatusReport {
            t,
            totals: self.period_totals,
            surf: self.surf.summary(),
            bsmt: self.bsmt.summary(),
            basal_def: self.basal_def.summary(),
            contact_mean: self.contact.mean(),
            total_iceload: self.iceload.sum() * area,
            total_bedsed: bedsed * area,
        }
    }

    /// Grid sums for mass accounting.
    pub fn inventory(&self) -> MassInventory {
        MassInventory { surf: self.surf.sum(), bsmt: self.bsmt.sum(), iceload: self.iceload.sum() }
    }

    /// Fail on NaN, ice below the bed, bed below basement or a negative ice load.
    pub fn check_state(&self) -> Result<()> {
        let sums = [
            ("surf", self.surf.sum()),
            ("dsurf", self.dsurf.sum()),
            ("ice", self.ice.sum()),
            ("basal_def", self.basal_def.sum()),
            ("basal_pres", self.basal_pres.sum()),
            ("iceload", self.iceload.sum()),
        ];
        if let Some((name, _)) = sums.iter().find(|(_, s)| s.is_nan()) {
            return Err(EngineError::InvariantViolation(format!("NaN found in {name}")));
        }
        let tol = STATE_TOLERANCE + 1.0e-12 * self.params.global_basal_pres.abs();
        for y in 0..self.params.ydim {
            for x in 0..self.params.xdim {
                let (ice, surf, bsmt) = (self.ice.get(y, x), self.surf.get(y, x), self.bsmt.get(y, x));
                if ice - surf < -tol {
                    return Err(EngineError::InvariantViolation(format!(
                        "ice {ice} below surface {surf} at ({y}, {x})"
                    )));
                }
                if surf - bsmt < -tol {
                    return Err(EngineError::InvariantViolation(format!(
                        "surface {surf} below basement {bsmt} at ({y}, {x})"
                    )));
                }
                let load = self.iceload.get(y, x);
                if load < -tol {
                    return Err(EngineError::InvariantViolation(format!("negative ice load {load} at ({y}, {x})")));
                }
            }
        }
        Ok(())
    }

    fn tally(&mut self, phase: &PhaseTotals) {
        self.step_totals.accumulate(phase);
        self.period_totals.accumulate(phase);
    }

    fn log_summaries(&self) {
        let grids = [
            ("surf", &self.surf),
            ("dsurf", &self.dsurf),
            ("ice", &self.ice),
            ("basal_def", &self.basal_def),
            ("basal_pres", &self.basal_pres),
            ("contact", &self.contact),
            ("iceload", &self.iceload),
        ];
        for (name, r) in grids {
            let s = r.summary();
            debug!(grid = name, mean = s.mean, min = s.min, max = s.max, nodata = s.nodata, "summary");
        }
    }
}
