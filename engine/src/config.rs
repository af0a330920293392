//! Simulation parameters and the simfile loader.
//!
//! A simfile is a whitespace-separated token stream in which every key is followed by its
//! value, conventionally written one per line as `> key value`. The first occurrence of a
//! key wins; tokens that are not looked up (such as the `>` markers) are ignored.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cfl;
use crate::error::{EngineError, Result};
use crate::topology::BoundaryMode;

/// Token stream of a simfile.
#[derive(Clone, Debug, Default)]
pub struct Simfile {
    tokens: Vec<String>,
}

impl Simfile {
    /// Tokenise simfile text.
    pub fn parse(text: &str) -> Self {
        Self { tokens: text.split_whitespace().map(str::to_owned).collect() }
    }

    /// Read and tokenise a simfile.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Raw value following the first occurrence of `key`.
    ///
    /// A key followed directly by the next line's `>` marker has no value.
    pub fn raw(&self, key: &str) -> Option<&str> {
        let pos = self.tokens.iter().position(|t| t == key)?;
        self.tokens.get(pos + 1).map(String::as_str).filter(|v| *v != ">")
    }

    /// Parse the value of a required key.
    pub fn require<T: FromStr>(&self, key: &str) -> Result<T> {
        self.optional(key)?.ok_or_else(|| EngineError::config(key, "missing from simfile"))
    }

    /// Parse the value of an optional key.
    pub fn optional<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.raw(key) {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| EngineError::config(key, format!("cannot parse value `{v}`"))),
        }
    }

    /// `yes`/other switch; absent means off.
    pub fn flag(&self, key: &str) -> bool {
        self.raw(key).is_some_and(|v| v.eq_ignore_ascii_case("yes"))
    }

    /// Boundary mode of a required key, reported against that key.
    fn boundary(&self, key: &str) -> Result<BoundaryMode> {
        let raw: String = self.require(key)?;
        raw.parse().map_err(|e: EngineError| match e {
            EngineError::Config { reason, .. } => EngineError::config(key, reason),
            other => other,
        })
    }
}

/// Entrainment response to basal pressure.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EntrainmentParams {
    /// Rate under a cavity (per unit time).
    pub cavity: f64,
    /// Rate at zero pressure in contact.
    pub zero: f64,
    /// Slope below the vertex pressure.
    pub slp_1: f64,
    /// Pressure at which the slope changes.
    pub vtx_2: f64,
    /// Slope above the vertex pressure.
    pub slp_2: f64,
}

impl EntrainmentParams {
    /// Piecewise-linear entrainment rate at `pres` for a contact cell (continuous at the vertex).
    pub fn contact_rate(&self, pres: f64) -> f64 {
        if pres < self.vtx_2 {
            pres * self.slp_1 + self.zero
        } else {
            (pres - self.vtx_2) * self.slp_2 + self.vtx_2 * self.slp_1 + self.zero
        }
    }
}

/// Basement abrasion coefficients.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AbrasionParams {
    /// Abrasion per unit effective pressure.
    pub from_n_slope: f64,
    /// Abrasion at zero effective pressure.
    pub from_n_zero: f64,
    /// Abrasion per unit ice sediment load.
    pub from_iceload: f64,
    /// Erodibility added to every cell's local erodibility.
    pub global_erodibility: f64,
    /// Fraction of abraded material returned to the ice load (rest goes to the surface).
    pub iceload_return_fraction: f64,
}

/// Bleed rates per unit time; negative values add material.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BleedParams {
    /// Loss from the ice sediment load.
    pub iceload: f64,
    /// Loss from the sediment surface.
    pub surf: f64,
    /// Scale the ice-load bleed by the local load instead of removing a fixed amount.
    pub iceload_diffusive: bool,
}

/// External progress-plotting utility.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressParams {
    /// Interpreter used to run the utility; empty disables plotting.
    pub rscript_path: String,
    /// Script passed to the interpreter; empty disables plotting.
    pub utility_name: String,
    /// Plot after every snapshot instead of once at the end.
    pub on_the_fly: bool,
}

impl ProgressParams {
    /// Whether a utility is configured at all.
    pub fn enabled(&self) -> bool {
        !self.rscript_path.is_empty() && !self.utility_name.is_empty()
    }
}

/// How the bed is initialised.
#[derive(Clone, Debug, PartialEq)]
pub enum InitMode {
    /// Uniform basement and sediment fill.
    Flat {
        /// Basement elevation
        basement_elev: f64,
        /// Sediment surface elevation
        sedfill_elev: f64,
        /// Local erodibility
        erodibility: f64,
    },
    /// Grids read from ASCII files.
    Existing {
        /// Sediment surface grid
        surf_file: PathBuf,
        /// Basement grid
        bsmt_file: PathBuf,
        /// Local erodibility grid
        erodibility_file: PathBuf,
    },
}

/// Fully populated simulation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SimParams {
    /// Rows
    pub ydim: usize,
    /// Columns
    pub xdim: usize,
    /// Cell edge length
    pub cellsize: f64,
    /// Y of the lower-left corner
    pub yll_corner: f64,
    /// X of the lower-left corner
    pub xll_corner: f64,
    /// Number of timesteps to run
    pub max_iterations: u64,
    /// Timestep length
    pub len_timestep: f64,
    /// Background basal pressure
    pub global_basal_pres: f64,
    /// Ice viscosity linking deformation rate to pressure
    pub viscosity: f64,
    /// Sediment advection per unit pressure
    pub q_advection_global: f64,
    /// Symmetric random fraction applied to advection
    pub q_advection_stochasticity: f64,
    /// Squish flux per unit pressure gradient
    pub q_squish_coef: f64,
    /// Ice advection rate towards the east
    pub ice_advection: f64,
    /// Entrainment response
    pub entrainment: EntrainmentParams,
    /// Abrasion response
    pub abrasion: AbrasionParams,
    /// Bleed rates
    pub bleed: BleedParams,
    /// Plotting utility
    pub progress: ProgressParams,
    /// North-south boundary mode
    pub boundaries_ns: BoundaryMode,
    /// East-west boundary mode
    pub boundaries_ew: BoundaryMode,
    /// Snapshot every N steps
    pub output_interval: u64,
    /// Prefix of every output file
    pub output_prefix: String,
    /// Initial condition
    pub init: InitMode,
    /// Initial ice sediment load
    pub init_iceload: f64,
    /// RNG seed; `None` lets the caller pick one
    pub seed: Option<u64>,
    /// Run the invariant checker after every step
    pub check_state: bool,
}

impl Default for SimParams {
    /// Inert 3x3 open-boundary bed: basement at 0, fill at 10, every rate zero.
    fn default() -> Self {
        Self {
            ydim: 3,
            xdim: 3,
            cellsize: 1.0,
            yll_corner: 0.0,
            xll_corner: 0.0,
            max_iterations: 1,
            len_timestep: 1.0,
            global_basal_pres: 0.0,
            viscosity: 1.0,
            q_advection_global: 0.0,
            q_advection_stochasticity: 0.0,
            q_squish_coef: 0.0,
            ice_advection: 0.0,
            entrainment: EntrainmentParams::default(),
            abrasion: AbrasionParams::default(),
            bleed: BleedParams::default(),
            progress: ProgressParams::default(),
            boundaries_ns: BoundaryMode::NonPeriodic,
            boundaries_ew: BoundaryMode::NonPeriodic,
            output_interval: 1,
            output_prefix: "tillbed".into(),
            init: InitMode::Flat { basement_elev: 0.0, sedfill_elev: 10.0, erodibility: 0.0 },
            init_iceload: 0.0,
            seed: None,
            check_state: false,
        }
    }
}

impl SimParams {
    /// Load and validate parameters from a simfile on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_simfile(&Simfile::load(path)?)
    }

    /// Build and validate parameters from a parsed simfile.
    pub fn from_simfile(sf: &Simfile) -> Result<Self> {
        let init = match sf.require::<String>("init_type")?.to_ascii_lowercase().as_str() {
            "flat" => InitMode::Flat {
                basement_elev: sf.require("flat_init_basement_elev")?,
                sedfill_elev: sf.require("flat_init_sedfill_elev")?,
                erodibility: sf.optional("init_erodibility")?.unwrap_or(0.0),
            },
            "existing" => InitMode::Existing {
                surf_file: sf.require::<String>("existing_surf_file")?.into(),
                bsmt_file: sf.require::<String>("existing_bsmt_file")?.into(),
                erodibility_file: sf.require::<String>("existing_erodibility_file")?.into(),
            },
            other => {
                return Err(EngineError::config(
                    "init_type",
                    format!("unknown init type `{other}` (expected flat or existing)"),
                ))
            }
        };

        let p = Self {
            ydim: sf.require("ydim")?,
            xdim: sf.require("xdim")?,
            cellsize: sf.require("cellsize")?,
            yll_corner: sf.require("yll_corner")?,
            xll_corner: sf.require("xll_corner")?,
            max_iterations: sf.require("max_iterations")?,
            len_timestep: sf.require("len_timestep")?,
            global_basal_pres: sf.require("global_basal_pres")?,
            viscosity: sf.require("viscosity")?,
            q_advection_global: sf.require("Q_advection_global")?,
            q_advection_stochasticity: sf.require("Q_advection_stochasticity")?,
            q_squish_coef: sf.require("Q_squish_coef")?,
            ice_advection: sf.require("ice_advection")?,
            entrainment: EntrainmentParams {
                cavity: sf.require("entrainment_cavity")?,
                zero: sf.require("entrainment_zero")?,
                slp_1: sf.require("entrainment_slp_1")?,
                vtx_2: sf.require("entrainment_vtx_2")?,
                slp_2: sf.require("entrainment_slp_2")?,
            },
            abrasion: AbrasionParams {
                from_n_slope: sf.require("abrasion_from_N_slope")?,
                from_n_zero: sf.require("abrasion_from_N_zero")?,
                from_iceload: sf.require("abrasion_from_iceload")?,
                global_erodibility: sf.require("global_bsmt_erodibility")?,
                iceload_return_fraction: sf.require("iceload_surf_return_fraction")?,
            },
            bleed: BleedParams {
                iceload: sf.require("iceload_bleed")?,
                surf: sf.require("surf_bleed")?,
                iceload_diffusive: sf.flag("iceload_bleed_diffusive"),
            },
            progress: ProgressParams {
                rscript_path: sf.raw("Rscript_path").unwrap_or_default().to_owned(),
                utility_name: sf.raw("progress_utility_name").unwrap_or_default().to_owned(),
                on_the_fly: sf.flag("on_the_fly_progress_updates"),
            },
            boundaries_ns: sf.boundary("boundaries_ns")?,
            boundaries_ew: sf.boundary("boundaries_ew")?,
            output_interval: sf.require("interim_file_output_interval")?,
            output_prefix: sf.require("file_output_prefix")?,
            init,
            init_iceload: sf.optional("init_iceload")?.unwrap_or(0.0),
            seed: sf.optional("seed")?,
            check_state: sf.flag("check_state"),
        };
        p.validate()?;
        Ok(p)
    }

    /// Courant number of the ice advection step.
    pub fn courant(&self) -> f64 {
        cfl::courant(self.ice_advection, self.len_timestep, self.cellsize)
    }

    /// Reject parameter sets the engine cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.ydim == 0 {
            return Err(EngineError::config("ydim", "must be positive"));
        }
        if self.xdim == 0 {
            return Err(EngineError::config("xdim", "must be positive"));
        }
        positive("cellsize", self.cellsize)?;
        positive("len_timestep", self.len_timestep)?;
        positive("viscosity", self.viscosity)?;
        if self.output_interval == 0 {
            return Err(EngineError::config("interim_file_output_interval", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.abrasion.iceload_return_fraction) {
            return Err(EngineError::config("iceload_surf_return_fraction", "must lie in [0, 1]"));
        }
        if self.q_advection_stochasticity < 0.0 {
            return Err(EngineError::config("Q_advection_stochasticity", "must not be negative"));
        }
        if self.ice_advection < 0.0 {
            return Err(EngineError::config("ice_advection", "must not be negative"));
        }
        let c = cfl::check(self.ice_advection, self.len_timestep, self.cellsize, cfl::CflConfig::default());
        if !c.stable {
            return Err(EngineError::config(
                "ice_advection",
                format!(
                    "ice_advection * len_timestep exceeds cellsize (Courant number {:.3}); decrease the timestep",
                    c.courant
                ),
            ));
        }
        Ok(())
    }
}

fn positive(key: &str, v: f64) -> Result<()> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(EngineError::config(key, format!("must be positive, got {v}")))
    }
}
