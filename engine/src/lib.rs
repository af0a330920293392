//! Tillbed engine: subglacial till advection and bedform evolution on a 2-D grid.
//!
//! A [`model::BedModel`] owns co-registered rasters (ice, sediment surface, basement,
//! basal pressure and deformation, contact, ice sediment load, erodibility) on one shared
//! [`topology::Topology`] and advances them one timestep at a time. Everything the model
//! reports leaves through an [`snapshots::OutputSink`].
#![deny(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

pub mod cfl;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod progress;
pub mod raster;
pub mod snapshots;
pub mod topology;
pub mod visitation;

pub use config::SimParams;
pub use error::{EngineError, Result};
pub use model::BedModel;

/// Returns the engine version string from Cargo metadata.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
