//! Flux accounting between snapshots and the status report handed to the ledger writer.
//!
//! Quantities are sums of per-cell elevation changes (length units); the two inventory
//! totals in [`StatusReport`] are volumes (multiplied by cellsize²).

use crate::raster::RasterSummary;

/// Column names of the status ledger, in row order.
pub const STATUS_COLUMNS: [&str; 25] = [
    "t",
    "Q_ad",
    "Q_sq_n",
    "Q_sq_s",
    "Q_sq_e",
    "Q_sq_w",
    "Q_entrain",
    "Q_distrain",
    "total_bleed",
    "settle_count",
    "iceload_bleed",
    "surf_bleed",
    "abrasion",
    "surf_mean",
    "surf_min",
    "surf_max",
    "bsmt_mean",
    "bsmt_min",
    "bsmt_max",
    "basal_def_mean",
    "basal_def_min",
    "basal_def_max",
    "contact_mean",
    "total_iceload",
    "total_bedsed",
];

/// Fluxes accumulated by the timestep phases.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct PhaseTotals {
    /// Downstream advection.
    pub q_ad: f64,
    /// Squish towards the north.
    pub q_sq_n: f64,
    /// Squish towards the south.
    pub q_sq_s: f64,
    /// Squish towards the east.
    pub q_sq_e: f64,
    /// Squish towards the west.
    pub q_sq_w: f64,
    /// Sediment entrained into the ice.
    pub q_entrain: f64,
    /// Sediment melted out of the ice (positive amount).
    pub q_distrain: f64,
    /// Cells whose ice was lifted onto a risen surface.
    pub settle_count: u64,
    /// Applied ice-load bleed.
    pub iceload_bleed: f64,
    /// Applied surface bleed.
    pub surf_bleed: f64,
    /// Basement abraded.
    pub abrasion: f64,
    /// Squished sediment pushed across an open edge. Stays zero: mirrored edge reads give
    /// squish no gradient off the grid.
    pub squish_boundary_loss: f64,
    /// Squished sediment clipped at a cavity's ice ceiling.
    pub squish_ceiling_clip: f64,
    /// Advected sediment carried across an open edge.
    pub advection_boundary_loss: f64,
    /// Net ice load carried out across open west/east edges by ice advection.
    pub iceload_boundary_loss: f64,
    /// Residual sediment discarded when abrasion snaps the surface to the basement.
    pub abrasion_trim: f64,
}

impl PhaseTotals {
    /// Sediment that left the modelled bed and ice load through bleeds and open edges.
    pub fn total_bleed(&self) -> f64 {
        self.surf_bleed
            + self.iceload_bleed
            + self.squish_boundary_loss
            + self.squish_ceiling_clip
            + self.advection_boundary_loss
            + self.iceload_boundary_loss
    }

    /// Total squish in all four directions.
    pub fn q_squish(&self) -> f64 {
        self.q_sq_n + self.q_sq_s + self.q_sq_e + self.q_sq_w
    }

    /// Fold another period's totals into this one.
    pub fn accumulate(&mut self, o: &PhaseTotals) {
        self.q_ad += o.q_ad;
        self.q_sq_n += o.q_sq_n;
        self.q_sq_s += o.q_sq_s;
        self.q_sq_e += o.q_sq_e;
        self.q_sq_w += o.q_sq_w;
        self.q_entrain += o.q_entrain;
        self.q_distrain += o.q_distrain;
        self.settle_count += o.settle_count;
        self.iceload_bleed += o.iceload_bleed;
        self.surf_bleed += o.surf_bleed;
        self.abrasion += o.abrasion;
        self.squish_boundary_loss += o.squish_boundary_loss;
        self.squish_ceiling_clip += o.squish_ceiling_clip;
        self.advection_boundary_loss += o.advection_boundary_loss;
        self.iceload_boundary_loss += o.iceload_boundary_loss;
        self.abrasion_trim += o.abrasion_trim;
    }

    /// Expected change of bed sediment plus ice load implied by these fluxes.
    pub fn expected_mass_change(&self) -> f64 {
        self.abrasion - self.abrasion_trim - self.total_bleed()
    }

    /// Mass-balance residual between two inventories taken around these fluxes.
    pub fn mass_residual(&self, before: &MassInventory, after: &MassInventory) -> f64 {
        (after.sediment() - before.sediment()) - self.expected_mass_change()
    }
}

/// Grid sums used for mass accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MassInventory {
    /// Σ surf
    pub surf: f64,
    /// Σ bsmt
    pub bsmt: f64,
    /// Σ iceload
    pub iceload: f64,
}

impl MassInventory {
    /// Bed sediment plus sediment carried in the ice.
    pub fn sediment(&self) -> f64 {
        self.surf - self.bsmt + self.iceload
    }
}

/// One row of the status ledger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusReport {
    /// Step at which the report was taken.
    pub t: u64,
    /// Fluxes since the previous report.
    pub totals: PhaseTotals,
    /// Sediment surface statistics.
    pub surf: RasterSummary,
    /// Basement statistics.
    pub bsmt: RasterSummary,
    /// Basal deformation statistics.
    pub basal_def: RasterSummary,
    /// Fraction of cells in contact.
    pub contact_mean: f64,
    /// Ice sediment load volume.
    pub total_iceload: f64,
    /// Bed sediment volume.
    pub total_bedsed: f64,
}

impl StatusReport {
    /// CSV header line (no newline).
    pub fn csv_header() -> String {
        STATUS_COLUMNS.join(",")
    }

    /// CSV data line (no newline), columns as in [`STATUS_COLUMNS`].
    pub fn csv_row(&self) -> String {
        let q = &self.totals;
        let fields: [String; 25] = [
            self.t.to_string(),
            q.q_ad.to_string(),
            q.q_sq_n.to_string(),
            q.q_sq_s.to_string(),
            q.q_sq_e.to_string(),
            q.q_sq_w.to_string(),
            q.q_entrain.to_string(),
            q.q_distrain.to_string(),
            q.total_bleed().to_string(),
            q.settle_count.to_string(),
            q.iceload_bleed.to_string(),
            q.surf_bleed.to_string(),
            q.abrasion.to_string(),
            self.surf.mean.to_string(),
            self.surf.min.to_string(),
            self.surf.max.to_string(),
            self.bsmt.mean.to_string(),
            self.bsmt.min.to_string(),
            self.bsmt.max.to_string(),
            self.basal_def.mean.to_string(),
            self.basal_def.min.to_string(),
            self.basal_def.max.to_string(),
            self.contact_mean.to_string(),
            self.total_iceload.to_string(),
            self.total_bedsed.to_string(),
        ];
        fields.join(",")
    }
}
