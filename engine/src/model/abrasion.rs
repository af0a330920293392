//! Basement abrasion where ice rests on bare rock.

use super::BedModel;
use crate::ledger::PhaseTotals;

/// Sediment cover thinner than this counts as bare basement.
const BARE_TOLERANCE: f64 = 1.0e-10;

impl BedModel {
    /// Abrade bare basement under contact cells. Abraded material is split between the
    /// ice load and the surface; pressure is left for the next ice advection to refresh.
    pub fn erode_basement(&mut self) {
        let a = self.params.abrasion;
        let dt = self.params.len_timestep;
        let mut acc = PhaseTotals::default();
        for y in 0..self.params.ydim {
            for x in 0..self.params.xdim {
                if !self.in_contact(y, x) {
                    continue;
                }
                let cover = self.surf.get(y, x) - self.bsmt.get(y, x);
                if cover.abs() >= BARE_TOLERANCE {
                    continue;
                }
                let from_pressure = dt * (a.from_n_zero + self.basal_pres.get(y, x) * a.from_n_slope);
                let from_load = dt * self.iceload.get(y, x) * a.from_iceload;
                let abrasion = (from_pressure + from_load) * (a.global_erodibility + self.erodibility.get(y, x));

                let bsmt = self.bsmt.get(y, x) - abrasion;
                self.bsmt.set(y, x, bsmt);
                self.surf.set(y, x, bsmt + (1.0 - a.iceload_return_fraction) * abrasion);
                self.iceload.add(y, x, a.iceload_return_fraction * abrasion);

                acc.abrasion += abrasion;
                acc.abrasion_trim += cover;
            }
        }
        self.tally(&acc);
    }
}
