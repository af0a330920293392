//! Sediment bleed to and from outside the modelled bed.

use super::BedModel;
use crate::ledger::PhaseTotals;

impl BedModel {
    /// Remove (or add, for a negative rate) a fixed amount of surface sediment per cell,
    /// never cutting into basement.
    pub fn surf_bleed(&mut self) {
        let rate = self.params.bleed.surf;
        if rate == 0.0 {
            return;
        }
        let want = rate * self.params.len_timestep;
        let mut applied = 0.0;
        for (s, &b) in self.surf.data_mut().iter_mut().zip(self.bsmt.data()) {
            if *s - want < b {
                applied += *s - b;
                *s = b;
            } else {
                *s -= want;
                applied += want;
            }
        }
        self.tally(&PhaseTotals { surf_bleed: applied, ..Default::default() });
    }

    /// Remove (or add) ice load per cell, never below zero. With a diffusive bleed the
    /// amount scales with the local load.
    pub fn iceload_bleed(&mut self) {
        let rate = self.params.bleed.iceload;
        if rate == 0.0 {
            return;
        }
        let dt = self.params.len_timestep;
        let diffusive = self.params.bleed.iceload_diffusive;
        let mut applied = 0.0;
        for l in self.iceload.data_mut() {
            let want = if diffusive { rate * dt * *l } else { rate * dt };
            if *l - want < 0.0 {
                applied += *l;
                *l = 0.0;
            } else {
                *l -= want;
                applied += want;
            }
        }
        self.tally(&PhaseTotals { iceload_bleed: applied, ..Default::default() });
    }
}
