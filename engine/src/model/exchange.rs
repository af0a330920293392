//! Downstream sediment advection and entrainment into the ice, buffered in `dsurf` and
//! `diceload` until [`BedModel::apply_dsurf`].

use rand::Rng;

use super::BedModel;
use crate::ledger::PhaseTotals;

impl BedModel {
    /// Compute every cell's advection and entrainment against the current state and stage
    /// the resulting surface and ice-load changes.
    ///
    /// Cells are evaluated in row-major order; one random draw is taken per cell with a
    /// positive representative pressure.
    pub fn advect_entrainment(&mut self) {
        self.dsurf.fill(0.0);
        self.diceload.fill(0.0);
        let topo = self.topo.clone();
        let mut acc = PhaseTotals::default();

        for y in 0..topo.ydim {
            for x in 0..topo.xdim {
                let mut q_ad = self.advection_flux(y, x);
                let mut q_en = self.entrainment_flux(y, x);

                let surf = self.surf.get(y, x);
                let bsmt = self.bsmt.get(y, x);
                let req = q_ad + q_en;
                if surf - req < bsmt && req != 0.0 {
                    let available = surf - bsmt;
                    if q_en > 0.0 {
                        let frac = available / req;
                        q_ad *= frac;
                        q_en *= frac;
                    } else {
                        // Distraining: only advection can be cut back.
                        q_ad -= req - available;
                    }
                }

                self.dsurf.add(y, x, -q_ad - q_en);
                self.diceload.add(y, x, q_en);
                match topo.east_move(x) {
                    Some(xe) => self.dsurf.add(y, xe, q_ad),
                    None => acc.advection_boundary_loss += q_ad,
                }

                acc.q_ad += q_ad;
                if q_en > 0.0 {
                    acc.q_entrain += q_en;
                } else {
                    acc.q_distrain -= q_en;
                }
            }
        }
        self.tally(&acc);
    }

    /// Advection towards the east neighbour, driven by the mean pressure of the pair and
    /// perturbed by the configured symmetric random fraction.
    fn advection_flux(&mut self, y: usize, x: usize) -> f64 {
        let rep = (self.basal_pres.get(y, x) + self.basal_pres.east_of(y, x)) / 2.0;
        if rep <= 0.0 {
            return 0.0;
        }
        let p = &self.params;
        let q = rep * p.q_advection_global * p.len_timestep / p.cellsize;
        let noise: f64 = self.rng.gen();
        let q = q + (noise - 0.5) * q * p.q_advection_stochasticity;
        q.max(0.0)
    }

    /// Entrainment into the ice (negative: distrainment), never taking more load than exists.
    fn entrainment_flux(&self, y: usize, x: usize) -> f64 {
        let p = &self.params;
        let rate = if self.in_contact(y, x) {
            p.entrainment.contact_rate(self.basal_pres.get(y, x))
        } else {
            p.entrainment.cavity
        };
        let en = rate * p.len_timestep;
        let load = self.iceload.get(y, x);
        if load + en < 0.0 {
            -load
        } else {
            en
        }
    }

    /// Commit the staged surface and ice-load changes.
    pub fn apply_dsurf(&mut self) {
        for (s, d) in self.surf.data_mut().iter_mut().zip(self.dsurf.data()) {
            *s += d;
        }
        for (l, d) in self.iceload.data_mut().iter_mut().zip(self.diceload.data()) {
            *l += d;
        }
    }
}
