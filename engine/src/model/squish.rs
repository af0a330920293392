//! Lateral sediment squish down basal-pressure gradients.
//!
//! Cells are visited in a random order and every deposit lands immediately, so a cell
//! visited later sees the deposits of earlier cells. This phase must stay sequential.

use super::BedModel;
use crate::error::{EngineError, Result};
use crate::ledger::PhaseTotals;
use crate::topology::Direction;

/// Surface within this distance of a cavity's ice ceiling fills the cavity.
const CEILING_TOLERANCE: f64 = 1.0e-10;

/// Share of the deformation difference two contact cells may exchange in one step.
const EQUALISATION_SHARE: f64 = 0.125;

impl BedModel {
    /// Reshuffle the visitation order and squish every contact cell towards its four
    /// neighbours, depositing north, south, east, then west.
    pub fn squish_sediment(&mut self) -> Result<()> {
        self.visit.reshuffle(&mut self.rng);
        let topo = self.topo.clone();
        let mut acc = PhaseTotals::default();

        for i in 0..self.visit.len() {
            let (y, x) = self.visit.get(i);
            if !self.in_contact(y, x) {
                continue;
            }

            let mut q = [0.0f64; 4];
            for (qd, d) in q.iter_mut().zip(Direction::ALL) {
                let (ty, tx) = topo.read(d, y, x);
                *qd = self.squish_potential(y, x, ty, tx);
            }

            let surf = self.surf.get(y, x);
            let mut req: f64 = q.iter().sum();
            if surf - req < self.bsmt.get(y, x) && req != 0.0 {
                let frac = (surf - self.bsmt.get(y, x)) / req;
                q.iter_mut().for_each(|v| *v *= frac);
                req = q.iter().sum();
            }
            let zero = self.zero_elev.get(y, x);
            if surf - req < zero && req != 0.0 {
                // Surface a hair below the zero-pressure level gives a tiny negative fraction.
                let frac = ((surf - zero) / req).abs();
                if frac > 1.0 {
                    return Err(EngineError::InvariantViolation(format!(
                        "squish reduce fraction {frac} > 1 at ({y}, {x})"
                    )));
                }
                q.iter_mut().for_each(|v| *v *= frac);
                req = q.iter().sum();
            }

            self.surf.add(y, x, -req);
            self.basal_def.add(y, x, -req);
            self.ice.set(y, x, self.surf.get(y, x));
            self.resolve_pressure(y, x);

            for (&qd, d) in q.iter().zip(Direction::ALL) {
                self.deposit_squish(topo.destination(d, y, x), qd, &mut acc);
            }
            acc.q_sq_n += q[0];
            acc.q_sq_s += q[1];
            acc.q_sq_e += q[2];
            acc.q_sq_w += q[3];
        }
        self.tally(&acc);
        Ok(())
    }

    /// Largest flux from `(y, x)` to `(ty, tx)` this step: down-gradient only, capped by
    /// pressure equalisation against a contact cell or by the room under a cavity's ice.
    fn squish_potential(&self, y: usize, x: usize, ty: usize, tx: usize) -> f64 {
        let grad = (self.basal_pres.get(y, x) - self.basal_pres.get(ty, tx)) / self.params.cellsize;
        if grad <= 0.0 {
            return 0.0;
        }
        let q = grad * self.params.len_timestep * self.params.q_squish_coef;
        let cap = if self.in_contact(ty, tx) {
            EQUALISATION_SHARE * (self.basal_def.get(y, x) - self.basal_def.get(ty, tx))
        } else {
            self.ice.get(ty, tx) - self.surf.get(ty, tx)
        };
        q.min(cap).max(0.0)
    }

    /// Land `q` at `dest`, or record it as lost when the move leaves the domain.
    fn deposit_squish(&mut self, dest: Option<(usize, usize)>, q: f64, acc: &mut PhaseTotals) {
        if q <= 0.0 {
            return;
        }
        // Open edges mirror their reads, so the gradient across them is zero and this never fires.
        let Some((y, x)) = dest else {
            acc.squish_boundary_loss += q;
            return;
        };
        self.surf.add(y, x, q);
        if self.in_contact(y, x) {
            self.ice.set(y, x, self.surf.get(y, x));
            self.basal_def.add(y, x, q);
        } else {
            let surf = self.surf.get(y, x);
            let ceiling = self.ice.get(y, x);
            if surf + CEILING_TOLERANCE > ceiling {
                acc.squish_ceiling_clip += surf - ceiling;
                self.surf.set(y, x, ceiling);
                self.contact.set(y, x, 1.0);
            }
        }
        self.resolve_pressure(y, x);
    }
}
