//! Ice advection, pressure/contact resolution and ice settling.

use super::BedModel;
use crate::cfl;
use crate::ledger::PhaseTotals;

impl BedModel {
    /// Advect ice and ice load one step east (donor cell from the west read-neighbour),
    /// then resolve deformation, pressure and contact of every cell.
    ///
    /// New ice and ice load are committed only after every cell has been evaluated.
    pub fn move_ice(&mut self) {
        let p = &self.params;
        let (w_wgt, t_wgt) = cfl::donor_weights(p.ice_advection, p.len_timestep, p.cellsize);
        let relax = p.global_basal_pres * p.len_timestep / p.viscosity;
        let topo = self.topo.clone();

        let mut edge_in = 0.0;
        let mut edge_out = 0.0;
        for y in 0..topo.ydim {
            for x in 0..topo.xdim {
                let xw = topo.west(x);
                let ice_prov = w_wgt * self.ice.get(y, xw) + t_wgt * self.ice.get(y, x);
                let zero = ice_prov - relax;
                self.zero_elev.set(y, x, zero);

                self.basal_def.set(y, x, self.surf.get(y, x) - ice_prov);
                self.resolve_pressure(y, x);
                if self.in_contact(y, x) {
                    self.n_ice.set(y, x, self.surf.get(y, x));
                } else {
                    self.basal_def.set(y, x, zero - ice_prov);
                    self.n_ice.set(y, x, zero);
                }

                let load_w = self.iceload.get(y, xw);
                let load = self.iceload.get(y, x);
                self.n_iceload.set(y, x, w_wgt * load_w + t_wgt * load);
                // Open west edge feeds a mirrored donor; open east edge loses the outgoing share.
                if topo.west_move(x).is_none() {
                    edge_in += w_wgt * load_w;
                }
                if topo.east_move(x).is_none() {
                    edge_out += w_wgt * load;
                }
            }
        }
        std::mem::swap(&mut self.ice, &mut self.n_ice);
        std::mem::swap(&mut self.iceload, &mut self.n_iceload);

        self.tally(&PhaseTotals { iceload_boundary_loss: edge_out - edge_in, ..Default::default() });
    }

    /// Pressure from deformation. A cell whose pressure falls below the fudge becomes a
    /// cavity with pressure clamped to zero, so contact cells always sit on or above their
    /// zero-pressure level.
    pub(crate) fn resolve_pressure(&mut self, y: usize, x: usize) {
        let p = &self.params;
        let pres = p.global_basal_pres + (self.basal_def.get(y, x) / p.len_timestep) * p.viscosity;
        if pres - self.basal_pres_fudge < 0.0 {
            self.basal_pres.set(y, x, 0.0);
            self.contact.set(y, x, 0.0);
        } else {
            self.basal_pres.set(y, x, pres);
            self.contact.set(y, x, 1.0);
        }
    }

    /// Lift the ice onto any surface that now stands above it. Lifted contact cells gain the
    /// lift as deformation; lifted cavities close.
    pub fn settle_ice(&mut self) {
        let mut settled = 0u64;
        for i in 0..self.surf.data().len() {
            let surf = self.surf.data()[i];
            let ice = self.ice.data()[i];
            if surf > ice {
                self.ice.data_mut()[i] = surf;
                if self.contact.data()[i] == 1.0 {
                    self.basal_def.data_mut()[i] += surf - ice;
                } else {
                    self.contact.data_mut()[i] = 1.0;
                }
                settled += 1;
            }
        }
        self.tally(&PhaseTotals { settle_count: settled, ..Default::default() });
    }
}
