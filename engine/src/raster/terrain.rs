//! Neighbourhood filters and surface derivatives over read-neighbours.
//!
//! All results are new rasters sharing the source topology, so periodic edges wrap and
//! open edges mirror exactly as the transport code sees them.

use super::Raster;
use crate::error::Result;

/// D8 neighbours as `(row step, col step, compass bearing)`, in tie-break order.
const D8: [(i8, i8, f64); 8] = [
    (1, 0, 360.0),
    (1, 1, 45.0),
    (0, 1, 90.0),
    (-1, 1, 135.0),
    (-1, 0, 180.0),
    (-1, -1, 225.0),
    (0, -1, 270.0),
    (1, -1, 315.0),
];

impl Raster {
    /// Mean of each cell and its four rook neighbours, skipping no-data.
    pub fn rooks_mean(&self) -> Result<Raster> {
        let t = self.topology().clone();
        let mut out = self.like()?;
        for y in 0..self.ydim {
            for x in 0..self.xdim {
                let cells = [(y, x), (t.north(y), x), (t.south(y), x), (y, t.east(x)), (y, t.west(x))];
                out.set(y, x, self.mean_of(&cells));
            }
        }
        Ok(out)
    }

    /// Mean of each cell and its eight queen neighbours, skipping no-data.
    pub fn queens_mean(&self) -> Result<Raster> {
        let t = self.topology().clone();
        let mut out = self.like()?;
        for y in 0..self.ydim {
            let rows = [t.south(y), y, t.north(y)];
            for x in 0..self.xdim {
                let cols = [t.west(x), x, t.east(x)];
                let mut cells = [(0, 0); 9];
                for (k, cell) in cells.iter_mut().enumerate() {
                    *cell = (rows[k / 3], cols[k % 3]);
                }
                out.set(y, x, self.mean_of(&cells));
            }
        }
        Ok(out)
    }

    fn mean_of(&self, cells: &[(usize, usize)]) -> f64 {
        let mut sum = 0.0;
        let mut n = 0usize;
        for &(y, x) in cells {
            let v = self.get(y, x);
            if !self.is_nodata(v) {
                sum += v;
                n += 1;
            }
        }
        if n == 0 {
            self.nodata
        } else {
            sum / n as f64
        }
    }

    /// Horn (1981) gradient `(dz/dx, dz/dy)` at `(y, x)`; `None` if any neighbour is no-data.
    ///
    /// `dz/dy` is positive when the surface rises to the north.
    pub fn horn_gradient(&self, y: usize, x: usize) -> Option<(f64, f64)> {
        let t = self.topology();
        let (yn, ys) = (t.north(y), t.south(y));
        let (xe, xw) = (t.east(x), t.west(x));
        let z = [
            self.get(yn, xw),
            self.get(yn, x),
            self.get(yn, xe),
            self.get(y, xw),
            self.get(y, xe),
            self.get(ys, xw),
            self.get(ys, x),
            self.get(ys, xe),
        ];
        if z.iter().any(|&v| self.is_nodata(v)) {
            return None;
        }
        let [a, b, c, d, f, g, h, i] = z;
        let dzdx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (8.0 * self.cellsize);
        let dzdy = ((a + 2.0 * b + c) - (g + 2.0 * h + i)) / (8.0 * self.cellsize);
        Some((dzdx, dzdy))
    }

    /// Slope in degrees.
    pub fn slope_horn(&self) -> Result<Raster> {
        let mut out = self.like()?;
        for y in 0..self.ydim {
            for x in 0..self.xdim {
                if let Some((gx, gy)) = self.horn_gradient(y, x) {
                    out.set(y, x, gx.hypot(gy).atan().to_degrees());
                }
            }
        }
        Ok(out)
    }

    /// Compass bearing of steepest descent in degrees (0 = north, clockwise); no-data where flat.
    pub fn aspect_horn(&self) -> Result<Raster> {
        let mut out = self.like()?;
        for y in 0..self.ydim {
            for x in 0..self.xdim {
                if let Some((gx, gy)) = self.horn_gradient(y, x) {
                    if gx == 0.0 && gy == 0.0 {
                        continue;
                    }
                    let bearing = (-gx).atan2(-gy).to_degrees();
                    out.set(y, x, if bearing < 0.0 { bearing + 360.0 } else { bearing });
                }
            }
        }
        Ok(out)
    }

    /// Steepest drop per unit run to one of the eight read-neighbours, with its bearing.
    /// Diagonals run `sqrt(2) * cellsize`; on ties the first neighbour in N, NE, .., NW wins.
    fn d8_steepest(&self, y: usize, x: usize) -> (f64, f64) {
        let t = self.topology();
        let diag = self.cellsize.hypot(self.cellsize);
        let z = self.get(y, x);
        let mut best = (f64::NEG_INFINITY, -1.0);
        for (dy, dx, bearing) in D8 {
            let ny = match dy {
                1 => t.north(y),
                -1 => t.south(y),
                _ => y,
            };
            let nx = match dx {
                1 => t.east(x),
                -1 => t.west(x),
                _ => x,
            };
            let run = if dy != 0 && dx != 0 { diag } else { self.cellsize };
            let drop = (z - self.get(ny, nx)) / run;
            if drop > best.0 {
                best = (drop, bearing);
            }
        }
        best
    }

    /// D8 slope in degrees towards the steepest neighbour; 0 where flat, negative in a pit.
    pub fn slope_d8(&self) -> Result<Raster> {
        let mut out = self.like()?;
        for y in 0..self.ydim {
            for x in 0..self.xdim {
                let (drop, _) = self.d8_steepest(y, x);
                out.set(y, x, if drop == 0.0 { 0.0 } else { drop.atan().to_degrees() });
            }
        }
        Ok(out)
    }

    /// D8 bearing of steepest descent (45-degree steps, 360 for north); -1 where nothing
    /// lies downhill.
    pub fn aspect_d8(&self) -> Result<Raster> {
        let mut out = self.like()?;
        for y in 0..self.ydim {
            for x in 0..self.xdim {
                let (drop, bearing) = self.d8_steepest(y, x);
                out.set(y, x, if drop > 0.0 { bearing } else { -1.0 });
            }
        }
        Ok(out)
    }
}
