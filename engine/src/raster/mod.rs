//! Dense 2-D raster of `f64` values on a shared [`Topology`].
//!
//! Storage is a single flat buffer indexed `y * xdim + x` with row 0 at the south edge.
//! Cells holding the no-data value are skipped by every aggregate.

pub mod ascii;
pub mod terrain;

use std::sync::Arc;

use rand::Rng;

use crate::error::{try_alloc, EngineError, Result};
use crate::topology::Topology;

/// Default no-data marker.
pub const NODATA: f64 = -9999.0;

/// Aggregate statistics of a raster, no-data excluded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterSummary {
    /// Mean of valid cells (no-data if none).
    pub mean: f64,
    /// Minimum of valid cells (no-data if none).
    pub min: f64,
    /// Maximum of valid cells (no-data if none).
    pub max: f64,
    /// Number of no-data cells.
    pub nodata: usize,
}

/// Georeferenced grid of real values.
#[derive(Clone, Debug)]
pub struct Raster {
    /// Rows.
    pub ydim: usize,
    /// Columns.
    pub xdim: usize,
    /// X of the lower-left corner.
    pub xll: f64,
    /// Y of the lower-left corner.
    pub yll: f64,
    /// Cell edge length.
    pub cellsize: f64,
    /// No-data marker for this raster.
    pub nodata: f64,
    data: Vec<f64>,
    topo: Arc<Topology>,
}

impl Raster {
    /// Allocate a raster over `topo`, filled with no-data.
    pub fn new(topo: Arc<Topology>, xll: f64, yll: f64, cellsize: f64) -> Result<Self> {
        let data = try_alloc("raster cells", topo.cells(), NODATA)?;
        Ok(Self { ydim: topo.ydim, xdim: topo.xdim, xll, yll, cellsize, nodata: NODATA, data, topo })
    }

    /// Allocate a raster with the same geometry and topology as `self`, filled with no-data.
    pub fn like(&self) -> Result<Self> {
        let mut r = Self::new(self.topo.clone(), self.xll, self.yll, self.cellsize)?;
        r.nodata = self.nodata;
        r.data.fill(self.nodata);
        Ok(r)
    }

    /// Shared neighbour tables.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topo
    }

    /// Flat index of `(y, x)`.
    #[inline]
    pub fn idx(&self, y: usize, x: usize) -> usize {
        y * self.xdim + x
    }

    /// Value at `(y, x)`.
    #[inline]
    pub fn get(&self, y: usize, x: usize) -> f64 {
        self.data[y * self.xdim + x]
    }

    /// Overwrite the value at `(y, x)`.
    #[inline]
    pub fn set(&mut self, y: usize, x: usize, v: f64) {
        let i = self.idx(y, x);
        self.data[i] = v;
    }

    /// Add `dv` to the value at `(y, x)`.
    #[inline]
    pub fn add(&mut self, y: usize, x: usize, dv: f64) {
        let i = self.idx(y, x);
        self.data[i] += dv;
    }

    /// Value of the read-neighbour to the north.
    #[inline]
    pub fn north_of(&self, y: usize, x: usize) -> f64 {
        self.get(self.topo.north(y), x)
    }

    /// Value of the read-neighbour to the south.
    #[inline]
    pub fn south_of(&self, y: usize, x: usize) -> f64 {
        self.get(self.topo.south(y), x)
    }

    /// Value of the read-neighbour to the east.
    #[inline]
    pub fn east_of(&self, y: usize, x: usize) -> f64 {
        self.get(y, self.topo.east(x))
    }

    /// Value of the read-neighbour to the west.
    #[inline]
    pub fn west_of(&self, y: usize, x: usize) -> f64 {
        self.get(y, self.topo.west(x))
    }

    /// Row-major cell values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major cell values.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Roughen the raster: add `multiplier * (u - 0.5)`, `u` uniform in `[0, 1)`, to every
    /// valid cell in row-major order. No-data cells take no draw.
    pub fn bumpify<R: Rng + ?Sized>(&mut self, multiplier: f64, rng: &mut R) {
        let nd = self.nodata;
        for v in self.data.iter_mut().filter(|v| **v != nd) {
            *v += multiplier * (rng.gen::<f64>() - 0.5);
        }
    }

    /// Mark every cell equal to `value` as no-data.
    pub fn set_nodata_where(&mut self, value: f64) {
        let nd = self.nodata;
        for v in self.data.iter_mut().filter(|v| **v == value) {
            *v = nd;
        }
    }

    /// Copy cell values from `other`, translating its no-data marker to ours.
    pub fn copy_from(&mut self, other: &Raster) -> Result<()> {
        if other.ydim != self.ydim || other.xdim != self.xdim {
            return Err(EngineError::DimensionMismatch {
                expected_y: self.ydim,
                expected_x: self.xdim,
                found_y: other.ydim,
                found_x: other.xdim,
            });
        }
        let nd = self.nodata;
        for (dst, &src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst = if src == other.nodata { nd } else { src };
        }
        Ok(())
    }

    /// True when `v` is this raster's no-data marker.
    #[inline]
    pub fn is_nodata(&self, v: f64) -> bool {
        v == self.nodata
    }

    fn valid(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(move |&v| v != self.nodata)
    }

    /// Sum of valid cells.
    pub fn sum(&self) -> f64 {
        self.valid().sum()
    }

    /// Minimum of valid cells, or no-data when none are valid.
    pub fn min(&self) -> f64 {
        self.valid().reduce(f64::min).unwrap_or(self.nodata)
    }

    /// Maximum of valid cells, or no-data when none are valid.
    pub fn max(&self) -> f64 {
        self.valid().reduce(f64::max).unwrap_or(self.nodata)
    }

    /// Mean of valid cells, or no-data when none are valid.
    pub fn mean(&self) -> f64 {
        let (sum, n) = self.valid().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 {
            self.nodata
        } else {
            sum / n as f64
        }
    }

    /// Number of no-data cells.
    pub fn count_nodata(&self) -> usize {
        self.data.iter().filter(|&&v| v == self.nodata).count()
    }

    /// Mean, extremes and no-data count in one pass.
    pub fn summary(&self) -> RasterSummary {
        let mut sum = 0.0;
        let mut n = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in self.valid() {
            sum += v;
            n += 1;
            min = min.min(v);
            max = max.max(v);
        }
        if n == 0 {
            return RasterSummary {
                mean: self.nodata,
                min: self.nodata,
                max: self.nodata,
                nodata: self.data.len(),
            };
        }
        RasterSummary { mean: sum / n as f64, min, max, nodata: self.data.len() - n }
    }
}
