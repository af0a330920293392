//! Neighbour lookup tables for a rectangular grid with per-axis boundary modes.
//!
//! Conventions:
//! - Row 0 is the south edge, row `ydim-1` the north edge; column 0 is the west edge.
//! - "Read" tables answer which cell to inspect when looking at a neighbour. At a
//!   non-periodic edge they mirror the edge cell onto itself.
//! - "Move" tables answer where transferred mass lands. At a non-periodic edge they
//!   return `None`: the mass leaves the domain.
//! - On a periodic axis read and move tables are identical and wrap around.

use std::fmt;
use std::str::FromStr;

use crate::error::{try_alloc, EngineError, Result};

/// Boundary behaviour of one grid axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryMode {
    /// Opposite edges are joined.
    Periodic,
    /// Edges are open: reads mirror, moves leave the domain.
    NonPeriodic,
}

impl FromStr for BoundaryMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "periodic" => Ok(Self::Periodic),
            "nonperiodic" | "non-periodic" | "non_periodic" => Ok(Self::NonPeriodic),
            other => Err(EngineError::config(
                "boundaries",
                format!("unknown boundary mode `{other}` (expected periodic or nonperiodic)"),
            )),
        }
    }
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periodic => f.write_str("periodic"),
            Self::NonPeriodic => f.write_str("nonperiodic"),
        }
    }
}

/// Cardinal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards increasing row.
    North,
    /// Towards decreasing row.
    South,
    /// Towards increasing column.
    East,
    /// Towards decreasing column.
    West,
}

impl Direction {
    /// All four directions in deposit order.
    pub const ALL: [Direction; 4] = [Self::North, Self::South, Self::East, Self::West];
}

/// Index remap for one downflow direction: the upstream `(row, col)` of each cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Downflow {
    /// Row remap indexed by row.
    pub y: Vec<Option<usize>>,
    /// Column remap indexed by column.
    pub x: Vec<Option<usize>>,
}

/// Precomputed neighbour tables shared read-only by every grid of a simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    /// Number of rows.
    pub ydim: usize,
    /// Number of columns.
    pub xdim: usize,
    /// Mode of the north-south axis.
    pub mode_ns: BoundaryMode,
    /// Mode of the east-west axis.
    pub mode_ew: BoundaryMode,
    n1: Vec<usize>,
    s1: Vec<usize>,
    e1: Vec<usize>,
    w1: Vec<usize>,
    n1m: Vec<Option<usize>>,
    s1m: Vec<Option<usize>>,
    e1m: Vec<Option<usize>>,
    w1m: Vec<Option<usize>>,
    downflow_n: Downflow,
    downflow_s: Downflow,
    downflow_e: Downflow,
    downflow_w: Downflow,
}

impl Topology {
    /// Build tables for a `ydim x xdim` grid.
    pub fn new(ydim: usize, xdim: usize, mode_ns: BoundaryMode, mode_ew: BoundaryMode) -> Result<Self> {
        if ydim == 0 || xdim == 0 {
            return Err(EngineError::config("ydim/xdim", "grid dimensions must be positive"));
        }
        let (n1, s1, n1m, s1m) = axis_tables("row tables", ydim, mode_ns)?;
        let (e1, w1, e1m, w1m) = axis_tables("column tables", xdim, mode_ew)?;

        let rows: Vec<Option<usize>> = (0..ydim).map(Some).collect();
        let cols: Vec<Option<usize>> = (0..xdim).map(Some).collect();
        let downflow_n = Downflow { y: s1m.clone(), x: cols.clone() };
        let downflow_s = Downflow { y: n1m.clone(), x: cols };
        let downflow_e = Downflow { y: rows.clone(), x: w1m.clone() };
        let downflow_w = Downflow { y: rows, x: e1m.clone() };

        Ok(Self {
            ydim,
            xdim,
            mode_ns,
            mode_ew,
            n1,
            s1,
            e1,
            w1,
            n1m,
            s1m,
            e1m,
            w1m,
            downflow_n,
            downflow_s,
            downflow_e,
            downflow_w,
        })
    }

    /// Total number of cells.
    #[inline]
    pub fn cells(&self) -> usize {
        self.ydim * self.xdim
    }

    /// Row to inspect north of `y`.
    #[inline]
    pub fn north(&self, y: usize) -> usize {
        self.n1[y]
    }

    /// Row to inspect south of `y`.
    #[inline]
    pub fn south(&self, y: usize) -> usize {
        self.s1[y]
    }

    /// Column to inspect east of `x`.
    #[inline]
    pub fn east(&self, x: usize) -> usize {
        self.e1[x]
    }

    /// Column to inspect west of `x`.
    #[inline]
    pub fn west(&self, x: usize) -> usize {
        self.w1[x]
    }

    /// Destination row for mass moving north from `y`; `None` leaves the domain.
    #[inline]
    pub fn north_move(&self, y: usize) -> Option<usize> {
        self.n1m[y]
    }

    /// Destination row for mass moving south from `y`.
    #[inline]
    pub fn south_move(&self, y: usize) -> Option<usize> {
        self.s1m[y]
    }

    /// Destination column for mass moving east from `x`.
    #[inline]
    pub fn east_move(&self, x: usize) -> Option<usize> {
        self.e1m[x]
    }

    /// Destination column for mass moving west from `x`.
    #[inline]
    pub fn west_move(&self, x: usize) -> Option<usize> {
        self.w1m[x]
    }

    /// Read-neighbour `(row, col)` of `(y, x)` in direction `d`.
    pub fn read(&self, d: Direction, y: usize, x: usize) -> (usize, usize) {
        match d {
            Direction::North => (self.north(y), x),
            Direction::South => (self.south(y), x),
            Direction::East => (y, self.east(x)),
            Direction::West => (y, self.west(x)),
        }
    }

    /// Move destination `(row, col)` of `(y, x)` in direction `d`, if it stays in the domain.
    pub fn destination(&self, d: Direction, y: usize, x: usize) -> Option<(usize, usize)> {
        match d {
            Direction::North => self.north_move(y).map(|r| (r, x)),
            Direction::South => self.south_move(y).map(|r| (r, x)),
            Direction::East => self.east_move(x).map(|c| (y, c)),
            Direction::West => self.west_move(x).map(|c| (y, c)),
        }
    }

    /// Upstream index remap for flow heading in direction `d`.
    pub fn downflow(&self, d: Direction) -> &Downflow {
        match d {
            Direction::North => &self.downflow_n,
            Direction::South => &self.downflow_s,
            Direction::East => &self.downflow_e,
            Direction::West => &self.downflow_w,
        }
    }
}

type AxisTables = (Vec<usize>, Vec<usize>, Vec<Option<usize>>, Vec<Option<usize>>);

/// Forward/backward read and move tables along one axis of length `dim`.
fn axis_tables(what: &'static str, dim: usize, mode: BoundaryMode) -> Result<AxisTables> {
    let mut fwd = try_alloc(what, dim, 0usize)?;
    let mut back = try_alloc(what, dim, 0usize)?;
    let mut fwd_m = try_alloc(what, dim, None)?;
    let mut back_m = try_alloc(what, dim, None)?;
    for i in 0..dim {
        fwd[i] = if i + 1 < dim { i + 1 } else { 0 };
        back[i] = if i > 0 { i - 1 } else { dim - 1 };
        fwd_m[i] = Some(fwd[i]);
        back_m[i] = Some(back[i]);
    }
    if mode == BoundaryMode::NonPeriodic {
        fwd[dim - 1] = dim - 1;
        back[0] = 0;
        fwd_m[dim - 1] = None;
        back_m[0] = None;
    }
    Ok((fwd, back, fwd_m, back_m))
}
