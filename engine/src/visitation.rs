//! Randomised cell visitation order.
//!
//! Holds a permutation of linear cell indices `k`, decoded as `row = k % ydim`,
//! `col = k / ydim`. Reshuffled before every squish pass so in-place updates carry no
//! scan-order bias.

use rand::Rng;

use crate::error::{try_alloc, Result};

/// Permutation of all `(row, col)` coordinates of a grid.
#[derive(Clone, Debug)]
pub struct Visitation {
    ydim: usize,
    order: Vec<usize>,
    ys: Vec<usize>,
    xs: Vec<usize>,
}

impl Visitation {
    /// Start from the identity permutation and shuffle it once.
    pub fn new<R: Rng + ?Sized>(ydim: usize, xdim: usize, rng: &mut R) -> Result<Self> {
        let n = ydim * xdim;
        let mut order = try_alloc("visitation order", n, 0usize)?;
        for (i, k) in order.iter_mut().enumerate() {
            *k = i;
        }
        let ys = try_alloc("visitation rows", n, 0usize)?;
        let xs = try_alloc("visitation cols", n, 0usize)?;
        let mut v = Self { ydim, order, ys, xs };
        v.reshuffle(rng);
        Ok(v)
    }

    /// Uniform in-place shuffle (swap from the end), then decode to coordinates.
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for i in (1..self.order.len()).rev() {
            let r = rng.gen_range(0..=i);
            self.order.swap(i, r);
        }
        for (i, &k) in self.order.iter().enumerate() {
            self.ys[i] = k % self.ydim;
            self.xs[i] = k / self.ydim;
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True for an empty grid.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(row, col)` visited at position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> (usize, usize) {
        (self.ys[i], self.xs[i])
    }

    /// Linear indices in visitation order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Coordinates in visitation order.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.ys.iter().copied().zip(self.xs.iter().copied())
    }
}
