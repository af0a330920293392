//! Courant number checks for the donor-cell ice advection scheme.
//!
//! Ice moving at rate `u` for a step `dt` across cells of width `W` travels a fraction
//! C = u * dt / W of a cell. The upwind update takes weight C from the upstream cell and
//! 1 - C from the cell itself, so it is only stable (all weights non-negative) for C ≤ 1.

/// Stability limit configuration.
#[derive(Clone, Copy, Debug)]
pub struct CflConfig {
    /// Maximum allowed Courant number (default: 1.0).
    pub max_cfl: f64,
}

impl Default for CflConfig {
    fn default() -> Self {
        Self { max_cfl: 1.0 }
    }
}

/// Outcome of a stability check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CflResult {
    /// Courant number u * dt / W.
    pub courant: f64,
    /// Whether the Courant number is within the configured limit.
    pub stable: bool,
}

/// Courant number for `rate` over `dt` across `width`; infinite for a non-positive width.
pub fn courant(rate: f64, dt: f64, width: f64) -> f64 {
    if width > 0.0 {
        (rate * dt).abs() / width
    } else {
        f64::INFINITY
    }
}

/// Check the advection step against `config`.
pub fn check(rate: f64, dt: f64, width: f64, config: CflConfig) -> CflResult {
    let c = courant(rate, dt, width);
    CflResult { courant: c, stable: c <= config.max_cfl }
}

/// Donor-cell weights `(upstream, self)` for one advection step.
pub fn donor_weights(rate: f64, dt: f64, width: f64) -> (f64, f64) {
    let w = rate * dt / width;
    (w, 1.0 - w)
}
