//! Error taxonomy for the bed model.
//!
//! Every failure the engine can detect is fatal to the run; nothing is retried. Callers
//! map an [`EngineError`] to a process exit code with [`EngineError::exit_code`].

use std::path::PathBuf;

use crate::raster::ascii::RasterError;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Fatal conditions raised by the engine and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or malformed parameter, or an unstable parameter combination.
    #[error("configuration error in `{key}`: {reason}")]
    Config {
        /// Offending simfile key
        key: String,
        /// Human-readable reason
        reason: String,
    },
    /// Filesystem failure on a named path.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Storage for a grid or lookup table could not be reserved.
    #[error("allocation of {len} elements for {what} failed")]
    Allocation {
        /// What was being allocated
        what: &'static str,
        /// Requested element count
        len: usize,
    },
    /// A physical bound was broken (NaN, ice below bed, bed below basement, ...).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// Two grids that must share geometry do not.
    #[error("dimension mismatch: expected {expected_y}x{expected_x}, found {found_y}x{found_x}")]
    DimensionMismatch {
        /// Expected rows
        expected_y: usize,
        /// Expected columns
        expected_x: usize,
        /// Found rows
        found_y: usize,
        /// Found columns
        found_x: usize,
    },
    /// Reading or writing an ASCII grid failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
    /// The external plotting utility reported failure.
    #[error("progress utility `{command}` failed: {reason}")]
    Progress {
        /// Command line that was run
        command: String,
        /// Exit status or spawn error
        reason: String,
    },
    /// An operation was called in the wrong engine state.
    #[error("lifecycle error: {0}")]
    Lifecycle(&'static str),
}

impl EngineError {
    /// Build a configuration error for `key`.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config { key: key.into(), reason: reason.into() }
    }

    /// Build an io error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Distinct process exit code per error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Allocation { .. } => 10,
            Self::InvariantViolation(_) => 11,
            Self::Io { .. } | Self::Raster(_) => 12,
            Self::DimensionMismatch { .. } => 13,
            Self::Progress { .. } => 14,
            Self::Lifecycle(_) => 15,
        }
    }
}

/// Reserve a vector of exactly `len` elements, reporting failure instead of aborting.
pub(crate) fn try_alloc<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len).map_err(|_| EngineError::Allocation { what, len })?;
    v.resize(len, value);
    Ok(v)
}
