//! ESRI ASCII grid persistence.
//!
//! Six `key value` header lines (`ncols nrows xllcorner yllcorner cellsize NODATA_value`,
//! any order, keys case-insensitive) followed by `nrows` rows of `ncols` values, northernmost
//! row first. Values are written in shortest round-trip form.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Raster;
use crate::error::Result;
use crate::topology::{BoundaryMode, Topology};

const HEADER_KEYS: [&str; 6] = ["ncols", "nrows", "xllcorner", "yllcorner", "cellsize", "nodata_value"];

/// Errors raised while reading or writing an ASCII grid.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// Filesystem failure.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Header missing a key or carrying an unparsable value.
    #[error("bad grid header in {}: {reason}", path.display())]
    Header {
        /// File being read
        path: PathBuf,
        /// What was wrong
        reason: String,
    },
    /// Cell block too short or holding a non-number.
    #[error("bad grid data in {}: {reason}", path.display())]
    Data {
        /// File being read
        path: PathBuf,
        /// What was wrong
        reason: String,
    },
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

impl Raster {
    /// Read an ASCII grid, allocating a raster with the dimensions found in its header.
    pub fn read_ascii<P: AsRef<Path>>(path: P, mode_ns: BoundaryMode, mode_ew: BoundaryMode) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| RasterError::Io { path: path.to_path_buf(), source })?;
        let mut tokens = text.split_whitespace();

        let header_err = |reason: String| RasterError::Header { path: path.to_path_buf(), reason };
        let mut h = Header::default();
        for _ in 0..HEADER_KEYS.len() {
            let key = tokens.next().ok_or_else(|| header_err("truncated header".into()))?;
            let value = tokens.next().ok_or_else(|| header_err(format!("no value for `{key}`")))?;
            let bad = || header_err(format!("`{key}` has unparsable value `{value}`"));
            match key.to_ascii_lowercase().as_str() {
                "ncols" => h.ncols = Some(value.parse().map_err(|_| bad())?),
                "nrows" => h.nrows = Some(value.parse().map_err(|_| bad())?),
                "xllcorner" => h.xll = Some(value.parse().map_err(|_| bad())?),
                "yllcorner" => h.yll = Some(value.parse().map_err(|_| bad())?),
                "cellsize" => h.cellsize = Some(value.parse().map_err(|_| bad())?),
                "nodata_value" => h.nodata = Some(value.parse().map_err(|_| bad())?),
                other => return Err(header_err(format!("unexpected key `{other}`")).into()),
            }
        }
        let missing = |k: &str| header_err(format!("missing `{k}`"));
        let xdim = h.ncols.ok_or_else(|| missing("ncols"))?;
        let ydim = h.nrows.ok_or_else(|| missing("nrows"))?;
        let xll = h.xll.ok_or_else(|| missing("xllcorner"))?;
        let yll = h.yll.ok_or_else(|| missing("yllcorner"))?;
        let cellsize = h.cellsize.ok_or_else(|| missing("cellsize"))?;
        let nodata = h.nodata.ok_or_else(|| missing("NODATA_value"))?;

        let topo = Topology::new(ydim, xdim, mode_ns, mode_ew)?;
        let mut r = Raster::new(Arc::new(topo), xll, yll, cellsize)?;
        r.nodata = nodata;

        let data_err = |reason: String| RasterError::Data { path: path.to_path_buf(), reason };
        // File rows run north to south.
        for row in 0..ydim {
            let y = ydim - 1 - row;
            for x in 0..xdim {
                let tok = tokens
                    .next()
                    .ok_or_else(|| data_err(format!("expected {} values, file ended early", ydim * xdim)))?;
                let v: f64 = tok
                    .parse()
                    .map_err(|_| data_err(format!("row {row} col {x}: `{tok}` is not a number")))?;
                r.set(y, x, v);
            }
        }
        Ok(r)
    }

    /// Write the raster as an ASCII grid.
    pub fn write_ascii<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| RasterError::Io { path: path.to_path_buf(), source };
        let file = File::create(path).map_err(io_err)?;
        let mut w = BufWriter::new(file);
        self.write_ascii_to(&mut w).map_err(io_err)?;
        w.flush().map_err(io_err)?;
        Ok(())
    }

    fn write_ascii_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "ncols {}", self.xdim)?;
        writeln!(w, "nrows {}", self.ydim)?;
        writeln!(w, "xllcorner {}", self.xll)?;
        writeln!(w, "yllcorner {}", self.yll)?;
        writeln!(w, "cellsize {}", self.cellsize)?;
        writeln!(w, "NODATA_value {}", self.nodata)?;
        for y in (0..self.ydim).rev() {
            for x in 0..self.xdim {
                if x > 0 {
                    w.write_all(b" ")?;
                }
                write!(w, "{}", self.get(y, x))?;
            }
            w.write_all(b"\n")?;
        }
        Ok(())
    }
}
