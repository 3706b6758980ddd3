//! Sky-coordinate helpers: RA wrapping, rectangular footprints and brick names

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MockError, Result};

/// Speed of light in km/s, used to turn radial velocities into `v/c`
pub const C_LIGHT_KMS: f64 = 299_792.458;

/// Wrap a right ascension into `[0, 360)` degrees
pub fn normalize_ra(ra: f64) -> f64 {
    let wrapped = ra.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Inclusive rectangular footprint `(ra_min, ra_max, dec_min, dec_max)` in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct SkyBounds {
    pub ra_min: f64,
    pub ra_max: f64,
    pub dec_min: f64,
    pub dec_max: f64,
}

impl SkyBounds {
    pub fn new(ra_min: f64, ra_max: f64, dec_min: f64, dec_max: f64) -> Self {
        Self {
            ra_min,
            ra_max,
            dec_min,
            dec_max,
        }
    }

    /// The whole sky
    pub fn all_sky() -> Self {
        Self::new(0.0, 360.0, -90.0, 90.0)
    }

    /// True if the position lies inside the footprint, edges included
    pub fn contains(&self, ra: f64, dec: f64) -> bool {
        ra >= self.ra_min && ra <= self.ra_max && dec >= self.dec_min && dec <= self.dec_max
    }

    /// Boolean keep-mask over parallel coordinate arrays
    pub fn mask(&self, ra: &[f64], dec: &[f64]) -> Vec<bool> {
        ra.iter()
            .zip(dec)
            .map(|(&r, &d)| self.contains(r, d))
            .collect()
    }
}

impl From<[f64; 4]> for SkyBounds {
    fn from(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<SkyBounds> for [f64; 4] {
    fn from(b: SkyBounds) -> Self {
        [b.ra_min, b.ra_max, b.dec_min, b.dec_max]
    }
}

impl fmt::Display for SkyBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RA={}, {}, Dec={}, {}",
            self.ra_min, self.ra_max, self.dec_min, self.dec_max
        )
    }
}

/// Maps sky positions to region labels at a given brick size
pub trait RegionNamer: Send + Sync {
    /// Region label of each `(ra, dec)` pair, in input order
    fn bricknames(&self, ra: &[f64], dec: &[f64], bricksize: f64) -> Result<Vec<String>>;
}

/// Equal-area-ish brick tiling of the sphere
///
/// Rows have height `bricksize` and are centred on `-90 + i * bricksize`.
/// Each row is cut into an even number of columns proportional to the cosine
/// of its edge closest to the equator.
#[derive(Debug, Clone)]
pub struct BrickGrid {
    bricksize: f64,
    ncol_per_row: Vec<usize>,
}

impl BrickGrid {
    /// Grid for `bricksize` degrees, which must lie in `(0, 180]`
    pub fn new(bricksize: f64) -> Result<Self> {
        if !(bricksize > 0.0 && bricksize <= 180.0) {
            return Err(MockError::Config(format!(
                "bricksize must be in (0, 180] degrees, got {bricksize}"
            )));
        }
        let nrow = (180.0 / bricksize) as usize + 1;
        let ncol_per_row = (0..nrow)
            .map(|i| {
                let dec_c = -90.0 + i as f64 * bricksize;
                let dec_lo = dec_c.abs() - bricksize / 2.0;
                let n = 360.0 / bricksize * dec_lo.to_radians().cos();
                ((n / 2.0).ceil() as usize * 2).max(1)
            })
            .collect();
        Ok(Self {
            bricksize,
            ncol_per_row,
        })
    }

    pub fn bricksize(&self) -> f64 {
        self.bricksize
    }

    pub fn nrow(&self) -> usize {
        self.ncol_per_row.len()
    }

    /// Row index containing `dec`
    pub fn row(&self, dec: f64) -> usize {
        let irow = ((dec + 90.0 + self.bricksize / 2.0) / self.bricksize).floor();
        (irow.max(0.0) as usize).min(self.nrow() - 1)
    }

    /// Centre `(ra, dec)` of the brick containing the position
    pub fn brick_center(&self, ra: f64, dec: f64) -> (f64, f64) {
        let irow = self.row(dec);
        let ncol = self.ncol_per_row[irow];
        let width = 360.0 / ncol as f64;
        let icol = ((normalize_ra(ra) / width).floor() as usize).min(ncol - 1);
        let ra_c = (icol as f64 + 0.5) * width;
        let dec_c = -90.0 + irow as f64 * self.bricksize;
        (ra_c, dec_c)
    }

    /// Brick name such as `1234p567` built from the brick centre
    pub fn brickname(&self, ra: f64, dec: f64) -> String {
        let (ra_c, dec_c) = self.brick_center(ra, dec);
        let pm = if dec_c >= 0.0 { 'p' } else { 'm' };
        format!(
            "{:04}{}{:03}",
            (ra_c * 10.0) as i64,
            pm,
            (dec_c.abs() * 10.0) as i64
        )
    }
}

/// Default [`RegionNamer`] backed by a [`BrickGrid`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Bricks;

impl RegionNamer for Bricks {
    fn bricknames(&self, ra: &[f64], dec: &[f64], bricksize: f64) -> Result<Vec<String>> {
        let grid = BrickGrid::new(bricksize)?;
        Ok(ra
            .iter()
            .zip(dec)
            .map(|(&r, &d)| grid.brickname(r, d))
            .collect())
    }
}
