//! Per-format mock catalog readers
//!
//! Every supported mock layout has one reader. All of them follow the same
//! pipeline:
//!
//! 1. Read the raw columns of each input file through [`CatalogAccess`] and
//!    normalize them (RA wrapped into `[0, 360)`, velocities to `v/c`, ...).
//! 2. Concatenate multi-file sources ordered by file base name.
//! 3. Apply the spatial filter, then the magnitude cut where the format has one.
//! 4. Recount objects per file, encode mock ids, name bricks and draw one seed
//!    per retained object.
//! 5. Fill the class-specific columns, drawing any further random numbers
//!    (mixture-model photometry, then velocity dispersions).
//!
//! Steps 3-4 are shared through `Staged`; readers only differ in what they
//! read and what they add afterwards.

pub mod durham;
pub mod galaxia;
pub mod gaussianfield;
pub mod gums;
pub mod lya;
pub mod mxxl;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::access::CatalogAccess;
use crate::catalog::{MockCatalog, ObjectClass};
use crate::config::{ForestConfig, DEFAULT_BRICKSIZE};
use crate::error::{MockError, Result};
use crate::mockid::make_mockid;
use crate::sample::SampleGmm;
use crate::sky::{normalize_ra, RegionNamer, SkyBounds};
use crate::table::{Column, ColumnTable};

pub use durham::{read_mock_durham, TractorTable};
pub use galaxia::GalaxiaReader;
pub use gaussianfield::GaussianFieldReader;
pub use gums::{Gums100pcReader, GumsWdReader};
pub use lya::LyaReader;
pub use mxxl::MxxlReader;

/// Row number of an object within its input file
pub(crate) const OBJID: &str = "OBJID";
/// Position of the input file in the source's file list
pub(crate) const FILENUM: &str = "FILENUM";

/// Supported mock layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MockFormat {
    /// GUMS-based catalog of stars within 100 pc
    #[serde(rename = "100pc")]
    Gums100pc,
    /// GUMS-based white dwarf catalog
    #[serde(rename = "wd")]
    GumsWd,
    /// Gaussian random field mocks of ELG/LRG/QSO, or a SKY position file
    #[serde(rename = "gaussianfield")]
    GaussianField,
    /// Durham MXXL light cone of bright galaxies
    #[serde(rename = "durham_mxxl_hdf5")]
    DurhamMxxlHdf5,
    /// Galaxia Milky Way stars spread over many files
    #[serde(rename = "galaxia")]
    Galaxia,
    /// Lyman-alpha forest quasars, one HDU per object
    #[serde(rename = "lya")]
    Lya,
}

impl MockFormat {
    pub const ALL: [MockFormat; 6] = [
        MockFormat::Gums100pc,
        MockFormat::GumsWd,
        MockFormat::GaussianField,
        MockFormat::DurhamMxxlHdf5,
        MockFormat::Galaxia,
        MockFormat::Lya,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MockFormat::Gums100pc => "100pc",
            MockFormat::GumsWd => "wd",
            MockFormat::GaussianField => "gaussianfield",
            MockFormat::DurhamMxxlHdf5 => "durham_mxxl_hdf5",
            MockFormat::Galaxia => "galaxia",
            MockFormat::Lya => "lya",
        }
    }
}

impl fmt::Display for MockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MockFormat {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self> {
        MockFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MockError::Unrecognized {
                kind: "mock format",
                name: s.to_string(),
            })
    }
}

/// Per-call reader parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    /// File, directory or file-set root, depending on the format
    pub location: PathBuf,
    /// Target class being read
    pub class: ObjectClass,
    /// Brick size in degrees for region names
    pub bricksize: f64,
    /// Optional inclusive footprint
    pub bounds: Option<SkyBounds>,
    /// Keep only objects brighter than this, for formats with a magnitude cut
    pub magcut: Option<f64>,
    /// Worker threads for per-file reads
    pub nproc: usize,
    /// Absorption-forest catalog merged into gaussianfield QSOs
    pub forest: Option<ForestConfig>,
}

impl ReadRequest {
    pub fn new(location: impl Into<PathBuf>, class: ObjectClass) -> Self {
        Self {
            location: location.into(),
            class,
            bricksize: DEFAULT_BRICKSIZE,
            bounds: None,
            magcut: None,
            nproc: 1,
            forest: None,
        }
    }

    pub fn with_bounds(mut self, bounds: SkyBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_magcut(mut self, magcut: f64) -> Self {
        self.magcut = Some(magcut);
        self
    }

    pub fn with_nproc(mut self, nproc: usize) -> Self {
        self.nproc = nproc;
        self
    }

    pub fn with_bricksize(mut self, bricksize: f64) -> Self {
        self.bricksize = bricksize;
        self
    }

    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = Some(forest);
        self
    }
}

/// Collaborators shared by all readers of a run
#[derive(Clone, Copy)]
pub struct MockContext<'a> {
    pub access: &'a dyn CatalogAccess,
    pub namer: &'a dyn RegionNamer,
    pub mixtures: Option<&'a SampleGmm>,
}

impl<'a> MockContext<'a> {
    pub fn new(access: &'a dyn CatalogAccess, namer: &'a dyn RegionNamer) -> Self {
        Self {
            access,
            namer,
            mixtures: None,
        }
    }

    pub fn with_mixtures(mut self, mixtures: &'a SampleGmm) -> Self {
        self.mixtures = Some(mixtures);
        self
    }

    pub(crate) fn mixtures(&self, class: ObjectClass) -> Result<&'a SampleGmm> {
        self.mixtures
            .ok_or_else(|| MockError::MissingMixtureModel(class.to_string()))
    }
}

/// A reader for one mock layout
pub trait CatalogReader {
    /// Read, filter and normalize the mock described by `req`
    ///
    /// `rng` is consumed in a fixed order: one `u32` seed per retained object,
    /// then any class-specific draws documented by the reader.
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog>;
}

impl CatalogReader for MockFormat {
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog> {
        match self {
            MockFormat::Gums100pc => Gums100pcReader.read(ctx, req, rng),
            MockFormat::GumsWd => GumsWdReader.read(ctx, req, rng),
            MockFormat::GaussianField => GaussianFieldReader.read(ctx, req, rng),
            MockFormat::DurhamMxxlHdf5 => MxxlReader.read(ctx, req, rng),
            MockFormat::Galaxia => GalaxiaReader.read(ctx, req, rng),
            MockFormat::Lya => LyaReader.read(ctx, req, rng),
        }
    }
}

/// Fail with `MissingSource` unless the backend can see `path`
pub(crate) fn require_source(access: &dyn CatalogAccess, path: &Path) -> Result<()> {
    if access.exists(path) {
        Ok(())
    } else {
        Err(MockError::MissingSource(path.to_path_buf()))
    }
}

/// Files matching `pattern` under `dir`, ordered by base name then full path
///
/// A missing `dir` is `MissingSource`; an existing one without matches is
/// `NoFilesFound`.
pub(crate) fn discover_sorted(
    access: &dyn CatalogAccess,
    dir: &Path,
    pattern: &str,
) -> Result<Vec<PathBuf>> {
    require_source(access, dir)?;
    let full = dir.join(pattern);
    let full = full.to_string_lossy();
    let mut files = access.discover(&full)?;
    if files.is_empty() {
        return Err(MockError::NoFilesFound(full.into_owned()));
    }
    sort_by_basename(&mut files);
    Ok(files)
}

/// Order paths by base name, breaking ties by the full path
pub fn sort_by_basename(files: &mut [PathBuf]) {
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
}

/// Read every file independently, on `nproc` worker threads when `nproc > 1`
///
/// Results come back in the order of `files` regardless of completion order.
pub(crate) fn read_files<T, F>(files: &[PathBuf], nproc: usize, read_one: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Send + Sync,
{
    if nproc > 1 && files.len() > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(nproc)
            .build()?;
        pool.install(|| files.par_iter().map(|p| read_one(p)).collect())
    } else {
        files.iter().map(|p| read_one(p)).collect()
    }
}

/// Table with normalized `RA`/`DEC` columns built from raw coordinates
///
/// `scale` converts the raw unit to degrees (1 for degrees).
pub(crate) fn positions(ra: &[f64], dec: &[f64], scale: f64) -> Result<ColumnTable> {
    let mut table = ColumnTable::new();
    table.insert(
        "RA",
        Column::F64(ra.iter().map(|&r| normalize_ra(r * scale)).collect()),
    )?;
    table.insert("DEC", Column::F64(dec.iter().map(|&d| d * scale).collect()))?;
    Ok(table)
}

/// Rows of a source between reading and finishing
///
/// The table always carries `OBJID`, `FILENUM`, `RA`, `DEC` and `Z` plus
/// whatever per-object columns the reader needs afterwards.
#[derive(Debug, Clone)]
pub(crate) struct Staged {
    pub table: ColumnTable,
    pub files: Vec<PathBuf>,
}

impl Staged {
    /// Rows read from a single file, numbered from zero
    pub fn single(path: PathBuf, table: ColumnTable) -> Result<Self> {
        Self::concat(vec![(path, table)])
    }

    /// Per-file tables in file order
    pub fn concat(parts: Vec<(PathBuf, ColumnTable)>) -> Result<Self> {
        let mut staged = Staged {
            table: ColumnTable::new(),
            files: Vec::with_capacity(parts.len()),
        };
        for (path, mut table) in parts {
            let n = table.nrows();
            let filenum = staged.files.len() as i64;
            table.insert(OBJID, Column::I64((0..n as i64).collect()))?;
            table.insert(FILENUM, Column::I64(vec![filenum; n]))?;
            staged.table.append(&table)?;
            staged.files.push(path);
        }
        Ok(staged)
    }

    /// Append another source, offsetting its file numbers past ours
    pub fn chain(mut self, other: Staged) -> Result<Self> {
        let offset = self.files.len() as i64;
        let mut table = other.table;
        let shifted: Vec<i64> = table
            .i64_column(FILENUM)?
            .into_iter()
            .map(|f| f + offset)
            .collect();
        table.insert(FILENUM, Column::I64(shifted))?;
        self.table.append(&table)?;
        self.files.extend(other.files);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.table.nrows()
    }

    /// Drop rows outside `bounds`; an empty result is an error
    pub fn keep_in_bounds(&mut self, bounds: Option<SkyBounds>) -> Result<()> {
        let Some(bounds) = bounds else {
            return Ok(());
        };
        let mask = bounds.mask(
            &self.table.f64_column("RA")?,
            &self.table.f64_column("DEC")?,
        );
        if !mask.iter().any(|&m| m) {
            return Err(MockError::EmptyRegion(bounds));
        }
        self.table = self.table.filter(&mask)?;
        info!("Trimmed to {} objects in range {}", self.len(), bounds);
        Ok(())
    }

    /// Keep rows with `column < magcut`; an empty result is an error
    pub fn keep_brighter(&mut self, column: &str, magcut: Option<f64>) -> Result<()> {
        let Some(magcut) = magcut else {
            return Ok(());
        };
        let mask: Vec<bool> = self
            .table
            .f64_column(column)?
            .iter()
            .map(|&m| m < magcut)
            .collect();
        if !mask.iter().any(|&m| m) {
            return Err(MockError::EmptyMagnitudeCut(magcut));
        }
        self.table = self.table.filter(&mask)?;
        info!("Trimmed to {} objects with mag < {}", self.len(), magcut);
        Ok(())
    }

    /// Encode ids, name bricks and draw seeds for the retained rows
    ///
    /// Files that lost all their rows keep a zero count so file numbers stay
    /// stable. Returns the catalog core and the remaining staged columns.
    pub fn finish<R: Rng + ?Sized>(
        self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<(MockCatalog, ColumnTable)> {
        let objid = self.table.i64_column(OBJID)?;
        let filenum = self.table.i64_column(FILENUM)?;

        let mut n_per_file = vec![0usize; self.files.len()];
        for &f in &filenum {
            n_per_file[f as usize] += 1;
        }
        let mockid = make_mockid(&objid, &n_per_file)?;

        let ra = self.table.f64_column("RA")?;
        let dec = self.table.f64_column("DEC")?;
        let z = self.table.f64_column("Z")?;
        let brickname = ctx.namer.bricknames(&ra, &dec, req.bricksize)?;
        let seed: Vec<u32> = (0..ra.len()).map(|_| rng.gen()).collect();

        let catalog = MockCatalog {
            objid,
            mockid,
            ra,
            dec,
            z,
            brickname,
            seed,
            files: self.files,
            n_per_file,
            ..Default::default()
        };
        Ok((catalog, self.table))
    }
}
