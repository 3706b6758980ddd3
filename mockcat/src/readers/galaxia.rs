//! Galaxia Milky Way star mocks, split over many files under `<dir>/*/*/`

use std::path::Path;

use log::info;
use rand::Rng;

use crate::catalog::MockCatalog;
use crate::error::Result;
use crate::readers::{
    discover_sorted, positions, read_files, CatalogReader, MockContext, ReadRequest, Staged,
};
use crate::sky::C_LIGHT_KMS;
use crate::table::{Column, ColumnTable};

/// File layout below the mock directory
pub const GALAXIA_PATTERN: &str = "*/*/*.fits";

const COLUMNS: [&str; 8] = [
    "RA",
    "DEC",
    "V_HELIO",
    "SDSSR_TRUE_NODUST",
    "SDSSR_OBS",
    "TEFF",
    "LOGG",
    "FEH",
];

/// Reader for `galaxia` sources
#[derive(Debug, Clone, Copy, Default)]
pub struct GalaxiaReader;

/// Read and normalize one Galaxia file
///
/// `TEFF` is stored as log10 and converted to Kelvin. `MAG` is the
/// extinction-free SDSS r magnitude and `MAG_OBS` the observed one.
fn load_galaxia_file(ctx: &MockContext<'_>, path: &Path) -> Result<ColumnTable> {
    let raw = ctx.access.read_table(path, &COLUMNS)?;
    let mut table = positions(&raw.f64_column("RA")?, &raw.f64_column("DEC")?, 1.0)?;
    let z = raw
        .f64_column("V_HELIO")?
        .into_iter()
        .map(|v| v / C_LIGHT_KMS)
        .collect();
    let teff = raw
        .f64_column("TEFF")?
        .into_iter()
        .map(|t| 10f64.powf(t))
        .collect();
    table.insert("Z", Column::F64(z))?;
    table.insert("MAG", Column::F64(raw.f64_column("SDSSR_TRUE_NODUST")?))?;
    table.insert("MAG_OBS", Column::F64(raw.f64_column("SDSSR_OBS")?))?;
    table.insert("TEFF", Column::F64(teff))?;
    table.insert("LOGG", Column::F64(raw.f64_column("LOGG")?))?;
    table.insert("FEH", Column::F64(raw.f64_column("FEH")?))?;
    Ok(table)
}

impl CatalogReader for GalaxiaReader {
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog> {
        let files = discover_sorted(ctx.access, &req.location, GALAXIA_PATTERN)?;
        let tables = read_files(&files, req.nproc, |path| load_galaxia_file(ctx, path))?;
        let mut staged = Staged::concat(files.into_iter().zip(tables).collect())?;
        info!(
            "Read {} objects from {} mock files",
            staged.len(),
            staged.files.len()
        );

        staged.keep_in_bounds(req.bounds)?;
        staged.keep_brighter("MAG", req.magcut)?;
        let (mut cat, table) = staged.finish(ctx, req, rng)?;

        cat.mag = Some(table.f64_column("MAG")?);
        cat.mag_obs = Some(table.f64_column("MAG_OBS")?);
        cat.teff = Some(table.f64_column("TEFF")?);
        cat.logg = Some(table.f64_column("LOGG")?);
        cat.feh = Some(table.f64_column("FEH")?);
        cat.filtername = Some("sdss2010-r".to_string());
        cat.true_spectype = "STAR".to_string();
        cat.template_type = "STAR".to_string();
        Ok(cat)
    }
}
