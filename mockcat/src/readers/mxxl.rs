//! Durham MXXL bright galaxy light cone, stored as datasets of one HDF5 group

use log::info;
use rand::Rng;

use crate::catalog::MockCatalog;
use crate::error::Result;
use crate::readers::{positions, require_source, CatalogReader, MockContext, ReadRequest, Staged};
use crate::sample::sample_vdisp;
use crate::table::Column;

/// Group holding the light-cone datasets
pub const MXXL_GROUP: &str = "Data";

const DATASETS: [&str; 6] = ["ra", "dec", "z_obs", "app_mag", "abs_mag", "g_r"];
const BGS_LOGVDISP: (f64, f64) = (1.9, 0.15);

/// Reader for `durham_mxxl_hdf5` sources
#[derive(Debug, Clone, Copy, Default)]
pub struct MxxlReader;

impl CatalogReader for MxxlReader {
    /// Velocity dispersions are drawn after the seeds.
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog> {
        let path = &req.location;
        require_source(ctx.access, path)?;
        let raw = ctx.access.read_datasets(path, MXXL_GROUP, &DATASETS)?;

        let mut table = positions(&raw.f64_column("ra")?, &raw.f64_column("dec")?, 1.0)?;
        table.insert("Z", Column::F64(raw.f64_column("z_obs")?))?;
        table.insert("MAG", Column::F64(raw.f64_column("app_mag")?))?;
        table.insert("ABSMAG", Column::F64(raw.f64_column("abs_mag")?))?;
        table.insert("GR", Column::F64(raw.f64_column("g_r")?))?;
        info!("Read {} objects from {}", table.nrows(), path.display());

        let mut staged = Staged::single(path.clone(), table)?;
        staged.keep_in_bounds(req.bounds)?;
        staged.keep_brighter("MAG", req.magcut)?;
        let (mut cat, table) = staged.finish(ctx, req, rng)?;

        let (mean, sigma) = BGS_LOGVDISP;
        cat.vdisp = Some(sample_vdisp(mean, sigma, cat.len(), rng)?);
        cat.mag = Some(table.f64_column("MAG")?);
        cat.sdss_absmag_r01 = Some(table.f64_column("ABSMAG")?);
        cat.sdss_01gr = Some(table.f64_column("GR")?);
        cat.filtername = Some("sdss2010-r".to_string());
        cat.true_spectype = "GALAXY".to_string();
        cat.template_type = "BGS".to_string();
        Ok(cat)
    }
}
