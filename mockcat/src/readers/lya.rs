//! Lyman-alpha forest quasar mocks
//!
//! Each `<dir>/*.fits.gz` file holds one extension per quasar; the object
//! properties live in the extension headers, with positions in radians.

use std::f64::consts::PI;
use std::path::Path;

use log::info;
use rand::Rng;

use crate::catalog::{MockCatalog, TemplateSubtype};
use crate::error::{MockError, Result};
use crate::readers::{
    discover_sorted, positions, read_files, CatalogReader, MockContext, ReadRequest, Staged,
};
use crate::table::{Column, ColumnTable, HeaderCards};

/// File layout below the mock directory
pub const LYA_PATTERN: &str = "*.fits.gz";

const KEYS: [&str; 4] = ["ZQSO", "RA", "DEC", "MAG_G"];

/// Reader for `lya` sources
#[derive(Debug, Clone, Copy, Default)]
pub struct LyaReader;

fn header_values(headers: &[HeaderCards], key: &str, path: &Path) -> Result<Vec<f64>> {
    headers
        .iter()
        .enumerate()
        .map(|(i, cards)| {
            cards.f64(key).ok_or_else(|| MockError::MissingHeader {
                key: key.to_string(),
                hdu: i + 1,
                path: path.to_path_buf(),
            })
        })
        .collect()
}

fn load_lya_file(ctx: &MockContext<'_>, path: &Path) -> Result<ColumnTable> {
    info!("Reading {}", path.display());
    let headers = ctx.access.read_extension_headers(path, &KEYS)?;
    let mut table = positions(
        &header_values(&headers, "RA", path)?,
        &header_values(&headers, "DEC", path)?,
        180.0 / PI,
    )?;
    table.insert("Z", Column::F64(header_values(&headers, "ZQSO", path)?))?;
    table.insert("MAG", Column::F64(header_values(&headers, "MAG_G", path)?))?;
    Ok(table)
}

impl CatalogReader for LyaReader {
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog> {
        let files = discover_sorted(ctx.access, &req.location, LYA_PATTERN)?;
        let tables = read_files(&files, req.nproc, |path| load_lya_file(ctx, path))?;
        let mut staged = Staged::concat(files.into_iter().zip(tables).collect())?;
        info!(
            "Read {} objects from {} mock files",
            staged.len(),
            staged.files.len()
        );

        staged.keep_in_bounds(req.bounds)?;
        let (mut cat, table) = staged.finish(ctx, req, rng)?;

        cat.mag = Some(table.f64_column("MAG")?);
        cat.filtername = Some("sdss2010-g".to_string());
        cat.true_spectype = "QSO".to_string();
        cat.template_type = "QSO".to_string();
        cat.template_subtype = TemplateSubtype::Uniform("LYA".to_string());
        Ok(cat)
    }
}
