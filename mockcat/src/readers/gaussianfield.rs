//! Gaussian random field mocks of ELGs, LRGs and QSOs, plus SKY positions
//!
//! The field mocks only carry positions and redshifts, so photometry comes
//! from the class mixture model. QSO sources can additionally merge an
//! absorption-forest catalog, whose rows keep their own g-band magnitudes and
//! are tagged with the `LYA` template subtype.

use std::path::{Path, PathBuf};

use log::info;
use rand::Rng;

use crate::catalog::{MockCatalog, ObjectClass, TemplateSubtype};
use crate::error::{MockError, Result};
use crate::readers::{positions, require_source, CatalogReader, MockContext, ReadRequest, Staged};
use crate::sample::sample_vdisp;
use crate::table::Column;

/// Magnitude of rows whose photometry has not been assigned yet
pub const MAG_PLACEHOLDER: f64 = -1.0;
/// Subtype given to absorption-forest quasars
pub const LYA_SUBTYPE: &str = "LYA";

const ELG_LOGVDISP: (f64, f64) = (1.9, 0.15);
const LRG_LOGVDISP: (f64, f64) = (2.3, 0.1);

/// Reader for `gaussianfield` sources
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianFieldReader;

/// Path of the field mock for `class`: the SKY file itself, or `<dir>/<CLASS>.fits`
pub fn mock_file(location: &Path, class: ObjectClass) -> PathBuf {
    if class == ObjectClass::Sky {
        location.to_path_buf()
    } else {
        location.join(format!("{}.fits", class.as_str()))
    }
}

fn read_field(ctx: &MockContext<'_>, path: &Path, class: ObjectClass) -> Result<Staged> {
    require_source(ctx.access, path)?;
    let sky = class == ObjectClass::Sky;
    let columns: &[&str] = if sky {
        &["RA", "DEC"]
    } else {
        &["RA", "DEC", "Z_COSMO", "DZ_RSD"]
    };
    let raw = ctx.access.read_table(path, columns)?;
    let mut table = positions(&raw.f64_column("RA")?, &raw.f64_column("DEC")?, 1.0)?;
    let n = table.nrows();

    let z = if sky {
        vec![0.0; n]
    } else {
        raw.f64_column("Z_COSMO")?
            .iter()
            .zip(raw.f64_column("DZ_RSD")?)
            .map(|(zc, dz)| zc + dz)
            .collect()
    };
    table.insert("Z", Column::F64(z))?;
    table.insert("MAG", Column::F64(vec![MAG_PLACEHOLDER; n]))?;
    table.insert("SUBTYPE", Column::Str(vec![String::new(); n]))?;

    info!("Read {} objects from {}", n, path.display());
    Staged::single(path.to_path_buf(), table)
}

fn read_forest(ctx: &MockContext<'_>, path: &Path) -> Result<Staged> {
    require_source(ctx.access, path)?;
    let raw = ctx.access.read_table(path, &["RA", "DEC", "Z", "MAG_G"])?;
    let mut table = positions(&raw.f64_column("RA")?, &raw.f64_column("DEC")?, 1.0)?;
    let n = table.nrows();
    table.insert("Z", Column::F64(raw.f64_column("Z")?))?;
    table.insert("MAG", Column::F64(raw.f64_column("MAG_G")?))?;
    table.insert("SUBTYPE", Column::Str(vec![LYA_SUBTYPE.to_string(); n]))?;

    info!("Read {} objects from {}", n, path.display());
    Staged::single(path.to_path_buf(), table)
}

impl CatalogReader for GaussianFieldReader {
    /// Draw order after the seeds: mixture-model photometry for non-SKY
    /// classes, then velocity dispersions for ELG and LRG.
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog> {
        let class = req.class;
        if !matches!(
            class,
            ObjectClass::Elg | ObjectClass::Lrg | ObjectClass::Qso | ObjectClass::Sky
        ) {
            return Err(MockError::Unrecognized {
                kind: "target type",
                name: class.to_string(),
            });
        }

        let mut staged = read_field(ctx, &mock_file(&req.location, class), class)?;
        if class == ObjectClass::Qso {
            if let Some(forest) = &req.forest {
                info!("Adding Lyman-alpha targets");
                staged = staged.chain(read_forest(ctx, &forest.mock_dir_name)?)?;
                info!("Combined QSO+Lya sample has {} targets", staged.len());
            }
        }
        staged.keep_in_bounds(req.bounds)?;
        let (mut cat, table) = staged.finish(ctx, req, rng)?;

        if class == ObjectClass::Sky {
            cat.true_spectype = "SKY".to_string();
            cat.template_type = "SKY".to_string();
            return Ok(cat);
        }

        info!("Sampling from Gaussian mixture model");
        let phot = ctx.mixtures(class)?.sample(class, cat.len(), rng)?;
        cat.gr = Some(phot.gr());
        cat.rz = Some(phot.rz());
        cat.rw1 = Some(phot.rw1());
        cat.w1w2 = Some(phot.w1w2());
        if matches!(class, ObjectClass::Elg | ObjectClass::Lrg) {
            cat.shapes = phot.shapes.clone();
        }

        match class {
            ObjectClass::Elg => {
                let (mean, sigma) = ELG_LOGVDISP;
                cat.vdisp = Some(sample_vdisp(mean, sigma, cat.len(), rng)?);
                cat.mag = Some(phot.r);
                cat.filtername = Some("decam2014-r".to_string());
                cat.true_spectype = "GALAXY".to_string();
                cat.template_type = "ELG".to_string();
            }
            ObjectClass::Lrg => {
                let (mean, sigma) = LRG_LOGVDISP;
                cat.vdisp = Some(sample_vdisp(mean, sigma, cat.len(), rng)?);
                cat.mag = Some(phot.z);
                cat.filtername = Some("decam2014-z".to_string());
                cat.true_spectype = "GALAXY".to_string();
                cat.template_type = "LRG".to_string();
            }
            _ => {
                // Forest rows keep their catalog magnitude
                let mag = table
                    .f64_column("MAG")?
                    .into_iter()
                    .zip(&phot.g)
                    .map(|(m, &g)| if m == MAG_PLACEHOLDER { g } else { m })
                    .collect();
                cat.mag = Some(mag);
                cat.filtername = Some("decam2014-g".to_string());
                cat.true_spectype = "QSO".to_string();
                cat.template_type = "QSO".to_string();
                let subtype = table.str_column("SUBTYPE")?;
                cat.template_subtype = if subtype.iter().any(|s| s == LYA_SUBTYPE) {
                    TemplateSubtype::PerObject(subtype)
                } else {
                    TemplateSubtype::default()
                };
            }
        }
        Ok(cat)
    }
}
