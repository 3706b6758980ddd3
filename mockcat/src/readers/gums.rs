//! Single-file GUMS-based stellar mocks: nearby stars and white dwarfs

use log::info;
use rand::Rng;

use crate::catalog::{MockCatalog, TemplateSubtype};
use crate::error::Result;
use crate::readers::{positions, require_source, CatalogReader, MockContext, ReadRequest, Staged};
use crate::sky::C_LIGHT_KMS;
use crate::table::{Column, ColumnTable};

/// Stars within 100 pc; magnitudes in the SDSS g band
#[derive(Debug, Clone, Copy, Default)]
pub struct Gums100pcReader;

/// White dwarfs; `SPECTRALTYPE` (DA/DB) becomes the per-object template subtype
#[derive(Debug, Clone, Copy, Default)]
pub struct GumsWdReader;

/// Read the shared GUMS columns into a staging table
///
/// `mag_column` is the catalog's g-band magnitude and `extra` lists further
/// numeric columns copied through unchanged.
fn read_gums(
    ctx: &MockContext<'_>,
    req: &ReadRequest,
    mag_column: &str,
    extra: &[&str],
) -> Result<Staged> {
    let path = &req.location;
    require_source(ctx.access, path)?;

    let mut wanted = vec!["RA", "DEC", "RADIALVELOCITY", mag_column];
    wanted.extend_from_slice(extra);
    wanted.push("SPECTRALTYPE");
    let raw = ctx.access.read_table(path, &wanted)?;

    let mut table: ColumnTable = positions(&raw.f64_column("RA")?, &raw.f64_column("DEC")?, 1.0)?;
    let z = raw
        .f64_column("RADIALVELOCITY")?
        .into_iter()
        .map(|v| v / C_LIGHT_KMS)
        .collect();
    table.insert("Z", Column::F64(z))?;
    table.insert("MAG", Column::F64(raw.f64_column(mag_column)?))?;
    for &name in extra {
        table.insert(name, Column::F64(raw.f64_column(name)?))?;
    }
    let spectype = raw
        .str_column("SPECTRALTYPE")?
        .into_iter()
        .map(|s| s.trim().to_string())
        .collect();
    table.insert("SUBTYPE", Column::Str(spectype))?;

    info!("Read {} objects from {}", table.nrows(), path.display());
    Staged::single(path.clone(), table)
}

impl CatalogReader for Gums100pcReader {
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog> {
        let mut staged = read_gums(ctx, req, "MAGG", &["TEFF", "LOGG", "FEH"])?;
        staged.keep_in_bounds(req.bounds)?;
        let (mut cat, table) = staged.finish(ctx, req, rng)?;

        cat.mag = Some(table.f64_column("MAG")?);
        cat.teff = Some(table.f64_column("TEFF")?);
        cat.logg = Some(table.f64_column("LOGG")?);
        cat.feh = Some(table.f64_column("FEH")?);
        cat.filtername = Some("sdss2010-g".to_string());
        cat.true_spectype = "STAR".to_string();
        cat.template_type = "STAR".to_string();
        cat.template_subtype = TemplateSubtype::PerObject(table.str_column("SUBTYPE")?);
        Ok(cat)
    }
}

impl CatalogReader for GumsWdReader {
    fn read<R: Rng + ?Sized>(
        &self,
        ctx: &MockContext<'_>,
        req: &ReadRequest,
        rng: &mut R,
    ) -> Result<MockCatalog> {
        let mut staged = read_gums(ctx, req, "G_SDSS", &["TEFF", "LOGG"])?;
        staged.keep_in_bounds(req.bounds)?;
        let (mut cat, table) = staged.finish(ctx, req, rng)?;

        let subtype = table
            .str_column("SUBTYPE")?
            .into_iter()
            .map(|s| s.to_ascii_uppercase())
            .collect();
        cat.mag = Some(table.f64_column("MAG")?);
        cat.teff = Some(table.f64_column("TEFF")?);
        cat.logg = Some(table.f64_column("LOGG")?);
        cat.filtername = Some("sdss2010-g".to_string());
        cat.true_spectype = "STAR".to_string();
        cat.template_type = "WD".to_string();
        cat.template_subtype = TemplateSubtype::PerObject(subtype);
        Ok(cat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MemoryAccess;
    use crate::catalog::ObjectClass;
    use crate::error::MockError;
    use crate::sky::{Bricks, SkyBounds};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wd_table() -> ColumnTable {
        ColumnTable::new()
            .with_column("ra", Column::F64(vec![10.0, -310.0, 200.0]))
            .unwrap()
            .with_column("dec", Column::F64(vec![-5.0, 5.0, 0.0]))
            .unwrap()
            .with_column("RadialVelocity", Column::F64(vec![29.9792458, 0.0, -29.9792458]))
            .unwrap()
            .with_column("G_SDSS", Column::F32(vec![18.0, 19.0, 20.0]))
            .unwrap()
            .with_column("TEFF", Column::F64(vec![12000.0, 20000.0, 8000.0]))
            .unwrap()
            .with_column("LOGG", Column::F64(vec![8.0, 7.9, 8.1]))
            .unwrap()
            .with_column("SPECTRALTYPE", Column::Str(vec!["da ".into(), "DB".into(), "Da".into()]))
            .unwrap()
    }

    #[test]
    fn test_wd_reader() {
        let mut access = MemoryAccess::new();
        access.insert_table("/mocks/wd.fits", wd_table());
        let ctx = MockContext::new(&access, &Bricks);
        let req = ReadRequest::new("/mocks/wd.fits", ObjectClass::Wd)
            .with_bounds(SkyBounds::new(0.0, 100.0, -90.0, 90.0));
        let mut rng = StdRng::seed_from_u64(11);

        let cat = GumsWdReader.read(&ctx, &req, &mut rng).unwrap();
        cat.validate().unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.ra, vec![10.0, 50.0]);
        assert_relative_eq!(cat.z[0], 1e-4, epsilon = 1e-12);
        assert_eq!(cat.objid, vec![0, 1]);
        assert_eq!(
            cat.template_subtype,
            TemplateSubtype::PerObject(vec!["DA".into(), "DB".into()])
        );
        assert_eq!(cat.template_type, "WD");
        assert_eq!(cat.filtername.as_deref(), Some("sdss2010-g"));
        assert_eq!(cat.mag.as_ref().unwrap(), &vec![18.0, 19.0]);
        assert!(cat.feh.is_none());
    }

    #[test]
    fn test_zero_bricksize_is_rejected() {
        let mut access = MemoryAccess::new();
        access.insert_table("/mocks/wd.fits", wd_table());
        let ctx = MockContext::new(&access, &Bricks);
        let req = ReadRequest::new("/mocks/wd.fits", ObjectClass::Wd).with_bricksize(0.0);
        let mut rng = StdRng::seed_from_u64(11);
        assert!(matches!(
            GumsWdReader.read(&ctx, &req, &mut rng),
            Err(MockError::Config(_))
        ));
    }

    #[test]
    fn test_100pc_reader_keeps_spectral_types() {
        let table = ColumnTable::new()
            .with_column("RA", Column::F64(vec![1.0, 2.0]))
            .unwrap()
            .with_column("DEC", Column::F64(vec![0.0, 0.0]))
            .unwrap()
            .with_column("RADIALVELOCITY", Column::F64(vec![0.0, 0.0]))
            .unwrap()
            .with_column("MAGG", Column::F64(vec![10.0, 11.0]))
            .unwrap()
            .with_column("TEFF", Column::F64(vec![5800.0, 3500.0]))
            .unwrap()
            .with_column("LOGG", Column::F64(vec![4.4, 4.8]))
            .unwrap()
            .with_column("FEH", Column::F64(vec![0.0, -0.5]))
            .unwrap()
            .with_column("SPECTRALTYPE", Column::Str(vec!["G2V".into(), "M1V".into()]))
            .unwrap();
        let mut access = MemoryAccess::new();
        access.insert_table("/mocks/100pc.fits", table);
        let ctx = MockContext::new(&access, &Bricks);
        let req = ReadRequest::new("/mocks/100pc.fits", ObjectClass::Star);
        let mut rng = StdRng::seed_from_u64(2);

        let cat = Gums100pcReader.read(&ctx, &req, &mut rng).unwrap();
        assert_eq!(cat.template_subtype.get(1), "M1V");
        assert_eq!(cat.feh.as_ref().unwrap(), &vec![0.0, -0.5]);
        assert_eq!(cat.n_per_file, vec![2]);
        assert_eq!(cat.brickname.len(), 2);
    }

    #[test]
    fn test_missing_file_and_empty_region() {
        let mut access = MemoryAccess::new();
        access.insert_table("/mocks/wd.fits", wd_table());
        let ctx = MockContext::new(&access, &Bricks);
        let mut rng = StdRng::seed_from_u64(0);

        let req = ReadRequest::new("/mocks/nope.fits", ObjectClass::Wd);
        assert!(matches!(
            GumsWdReader.read(&ctx, &req, &mut rng),
            Err(MockError::MissingSource(_))
        ));

        let req = ReadRequest::new("/mocks/wd.fits", ObjectClass::Wd)
            .with_bounds(SkyBounds::new(300.0, 310.0, -90.0, 90.0));
        assert!(matches!(
            GumsWdReader.read(&ctx, &req, &mut rng),
            Err(MockError::EmptyRegion(_))
        ));
    }
}
