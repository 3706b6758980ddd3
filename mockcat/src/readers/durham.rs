//! Durham light cone converted to an imaging-survey style table
//!
//! The result mimics the columns target selection expects from the imaging
//! pipeline. Only positions and g/r/z fluxes come from the mock; the remaining
//! columns are fixed placeholders.

use std::path::Path;

use log::info;

use crate::access::CatalogAccess;
use crate::error::{MockError, Result};
use crate::readers::require_source;

/// Number of DECam flux slots (u, g, r, i, z, Y)
pub const N_DECAM: usize = 6;
/// Number of WISE flux slots (W1..W4)
pub const N_WISE: usize = 4;

/// DECam slots filled from the mock's g, r and z magnitudes
const DECAM_G: usize = 1;
const DECAM_R: usize = 2;
const DECAM_Z: usize = 4;

const GROUP: &str = "Data";
const PLACEHOLDER_BRICKNAME: &str = "0durham0";
const POSITION_IVAR: f64 = 1e10;

/// Imaging-style catalog built from a Durham mock
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TractorTable {
    pub brickid: Vec<i64>,
    pub brickname: Vec<String>,
    pub objid: Vec<i64>,
    pub brick_primary: Vec<bool>,
    pub morphtype: Vec<String>,
    pub ra: Vec<f64>,
    pub ra_ivar: Vec<f64>,
    pub dec: Vec<f64>,
    pub dec_ivar: Vec<f64>,
    pub decam_flux: Vec<[f64; N_DECAM]>,
    pub decam_mw_transmission: Vec<[f64; N_DECAM]>,
    pub wise_flux: Vec<[f64; N_WISE]>,
    pub wise_mw_transmission: Vec<[f64; N_WISE]>,
    pub shapeexp_r: Vec<f64>,
    pub shapedev_r: Vec<f64>,
}

impl TractorTable {
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }
}

/// Linear flux in nanomaggies for an AB magnitude
pub fn mag_to_nanomaggies(mag: f64) -> f64 {
    10f64.powf((22.5 - mag) / 2.5)
}

/// Build a [`TractorTable`] from the core and photometry files of a Durham mock
///
/// Positions come from the core file and the `appD{g,r,z}o_tot_ext`
/// magnitudes from the photometry file; both are read from group `Data` and
/// must have the same number of rows. No ids are encoded and nothing is
/// filtered.
pub fn read_mock_durham(
    access: &dyn CatalogAccess,
    core_path: &Path,
    photo_path: &Path,
) -> Result<TractorTable> {
    require_source(access, core_path)?;
    require_source(access, photo_path)?;
    let core = access.read_datasets(core_path, GROUP, &["ra", "dec"])?;
    let photo = access.read_datasets(
        photo_path,
        GROUP,
        &["appDgo_tot_ext", "appDro_tot_ext", "appDzo_tot_ext"],
    )?;

    let n = core.nrows();
    if photo.nrows() != n {
        return Err(MockError::LengthMismatch {
            what: "Durham photometry rows",
            expected: n,
            found: photo.nrows(),
        });
    }

    let g = photo.f64_column("appDgo_tot_ext")?;
    let r = photo.f64_column("appDro_tot_ext")?;
    let z = photo.f64_column("appDzo_tot_ext")?;
    let decam_flux = (0..n)
        .map(|i| {
            let mut flux = [0.0; N_DECAM];
            flux[DECAM_G] = mag_to_nanomaggies(g[i]);
            flux[DECAM_R] = mag_to_nanomaggies(r[i]);
            flux[DECAM_Z] = mag_to_nanomaggies(z[i]);
            flux
        })
        .collect();

    info!("Read {} objects from {}", n, core_path.display());
    Ok(TractorTable {
        brickid: vec![1; n],
        brickname: vec![PLACEHOLDER_BRICKNAME.to_string(); n],
        objid: (0..n as i64).collect(),
        brick_primary: vec![true; n],
        morphtype: vec!["EXP".to_string(); n],
        ra: core.f64_column("ra")?,
        ra_ivar: vec![POSITION_IVAR; n],
        dec: core.f64_column("dec")?,
        dec_ivar: vec![POSITION_IVAR; n],
        decam_flux,
        decam_mw_transmission: vec![[1.0; N_DECAM]; n],
        wise_flux: vec![[0.0; N_WISE]; n],
        wise_mw_transmission: vec![[1.0; N_WISE]; n],
        shapeexp_r: vec![0.0; n],
        shapedev_r: vec![0.0; n],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MemoryAccess;
    use crate::table::{Column, ColumnTable};
    use approx::assert_relative_eq;

    fn access(photo_rows: usize) -> MemoryAccess {
        let mut access = MemoryAccess::new();
        access.insert_group(
            "/durham/core.hdf5",
            "Data",
            ColumnTable::new()
                .with_column("ra", Column::F64(vec![150.0, 151.0]))
                .unwrap()
                .with_column("dec", Column::F64(vec![2.0, 2.5]))
                .unwrap(),
        );
        let mags = |m: f64| Column::F64(vec![m; photo_rows]);
        access.insert_group(
            "/durham/photo.hdf5",
            "Data",
            ColumnTable::new()
                .with_column("appDgo_tot_ext", mags(22.5))
                .unwrap()
                .with_column("appDro_tot_ext", mags(20.0))
                .unwrap()
                .with_column("appDzo_tot_ext", mags(17.5))
                .unwrap(),
        );
        access
    }

    #[test]
    fn test_tractor_columns() {
        let access = access(2);
        let t = read_mock_durham(
            &access,
            Path::new("/durham/core.hdf5"),
            Path::new("/durham/photo.hdf5"),
        )
        .unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.objid, vec![0, 1]);
        assert_eq!(t.brickname[1], "0durham0");
        assert_eq!(t.morphtype[0], "EXP");
        assert_eq!(t.ra, vec![150.0, 151.0]);
        assert_eq!(t.dec_ivar[0], 1e10);

        let flux = t.decam_flux[0];
        assert_relative_eq!(flux[1], 1.0);
        assert_relative_eq!(flux[2], 10.0, epsilon = 1e-9);
        assert_relative_eq!(flux[4], 100.0, epsilon = 1e-9);
        assert_eq!(flux[0], 0.0);
        assert_eq!(flux[3], 0.0);
        assert_eq!(t.wise_flux[1], [0.0; N_WISE]);
        assert_eq!(t.decam_mw_transmission[1], [1.0; N_DECAM]);
    }

    #[test]
    fn test_row_count_mismatch() {
        let access = access(3);
        let err = read_mock_durham(
            &access,
            Path::new("/durham/core.hdf5"),
            Path::new("/durham/photo.hdf5"),
        )
        .unwrap_err();
        assert!(matches!(err, MockError::LengthMismatch { .. }));
    }
}
