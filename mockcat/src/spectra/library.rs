//! Reference template libraries and their feature spaces
//!
//! Every library is a table of template metadata with a `TEMPLATEID` column
//! and the physical quantities used to match mock objects against it:
//!
//! | library      | features                                   |
//! |--------------|--------------------------------------------|
//! | BGS          | `Z`, `SDSS_ABSMAG_R01`, `SDSS_ABSMAG_G01 - SDSS_ABSMAG_R01` |
//! | ELG, LRG     | `Z`, `DECAM_G - DECAM_R`, `DECAM_R - DECAM_Z` |
//! | STAR         | `TEFF`, `LOGG`, `FEH`                      |
//! | WD (DA, DB)  | `TEFF`, `LOGG`                             |
//! | QSO          | none, ids only                             |
//!
//! LRG templates are placed in the ELG feature space until a dedicated LRG
//! feature definition exists.

use std::path::Path;

use log::info;

use crate::access::CatalogAccess;
use crate::error::{MockError, Result};
use crate::table::{Column, ColumnTable};

pub const TEMPLATEID: &str = "TEMPLATEID";

/// Template ids plus one feature vector per template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLibrary<const N: usize> {
    name: String,
    ids: Vec<i64>,
    features: Vec<[f64; N]>,
}

impl<const N: usize> TemplateLibrary<N> {
    pub fn new(name: &str, ids: Vec<i64>, features: Vec<[f64; N]>) -> Result<Self> {
        if ids.is_empty() {
            return Err(MockError::EmptyLibrary(name.to_string()));
        }
        if ids.len() != features.len() {
            return Err(MockError::LengthMismatch {
                what: "template ids and features",
                expected: ids.len(),
                found: features.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            ids,
            features,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn features(&self) -> &[[f64; N]] {
        &self.features
    }
}

/// Template ids of a library table, accepting integer or float storage
fn template_ids(table: &ColumnTable) -> Result<Vec<i64>> {
    match table.column(TEMPLATEID)? {
        Column::I64(v) => Ok(v.clone()),
        other => other
            .to_f64()
            .map(|v| v.into_iter().map(|x| x as i64).collect())
            .ok_or_else(|| MockError::ColumnType {
                column: TEMPLATEID.to_string(),
                expected: "integer",
                found: other.type_name(),
            }),
    }
}

fn zip3(a: Vec<f64>, b: Vec<f64>, c: Vec<f64>) -> Vec<[f64; 3]> {
    a.into_iter()
        .zip(b)
        .zip(c)
        .map(|((a, b), c)| [a, b, c])
        .collect()
}

fn difference(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// `(z, M_0.1r, 0.1(g-r))`
pub fn bgs_library(table: &ColumnTable) -> Result<TemplateLibrary<3>> {
    let z = table.f64_column("Z")?;
    let abs_g = table.f64_column("SDSS_ABSMAG_G01")?;
    let abs_r = table.f64_column("SDSS_ABSMAG_R01")?;
    let gr = difference(&abs_g, &abs_r);
    TemplateLibrary::new("BGS", template_ids(table)?, zip3(z, abs_r, gr))
}

/// `(z, g-r, r-z)` in DECam bands; also used for LRG libraries
pub fn elg_library(name: &str, table: &ColumnTable) -> Result<TemplateLibrary<3>> {
    let z = table.f64_column("Z")?;
    let g = table.f64_column("DECAM_G")?;
    let r = table.f64_column("DECAM_R")?;
    let zmag = table.f64_column("DECAM_Z")?;
    let features = zip3(z, difference(&g, &r), difference(&r, &zmag));
    TemplateLibrary::new(name, template_ids(table)?, features)
}

/// `(Teff, logg, [Fe/H])`
pub fn star_library(table: &ColumnTable) -> Result<TemplateLibrary<3>> {
    let features = zip3(
        table.f64_column("TEFF")?,
        table.f64_column("LOGG")?,
        table.f64_column("FEH")?,
    );
    TemplateLibrary::new("STAR", template_ids(table)?, features)
}

/// `(Teff, logg)` for one white dwarf subtype
pub fn wd_library(subtype: &str, table: &ColumnTable) -> Result<TemplateLibrary<2>> {
    let features = table
        .f64_column("TEFF")?
        .into_iter()
        .zip(table.f64_column("LOGG")?)
        .map(|(t, g)| [t, g])
        .collect();
    TemplateLibrary::new(&format!("WD {subtype}"), template_ids(table)?, features)
}

/// Quasar template ids, drawn from uniformly for tracer quasars
pub fn qso_ids(table: &ColumnTable) -> Result<Vec<i64>> {
    let ids = template_ids(table)?;
    if ids.is_empty() {
        return Err(MockError::EmptyLibrary("QSO".to_string()));
    }
    Ok(ids)
}

/// Every library needed for template assignment
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLibraries {
    pub bgs: TemplateLibrary<3>,
    pub elg: TemplateLibrary<3>,
    pub lrg: TemplateLibrary<3>,
    pub star: TemplateLibrary<3>,
    pub wd_da: TemplateLibrary<2>,
    pub wd_db: TemplateLibrary<2>,
    pub qso: Vec<i64>,
}

impl TemplateLibraries {
    /// Load `<name>_templates.fits` tables from `dir`
    ///
    /// Names are `bgs`, `elg`, `lrg`, `star`, `wd_da`, `wd_db` and `qso`.
    pub fn load(access: &dyn CatalogAccess, dir: &Path) -> Result<Self> {
        let read = |name: &str, columns: &[&str]| -> Result<ColumnTable> {
            let path = dir.join(format!("{name}_templates.fits"));
            if !access.exists(&path) {
                return Err(MockError::MissingSource(path));
            }
            let mut wanted = vec![TEMPLATEID];
            wanted.extend_from_slice(columns);
            access.read_table(&path, &wanted)
        };
        let decam = ["Z", "DECAM_G", "DECAM_R", "DECAM_Z"];
        let libraries = Self {
            bgs: bgs_library(&read("bgs", &["Z", "SDSS_ABSMAG_G01", "SDSS_ABSMAG_R01"])?)?,
            elg: elg_library("ELG", &read("elg", &decam)?)?,
            lrg: elg_library("LRG", &read("lrg", &decam)?)?,
            star: star_library(&read("star", &["TEFF", "LOGG", "FEH"])?)?,
            wd_da: wd_library("DA", &read("wd_da", &["TEFF", "LOGG"])?)?,
            wd_db: wd_library("DB", &read("wd_db", &["TEFF", "LOGG"])?)?,
            qso: qso_ids(&read("qso", &[])?)?,
        };
        info!(
            "Loaded template libraries: BGS {}, ELG {}, LRG {}, STAR {}, WD DA {}, WD DB {}, QSO {}",
            libraries.bgs.len(),
            libraries.elg.len(),
            libraries.lrg.len(),
            libraries.star.len(),
            libraries.wd_da.len(),
            libraries.wd_db.len(),
            libraries.qso.len()
        );
        Ok(libraries)
    }
}
