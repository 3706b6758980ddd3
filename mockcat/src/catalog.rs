//! The uniform in-memory record schema produced by every mock reader

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{MockError, Result};
use crate::mockid::decode_rownum_filenum;

/// Object classes that mocks and template libraries are organised by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectClass {
    Star,
    Wd,
    Bgs,
    Elg,
    Lrg,
    Qso,
    Sky,
}

impl ObjectClass {
    pub const ALL: [ObjectClass; 7] = [
        ObjectClass::Star,
        ObjectClass::Wd,
        ObjectClass::Bgs,
        ObjectClass::Elg,
        ObjectClass::Lrg,
        ObjectClass::Qso,
        ObjectClass::Sky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::Star => "STAR",
            ObjectClass::Wd => "WD",
            ObjectClass::Bgs => "BGS",
            ObjectClass::Elg => "ELG",
            ObjectClass::Lrg => "LRG",
            ObjectClass::Qso => "QSO",
            ObjectClass::Sky => "SKY",
        }
    }

    /// Classes whose photometry comes from a mixture model
    pub fn has_mixture_model(&self) -> bool {
        matches!(
            self,
            ObjectClass::Bgs | ObjectClass::Elg | ObjectClass::Lrg | ObjectClass::Qso
        )
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectClass {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self> {
        ObjectClass::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MockError::Unrecognized {
                kind: "target type",
                name: s.to_string(),
            })
    }
}

/// Template subtype, either shared by the whole catalog or given per object
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSubtype {
    Uniform(String),
    PerObject(Vec<String>),
}

impl Default for TemplateSubtype {
    fn default() -> Self {
        TemplateSubtype::Uniform(String::new())
    }
}

impl TemplateSubtype {
    /// Subtype of row `i`
    pub fn get(&self, i: usize) -> &str {
        match self {
            TemplateSubtype::Uniform(s) => s,
            TemplateSubtype::PerObject(v) => v.get(i).map_or("", String::as_str),
        }
    }

    /// Subtypes of the selected rows
    ///
    /// A row past the end of a per-object list is a `LengthMismatch`.
    pub fn take(&self, rows: &[usize]) -> Result<TemplateSubtype> {
        match self {
            TemplateSubtype::Uniform(s) => Ok(TemplateSubtype::Uniform(s.clone())),
            TemplateSubtype::PerObject(v) => rows
                .iter()
                .map(|&i| {
                    v.get(i).cloned().ok_or(MockError::LengthMismatch {
                        what: "template subtypes",
                        expected: i + 1,
                        found: v.len(),
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(TemplateSubtype::PerObject),
        }
    }
}

/// Galaxy shape parameters sampled alongside photometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeColumns {
    pub exp_r: Vec<f64>,
    pub exp_e1: Vec<f64>,
    pub exp_e2: Vec<f64>,
    pub dev_r: Vec<f64>,
    pub dev_e1: Vec<f64>,
    pub dev_e2: Vec<f64>,
}

/// Per-source catalog in columnar form
///
/// All per-object vectors have the same length. `files` and `n_per_file` are
/// parallel and ordered by file index, so that decoding any `mockid` yields a
/// valid index into them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockCatalog {
    pub objid: Vec<i64>,
    pub mockid: Vec<i64>,
    pub ra: Vec<f64>,
    pub dec: Vec<f64>,
    pub z: Vec<f64>,
    pub brickname: Vec<String>,
    pub seed: Vec<u32>,

    pub mag: Option<Vec<f64>>,
    pub mag_obs: Option<Vec<f64>>,
    pub teff: Option<Vec<f64>>,
    pub logg: Option<Vec<f64>>,
    pub feh: Option<Vec<f64>>,
    pub vdisp: Option<Vec<f64>>,
    pub gr: Option<Vec<f64>>,
    pub rz: Option<Vec<f64>>,
    pub rw1: Option<Vec<f64>>,
    pub w1w2: Option<Vec<f64>>,
    pub shapes: Option<ShapeColumns>,
    pub sdss_absmag_r01: Option<Vec<f64>>,
    pub sdss_01gr: Option<Vec<f64>>,

    pub filtername: Option<String>,
    pub true_spectype: String,
    pub template_type: String,
    pub template_subtype: TemplateSubtype,

    pub files: Vec<PathBuf>,
    pub n_per_file: Vec<usize>,
}

impl MockCatalog {
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    /// File path each object was read from
    pub fn origin_file(&self, row: usize) -> Result<&PathBuf> {
        let (_, file) = decode_rownum_filenum(self.mockid[row])?;
        self.files
            .get(file as usize)
            .ok_or(MockError::DecodeOutOfRange(self.mockid[row]))
    }

    /// Check the structural invariants of the catalog
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        let per_object: [(&'static str, usize); 6] = [
            ("objid", self.objid.len()),
            ("mockid", self.mockid.len()),
            ("dec", self.dec.len()),
            ("z", self.z.len()),
            ("brickname", self.brickname.len()),
            ("seed", self.seed.len()),
        ];
        for (what, found) in per_object {
            if found != n {
                return Err(MockError::LengthMismatch {
                    what,
                    expected: n,
                    found,
                });
            }
        }
        if self.files.len() != self.n_per_file.len() {
            return Err(MockError::LengthMismatch {
                what: "files and n_per_file",
                expected: self.files.len(),
                found: self.n_per_file.len(),
            });
        }
        let total: usize = self.n_per_file.iter().sum();
        if total != n {
            return Err(MockError::LengthMismatch {
                what: "n_per_file total",
                expected: n,
                found: total,
            });
        }
        for (&id, &objid) in self.mockid.iter().zip(&self.objid) {
            let (row, file) = decode_rownum_filenum(id)?;
            if row != objid || file as usize >= self.files.len() {
                return Err(MockError::DecodeOutOfRange(id));
            }
        }
        Ok(())
    }
}
