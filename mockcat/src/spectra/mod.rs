//! Template assignment and spectra generation for mock targets
//!
//! [`TemplateIndex`] holds one nearest-neighbour structure per class feature
//! space. [`assign_templates`] picks a template per object, and
//! [`MockSpectra`] hands the resulting batches to a [`SpectrumSynthesizer`]
//! and scatters the flux back into the requested object order.

pub mod assign;
pub mod index;
pub mod library;
pub mod meta;

use std::path::PathBuf;

use log::info;
use ndarray::Array2;
use rand::Rng;

use crate::catalog::{MockCatalog, ObjectClass};
use crate::error::{MockError, Result};
use crate::mockid::decode_rownum_filenum;
use crate::readers::MockFormat;

pub use assign::{assign_templates, check_format, supported_formats, LYA, NO_TEMPLATE};
pub use index::{ClassIndex, TemplateIndex, TemplateMatch};
pub use library::{TemplateLibraries, TemplateLibrary};
pub use meta::TemplateMeta;

/// Which template family a synthesis batch draws from
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateFamily {
    /// Basis templates of a class
    Basis(ObjectClass),
    /// White dwarf basis templates of one subtype
    WhiteDwarf(String),
    /// Lyman-alpha quasars stored in one forest file
    Forest(PathBuf),
}

/// Builds spectra from template metadata
pub trait SpectrumSynthesizer {
    /// Output wavelength grid in Angstrom
    fn wavelength(&self) -> &[f64];

    /// One spectrum per row of `meta`, shaped `(meta.len(), wavelength().len())`
    fn synthesize(&self, family: &TemplateFamily, meta: &TemplateMeta) -> Result<Array2<f64>>;
}

/// Flux and metadata for the requested objects
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSpectra {
    pub flux: Array2<f64>,
    pub meta: TemplateMeta,
}

/// Spectra generation driver
pub struct MockSpectra<'a, S: SpectrumSynthesizer> {
    templates: &'a TemplateIndex,
    synth: S,
}

impl<'a, S: SpectrumSynthesizer> MockSpectra<'a, S> {
    pub fn new(templates: &'a TemplateIndex, synth: S) -> Self {
        Self { templates, synth }
    }

    pub fn wavelength(&self) -> &[f64] {
        self.synth.wavelength()
    }

    /// Generate spectra for `class` objects of `catalog`
    ///
    /// # Arguments
    /// * `class` - Object class of the catalog
    /// * `format` - Mock format the catalog was read from
    /// * `catalog` - Ingested mock catalog
    /// * `rows` - Optional subset of catalog rows; all rows when `None`
    /// * `rng` - Random source for tracer-quasar template picks
    ///
    /// # Returns
    /// Flux with one row per requested object, in request order, and the
    /// matching template metadata. SKY objects get zero flux.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        class: ObjectClass,
        format: MockFormat,
        catalog: &MockCatalog,
        rows: Option<&[usize]>,
        rng: &mut R,
    ) -> Result<GeneratedSpectra> {
        let meta = assign_templates(self.templates, class, format, catalog, rows, rng)?;
        let nwave = self.wavelength().len();
        let mut flux = Array2::zeros((meta.len(), nwave));
        if class == ObjectClass::Sky || meta.is_empty() {
            return Ok(GeneratedSpectra { flux, meta });
        }

        let requested = assign::resolve_rows(catalog, rows)?;
        for (family, positions) in self.batches(class, catalog, &requested, &meta)? {
            let batch = meta.take(&positions);
            let part = self.synth.synthesize(&family, &batch)?;
            if part.dim() != (positions.len(), nwave) {
                return Err(MockError::LengthMismatch {
                    what: "synthesized flux rows",
                    expected: positions.len() * nwave,
                    found: part.len(),
                });
            }
            for (j, &p) in positions.iter().enumerate() {
                flux.row_mut(p).assign(&part.row(j));
            }
        }
        info!("Generated {} {} spectra", meta.len(), class);
        Ok(GeneratedSpectra { flux, meta })
    }

    /// Split the requested objects into synthesis batches
    ///
    /// Positions index into `meta`. White dwarfs batch by subtype and forest
    /// quasars by the file their `mockid` decodes to.
    fn batches(
        &self,
        class: ObjectClass,
        catalog: &MockCatalog,
        requested: &[usize],
        meta: &TemplateMeta,
    ) -> Result<Vec<(TemplateFamily, Vec<usize>)>> {
        let all: Vec<usize> = (0..meta.len()).collect();
        match class {
            ObjectClass::Wd => {
                let subtype = meta.subtype.as_deref().unwrap_or_default();
                Ok(assign::group_by(subtype)
                    .into_iter()
                    .map(|(s, positions)| (TemplateFamily::WhiteDwarf(s.clone()), positions))
                    .collect())
            }
            ObjectClass::Qso => {
                let subtype = meta.subtype.as_deref().unwrap_or_default();
                let mut tracers = Vec::new();
                let mut forest = Vec::new();
                let mut files = Vec::new();
                for (p, &i) in requested.iter().enumerate() {
                    if subtype.get(p).map(String::as_str) == Some(LYA) {
                        let (_, file) = decode_rownum_filenum(catalog.mockid[i])?;
                        forest.push(p);
                        files.push(file);
                    } else {
                        tracers.push(p);
                    }
                }
                let mut out = Vec::new();
                if !tracers.is_empty() {
                    out.push((TemplateFamily::Basis(ObjectClass::Qso), tracers));
                }
                for (&file, positions) in assign::group_by(&files) {
                    let path = catalog
                        .files
                        .get(file as usize)
                        .ok_or(MockError::DecodeOutOfRange(file))?;
                    let positions = positions.iter().map(|&k| forest[k]).collect();
                    out.push((TemplateFamily::Forest(path.clone()), positions));
                }
                Ok(out)
            }
            _ => Ok(vec![(TemplateFamily::Basis(class), all)]),
        }
    }
}
