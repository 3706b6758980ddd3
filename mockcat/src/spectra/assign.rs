//! Template assignment for ingested mock catalogs
//!
//! Objects are matched to templates in their class feature space. Two cases
//! bypass the k-d trees: tracer quasars get a template id drawn uniformly
//! from the quasar library, and Lyman-alpha quasars use their own row in the
//! forest file (decoded from `mockid`) as template id.

use log::debug;
use rand::Rng;

use crate::catalog::{MockCatalog, ObjectClass};
use crate::error::{MockError, Result};
use crate::mockid::decode_rownum_filenum;
use crate::readers::MockFormat;
use crate::spectra::index::{TemplateIndex, TemplateMatch};
use crate::spectra::meta::TemplateMeta;

/// Template id recorded for SKY fibers, which have no template
pub const NO_TEMPLATE: i64 = -1;
/// Quasar subtype whose templates live in the forest files
pub const LYA: &str = "LYA";

/// Mock formats whose columns each class knows how to match
pub fn supported_formats(class: ObjectClass) -> &'static [MockFormat] {
    match class {
        ObjectClass::Bgs => &[MockFormat::DurhamMxxlHdf5],
        ObjectClass::Elg | ObjectClass::Lrg => &[MockFormat::GaussianField],
        ObjectClass::Star => &[MockFormat::Gums100pc, MockFormat::Galaxia],
        ObjectClass::Wd => &[MockFormat::GumsWd],
        ObjectClass::Qso => &[MockFormat::GaussianField, MockFormat::Lya],
        ObjectClass::Sky => &MockFormat::ALL,
    }
}

/// Fail with `Unrecognized` unless `format` is supported for `class`
pub fn check_format(class: ObjectClass, format: MockFormat) -> Result<()> {
    if supported_formats(class).contains(&format) {
        Ok(())
    } else {
        Err(MockError::Unrecognized {
            kind: "mock format",
            name: format!("{format} for {class}"),
        })
    }
}

/// Rows to work on: `rows` if given, every row otherwise
pub(crate) fn resolve_rows(catalog: &MockCatalog, rows: Option<&[usize]>) -> Result<Vec<usize>> {
    let n = catalog.len();
    match rows {
        None => Ok((0..n).collect()),
        Some(rows) => {
            if let Some(&bad) = rows.iter().find(|&&i| i >= n) {
                return Err(MockError::LengthMismatch {
                    what: "row index into catalog",
                    expected: n,
                    found: bad,
                });
            }
            Ok(rows.to_vec())
        }
    }
}

fn required<'a>(values: &'a Option<Vec<f64>>, name: &str) -> Result<&'a [f64]> {
    values.as_deref().ok_or_else(|| MockError::MissingColumn {
        column: name.to_string(),
        table: "mock catalog".to_string(),
    })
}

fn pick<T: Clone>(values: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&i| values[i].clone()).collect()
}

fn features3(a: &[f64], b: &[f64], c: &[f64], rows: &[usize]) -> Vec<[f64; 3]> {
    rows.iter().map(|&i| [a[i], b[i], c[i]]).collect()
}

/// Echoed fields shared by every class
fn base_meta(class: ObjectClass, catalog: &MockCatalog, rows: &[usize]) -> TemplateMeta {
    TemplateMeta {
        objtype: class,
        template_id: vec![NO_TEMPLATE; rows.len()],
        seed: pick(&catalog.seed, rows),
        redshift: pick(&catalog.z, rows),
        mag: catalog.mag.as_deref().map(|m| pick(m, rows)),
        vdisp: None,
        teff: None,
        logg: None,
        feh: None,
        subtype: None,
    }
}

/// Assign a template to each selected object of `catalog`
///
/// `rows` restricts the work to a subset, and the output follows its order.
/// The only random draws are the uniform tracer-quasar picks, one per tracer
/// in row order.
pub fn assign_templates<R: Rng + ?Sized>(
    index: &TemplateIndex,
    class: ObjectClass,
    format: MockFormat,
    catalog: &MockCatalog,
    rows: Option<&[usize]>,
    rng: &mut R,
) -> Result<TemplateMeta> {
    check_format(class, format)?;
    let rows = resolve_rows(catalog, rows)?;
    let mut meta = base_meta(class, catalog, &rows);

    match class {
        ObjectClass::Bgs => {
            let features = features3(
                &catalog.z,
                required(&catalog.sdss_absmag_r01, "SDSS_absmag_r01")?,
                required(&catalog.sdss_01gr, "SDSS_01gr")?,
                &rows,
            );
            meta.template_id = ids(index.bgs.query(&features)?);
            meta.vdisp = Some(pick(required(&catalog.vdisp, "VDISP")?, &rows));
        }
        ObjectClass::Elg | ObjectClass::Lrg => {
            let features = features3(
                &catalog.z,
                required(&catalog.gr, "GR")?,
                required(&catalog.rz, "RZ")?,
                &rows,
            );
            let tree = if class == ObjectClass::Elg {
                &index.elg
            } else {
                &index.lrg
            };
            meta.template_id = ids(tree.query(&features)?);
            meta.vdisp = Some(pick(required(&catalog.vdisp, "VDISP")?, &rows));
        }
        ObjectClass::Star => {
            let teff = required(&catalog.teff, "TEFF")?;
            let logg = required(&catalog.logg, "LOGG")?;
            let feh = required(&catalog.feh, "FEH")?;
            meta.template_id = ids(index.star.query(&features3(teff, logg, feh, &rows))?);
            meta.teff = Some(pick(teff, &rows));
            meta.logg = Some(pick(logg, &rows));
            meta.feh = Some(pick(feh, &rows));
        }
        ObjectClass::Wd => {
            let teff = required(&catalog.teff, "TEFF")?;
            let logg = required(&catalog.logg, "LOGG")?;
            let subtype: Vec<String> = rows
                .iter()
                .map(|&i| catalog.template_subtype.get(i).trim().to_ascii_uppercase())
                .collect();
            for (label, positions) in group_by(&subtype) {
                let tree = index.white_dwarf(label)?;
                let features: Vec<[f64; 2]> = positions
                    .iter()
                    .map(|&p| [teff[rows[p]], logg[rows[p]]])
                    .collect();
                debug!("Matching {} {} white dwarfs", positions.len(), label);
                for (&p, hit) in positions.iter().zip(tree.query(&features)?) {
                    meta.template_id[p] = hit.template_id;
                }
            }
            meta.teff = Some(pick(teff, &rows));
            meta.logg = Some(pick(logg, &rows));
            meta.subtype = Some(subtype);
        }
        ObjectClass::Qso => {
            let subtype: Vec<String> = rows
                .iter()
                .map(|&i| catalog.template_subtype.get(i).to_string())
                .collect();
            for (p, &i) in rows.iter().enumerate() {
                meta.template_id[p] = if subtype[p] == LYA {
                    decode_rownum_filenum(catalog.mockid[i])?.0
                } else {
                    if index.qso_ids.is_empty() {
                        return Err(MockError::EmptyLibrary("QSO".to_string()));
                    }
                    index.qso_ids[rng.gen_range(0..index.qso_ids.len())]
                };
            }
            meta.subtype = Some(subtype);
        }
        ObjectClass::Sky => {
            meta.mag = None;
        }
    }
    Ok(meta)
}

fn ids(matches: Vec<TemplateMatch>) -> Vec<i64> {
    matches.into_iter().map(|m| m.template_id).collect()
}

/// Positions of each distinct label, labels in first-seen order
pub(crate) fn group_by<K: PartialEq>(labels: &[K]) -> Vec<(&K, Vec<usize>)> {
    let mut groups: Vec<(&K, Vec<usize>)> = Vec::new();
    for (p, label) in labels.iter().enumerate() {
        match groups.iter_mut().find(|(k, _)| *k == label) {
            Some((_, positions)) => positions.push(p),
            None => groups.push((label, vec![p])),
        }
    }
    groups
}
