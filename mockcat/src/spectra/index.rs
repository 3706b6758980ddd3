//! Nearest-template lookup, one k-d tree per class feature space

use log::info;
use mock_math::KdTree;

use crate::error::{MockError, Result};
use crate::spectra::library::{TemplateLibraries, TemplateLibrary};

/// Best template for one object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    pub template_id: i64,
    /// Euclidean distance in the class feature space
    pub distance: f64,
}

/// A k-d tree over one library, answering with template ids
#[derive(Debug, Clone)]
pub struct ClassIndex<const N: usize> {
    tree: KdTree<N>,
    ids: Vec<i64>,
}

impl<const N: usize> ClassIndex<N> {
    pub fn build(library: &TemplateLibrary<N>) -> Result<Self> {
        let tree = KdTree::build(library.features().to_vec())?;
        Ok(Self {
            tree,
            ids: library.ids().to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Nearest template for every feature vector, in input order
    ///
    /// A vector containing NaN fails with `NonFiniteFeature` naming its
    /// position in `features`.
    pub fn query(&self, features: &[[f64; N]]) -> Result<Vec<TemplateMatch>> {
        features
            .iter()
            .enumerate()
            .map(|(row, f)| {
                let hit = self
                    .tree
                    .nearest(f)
                    .ok_or(MockError::NonFiniteFeature { row })?;
                Ok(TemplateMatch {
                    template_id: self.ids[hit.index],
                    distance: hit.distance,
                })
            })
            .collect()
    }
}

/// Indices for every class that is matched in feature space
///
/// Quasars are not indexed; tracer quasars draw uniformly from `qso_ids`.
#[derive(Debug, Clone)]
pub struct TemplateIndex {
    pub bgs: ClassIndex<3>,
    pub elg: ClassIndex<3>,
    pub lrg: ClassIndex<3>,
    pub star: ClassIndex<3>,
    pub wd_da: ClassIndex<2>,
    pub wd_db: ClassIndex<2>,
    pub qso_ids: Vec<i64>,
}

impl TemplateIndex {
    pub fn build(libraries: &TemplateLibraries) -> Result<Self> {
        let index = Self {
            bgs: ClassIndex::build(&libraries.bgs)?,
            elg: ClassIndex::build(&libraries.elg)?,
            lrg: ClassIndex::build(&libraries.lrg)?,
            star: ClassIndex::build(&libraries.star)?,
            wd_da: ClassIndex::build(&libraries.wd_da)?,
            wd_db: ClassIndex::build(&libraries.wd_db)?,
            qso_ids: libraries.qso.clone(),
        };
        info!("Built template indices");
        Ok(index)
    }

    /// Index of a white dwarf subtype (`DA` or `DB`, case-insensitive)
    pub fn white_dwarf(&self, subtype: &str) -> Result<&ClassIndex<2>> {
        match subtype.trim().to_ascii_uppercase().as_str() {
            "DA" => Ok(&self.wd_da),
            "DB" => Ok(&self.wd_db),
            _ => Err(MockError::Unrecognized {
                kind: "white dwarf subtype",
                name: subtype.to_string(),
            }),
        }
    }
}
