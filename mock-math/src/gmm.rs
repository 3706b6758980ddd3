//! Gaussian mixture model sampling
//!
//! Pretrained mixture models are stored as plain parameter sets (weights, means
//! and covariances) and only ever sampled from. Sampling follows the usual
//! two-stage scheme:
//!
//! 1. One uniform draw per sample picks a component through the weight CDF.
//! 2. For each component in turn, all of its samples are drawn at once as
//!    `mean + A·n` with `n ~ N(0, I)` and `A` the symmetric square root of the
//!    component covariance.
//!
//! The draw order is fixed, so a seeded generator always yields the same matrix.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::Array2;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or validating a mixture model
#[derive(Error, Debug)]
pub enum MixtureError {
    #[error("Mixture model has no components")]
    NoComponents,
    #[error("Mixture weights must be non-negative and sum to a positive value")]
    InvalidWeights,
    #[error("Component {component} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        component: usize,
        expected: usize,
        found: usize,
    },
    #[error("Expected {expected} per-component entries, found {found}")]
    ComponentCount { expected: usize, found: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid mixture model file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Covariance parameterisation of a mixture model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum Covariances {
    /// One full `d×d` matrix per component
    Full(Vec<Vec<Vec<f64>>>),
    /// One variance vector per component
    Diag(Vec<Vec<f64>>),
    /// One scalar variance per component
    Spherical(Vec<f64>),
    /// A single `d×d` matrix shared by every component
    Tied(Vec<Vec<f64>>),
}

/// Serialized parameters of a mixture model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureParams {
    pub weights: Vec<f64>,
    pub means: Vec<Vec<f64>>,
    pub covariances: Covariances,
}

#[derive(Debug, Clone)]
struct Component {
    mean: DVector<f64>,
    transform: DMatrix<f64>,
}

/// A validated Gaussian mixture model ready for sampling
#[derive(Debug, Clone)]
pub struct GaussianMixtureModel {
    params: MixtureParams,
    weight_cdf: Vec<f64>,
    components: Vec<Component>,
    dim: usize,
}

impl GaussianMixtureModel {
    /// Validate the parameters and precompute per-component transforms
    pub fn new(params: MixtureParams) -> Result<Self, MixtureError> {
        let n_comp = params.weights.len();
        if n_comp == 0 || params.means.is_empty() {
            return Err(MixtureError::NoComponents);
        }
        if params.means.len() != n_comp {
            return Err(MixtureError::ComponentCount {
                expected: n_comp,
                found: params.means.len(),
            });
        }
        if params.weights.iter().any(|w| !(*w >= 0.0)) {
            return Err(MixtureError::InvalidWeights);
        }
        let total: f64 = params.weights.iter().sum();
        if !(total > 0.0) {
            return Err(MixtureError::InvalidWeights);
        }

        let dim = params.means[0].len();
        for (component, mean) in params.means.iter().enumerate() {
            if mean.len() != dim {
                return Err(MixtureError::DimensionMismatch {
                    component,
                    expected: dim,
                    found: mean.len(),
                });
            }
        }

        let transforms = covariance_transforms(&params.covariances, n_comp, dim)?;
        let components = params
            .means
            .iter()
            .zip(transforms)
            .map(|(mean, transform)| Component {
                mean: DVector::from_column_slice(mean),
                transform,
            })
            .collect();

        let mut acc = 0.0;
        let weight_cdf = params
            .weights
            .iter()
            .map(|w| {
                acc += w / total;
                acc
            })
            .collect();

        Ok(Self {
            params,
            weight_cdf,
            components,
            dim,
        })
    }

    /// Load model parameters from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, MixtureError> {
        let json = std::fs::read_to_string(path)?;
        let params: MixtureParams = serde_json::from_str(&json)?;
        Self::new(params)
    }

    /// Number of features per sample
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of mixture components
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// The parameters this model was built from
    pub fn params(&self) -> &MixtureParams {
        &self.params
    }

    /// Draw `n_samples` independent samples as an `(n_samples, dim)` matrix.
    ///
    /// Consumes exactly `n_samples` uniforms followed by `n_samples * dim`
    /// standard normals from `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Array2<f64> {
        let mut out = Array2::zeros((n_samples, self.dim));
        let last = self.components.len() - 1;

        let assignment: Vec<usize> = (0..n_samples)
            .map(|_| {
                let u: f64 = rng.gen();
                self.weight_cdf.partition_point(|&c| c < u).min(last)
            })
            .collect();

        for (comp_idx, comp) in self.components.iter().enumerate() {
            let rows: Vec<usize> = assignment
                .iter()
                .enumerate()
                .filter(|(_, &c)| c == comp_idx)
                .map(|(row, _)| row)
                .collect();
            if rows.is_empty() {
                continue;
            }

            // Feature-major draw order: all samples of feature 0, then feature 1, ...
            let normals: Vec<f64> = (0..self.dim * rows.len())
                .map(|_| rng.sample::<f64, _>(StandardNormal))
                .collect();
            let z = DMatrix::from_row_slice(self.dim, rows.len(), &normals);
            let x = &comp.transform * z;

            for (col, &row) in rows.iter().enumerate() {
                for f in 0..self.dim {
                    out[[row, f]] = x[(f, col)] + comp.mean[f];
                }
            }
        }

        out
    }
}

/// Symmetric square roots of the component covariances
fn covariance_transforms(
    covariances: &Covariances,
    n_comp: usize,
    dim: usize,
) -> Result<Vec<DMatrix<f64>>, MixtureError> {
    let check_count = |found: usize| {
        if found == n_comp {
            Ok(())
        } else {
            Err(MixtureError::ComponentCount {
                expected: n_comp,
                found,
            })
        }
    };

    match covariances {
        Covariances::Full(mats) => {
            check_count(mats.len())?;
            mats.iter()
                .enumerate()
                .map(|(component, m)| Ok(matrix_sqrt(&to_matrix(m, dim, component)?)))
                .collect()
        }
        Covariances::Tied(m) => {
            let root = matrix_sqrt(&to_matrix(m, dim, 0)?);
            Ok(vec![root; n_comp])
        }
        Covariances::Diag(vars) => {
            check_count(vars.len())?;
            vars.iter()
                .enumerate()
                .map(|(component, v)| {
                    if v.len() != dim {
                        return Err(MixtureError::DimensionMismatch {
                            component,
                            expected: dim,
                            found: v.len(),
                        });
                    }
                    let sd = DVector::from_iterator(dim, v.iter().map(|x| x.max(0.0).sqrt()));
                    Ok(DMatrix::from_diagonal(&sd))
                })
                .collect()
        }
        Covariances::Spherical(vars) => {
            check_count(vars.len())?;
            Ok(vars
                .iter()
                .map(|v| DMatrix::identity(dim, dim) * v.max(0.0).sqrt())
                .collect())
        }
    }
}

fn to_matrix(rows: &[Vec<f64>], dim: usize, component: usize) -> Result<DMatrix<f64>, MixtureError> {
    if rows.len() != dim || rows.iter().any(|r| r.len() != dim) {
        return Err(MixtureError::DimensionMismatch {
            component,
            expected: dim,
            found: rows.len(),
        });
    }
    Ok(DMatrix::from_fn(dim, dim, |r, c| rows[r][c]))
}

/// `U·sqrt(max(s, 0))` from the eigendecomposition `C = U·diag(s)·Uᵀ`
fn matrix_sqrt(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let eig = SymmetricEigen::new(cov.clone());
    let mut u = eig.eigenvectors;
    for (j, s) in eig.eigenvalues.iter().enumerate() {
        let scale = s.max(0.0).sqrt();
        u.column_mut(j).scale_mut(scale);
    }
    u
}
