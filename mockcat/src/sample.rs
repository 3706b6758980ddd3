//! Synthetic photometry and velocity dispersions for mocks without native colors
//!
//! Each galaxy/quasar class has a pretrained Gaussian mixture model over
//! `[g, r, z, W1, W2, W3, W4, exp_r, exp_e1, exp_e2, dev_r, dev_e1, dev_e2]`.
//! The QSO model only covers the seven magnitudes.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use mock_math::GaussianMixtureModel;
use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::catalog::{ObjectClass, ShapeColumns};
use crate::error::{MockError, Result};

/// Number of magnitude columns in every model
pub const N_MAGNITUDES: usize = 7;
/// Number of columns in models that also carry galaxy shapes
pub const N_MAGNITUDES_AND_SHAPES: usize = 13;

/// Fraction of objects that get a distinct velocity dispersion, and its cap
const VDISP_FRACTION: f64 = 0.1;
const VDISP_MAX_DRAWS: usize = 40;

/// One mixture model per class
#[derive(Debug, Clone, Default)]
pub struct SampleGmm {
    models: BTreeMap<ObjectClass, GaussianMixtureModel>,
}

impl SampleGmm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the model for `class`, checking its dimension
    pub fn insert(&mut self, class: ObjectClass, model: GaussianMixtureModel) -> Result<()> {
        if !class.has_mixture_model() {
            return Err(MockError::Unrecognized {
                kind: "mixture model class",
                name: class.to_string(),
            });
        }
        let needed = required_dim(class);
        if model.dim() < needed {
            return Err(MockError::Config(format!(
                "{} mixture model has {} features, need at least {}",
                class,
                model.dim(),
                needed
            )));
        }
        self.models.insert(class, model);
        Ok(())
    }

    pub fn with_model(mut self, class: ObjectClass, model: GaussianMixtureModel) -> Result<Self> {
        self.insert(class, model)?;
        Ok(self)
    }

    /// Load every `<class>_gmm.json` found in `dir` (e.g. `elg_gmm.json`)
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut out = Self::new();
        for class in ObjectClass::ALL.into_iter().filter(|c| c.has_mixture_model()) {
            let path = dir.join(format!("{}_gmm.json", class.as_str().to_lowercase()));
            if path.exists() {
                debug!("Loading {} mixture model from {}", class, path.display());
                out.insert(class, GaussianMixtureModel::load_from_file(&path)?)?;
            }
        }
        info!("Loaded {} mixture model(s) from {}", out.models.len(), dir.display());
        Ok(out)
    }

    pub fn model(&self, class: ObjectClass) -> Option<&GaussianMixtureModel> {
        self.models.get(&class)
    }

    /// Draw `n` photometry samples for `class` from `rng`
    pub fn sample<R: Rng + ?Sized>(
        &self,
        class: ObjectClass,
        n: usize,
        rng: &mut R,
    ) -> Result<SampledPhotometry> {
        let model = self
            .models
            .get(&class)
            .ok_or_else(|| MockError::MissingMixtureModel(class.to_string()))?;
        let matrix = model.sample(n, rng);
        Ok(SampledPhotometry::from_matrix(
            &matrix,
            class != ObjectClass::Qso,
        ))
    }
}

fn required_dim(class: ObjectClass) -> usize {
    if class == ObjectClass::Qso {
        N_MAGNITUDES
    } else {
        N_MAGNITUDES_AND_SHAPES
    }
}

/// Sampled magnitudes, plus shapes for galaxy classes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledPhotometry {
    pub g: Vec<f64>,
    pub r: Vec<f64>,
    pub z: Vec<f64>,
    pub w1: Vec<f64>,
    pub w2: Vec<f64>,
    pub w3: Vec<f64>,
    pub w4: Vec<f64>,
    pub shapes: Option<ShapeColumns>,
}

impl SampledPhotometry {
    /// Split an `(n, features)` sample matrix into named columns
    pub fn from_matrix(matrix: &Array2<f64>, with_shapes: bool) -> Self {
        let col = |j: usize| matrix.column(j).to_vec();
        let shapes = with_shapes.then(|| ShapeColumns {
            exp_r: col(7),
            exp_e1: col(8),
            exp_e2: col(9),
            dev_r: col(10),
            dev_e1: col(11),
            dev_e2: col(12),
        });
        Self {
            g: col(0),
            r: col(1),
            z: col(2),
            w1: col(3),
            w2: col(4),
            w3: col(5),
            w4: col(6),
            shapes,
        }
    }

    pub fn len(&self) -> usize {
        self.g.len()
    }

    pub fn is_empty(&self) -> bool {
        self.g.is_empty()
    }

    pub fn gr(&self) -> Vec<f64> {
        difference(&self.g, &self.r)
    }

    pub fn rz(&self) -> Vec<f64> {
        difference(&self.r, &self.z)
    }

    pub fn rw1(&self) -> Vec<f64> {
        difference(&self.r, &self.w1)
    }

    pub fn w1w2(&self) -> Vec<f64> {
        difference(&self.w1, &self.w2)
    }
}

fn difference(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Draw velocity dispersions in km/s for `n` objects
///
/// A small pool of `max(min(round(0.1 n), 40), 1)` values `10^N(mean, sigma)`
/// is drawn first, then `n` picks are made from it with replacement.
/// `log_mean` must be finite and `log_sigma` finite and positive.
pub fn sample_vdisp<R: Rng + ?Sized>(
    log_mean: f64,
    log_sigma: f64,
    n: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    if !log_mean.is_finite() || !(log_sigma > 0.0 && log_sigma.is_finite()) {
        return Err(MockError::Config(format!(
            "velocity dispersion prior needs a finite mean and positive sigma, got ({log_mean}, {log_sigma})"
        )));
    }
    let normal = Normal::new(log_mean, log_sigma)
        .map_err(|e| MockError::Config(format!("velocity dispersion prior: {e}")))?;
    let n_draw = ((n as f64 * VDISP_FRACTION).round() as usize).clamp(1, VDISP_MAX_DRAWS);
    let pool: Vec<f64> = (0..n_draw)
        .map(|_| 10f64.powf(normal.sample(rng)))
        .collect();
    Ok((0..n).map(|_| pool[rng.gen_range(0..n_draw)]).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mock_math::{Covariances, MixtureParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    /// Single-component model centred on `means` with small diagonal spread
    pub(crate) fn point_model(means: Vec<f64>) -> GaussianMixtureModel {
        let dim = means.len();
        GaussianMixtureModel::new(MixtureParams {
            weights: vec![1.0],
            means: vec![means],
            covariances: Covariances::Diag(vec![vec![1e-6; dim]]),
        })
        .unwrap()
    }

    pub(crate) fn galaxy_means() -> Vec<f64> {
        vec![
            23.0, 22.5, 22.0, 21.0, 21.5, 19.0, 17.0, 0.5, 0.1, -0.1, 1.2, 0.05, 0.02,
        ]
    }

    pub(crate) fn qso_means() -> Vec<f64> {
        vec![22.0, 21.8, 21.5, 20.0, 19.5, 18.0, 16.0]
    }

    pub(crate) fn all_models() -> SampleGmm {
        SampleGmm::new()
            .with_model(ObjectClass::Elg, point_model(galaxy_means()))
            .unwrap()
            .with_model(ObjectClass::Lrg, point_model(galaxy_means()))
            .unwrap()
            .with_model(ObjectClass::Bgs, point_model(galaxy_means()))
            .unwrap()
            .with_model(ObjectClass::Qso, point_model(qso_means()))
            .unwrap()
    }

    #[test]
    fn test_sample_schema_per_class() {
        let gmm = all_models();
        let mut rng = StdRng::seed_from_u64(1);

        let elg = gmm.sample(ObjectClass::Elg, 25, &mut rng).unwrap();
        assert_eq!(elg.len(), 25);
        let shapes = elg.shapes.as_ref().unwrap();
        assert_eq!(shapes.dev_e2.len(), 25);
        assert_relative_eq!(elg.gr()[0], 0.5, epsilon = 0.01);
        assert_relative_eq!(elg.rz()[0], 0.5, epsilon = 0.01);
        assert_relative_eq!(elg.rw1()[0], 1.5, epsilon = 0.01);
        assert_relative_eq!(elg.w1w2()[0], -0.5, epsilon = 0.01);

        let qso = gmm.sample(ObjectClass::Qso, 10, &mut rng).unwrap();
        assert!(qso.shapes.is_none());
        assert_eq!(qso.w4.len(), 10);
    }

    #[test]
    fn test_missing_and_invalid_models() {
        let gmm = SampleGmm::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            gmm.sample(ObjectClass::Elg, 1, &mut rng),
            Err(MockError::MissingMixtureModel(_))
        ));

        let mut gmm = SampleGmm::new();
        assert!(gmm
            .insert(ObjectClass::Elg, point_model(qso_means()))
            .is_err());
        assert!(gmm
            .insert(ObjectClass::Star, point_model(galaxy_means()))
            .is_err());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let params = point_model(qso_means()).params().clone();
        std::fs::write(
            dir.path().join("qso_gmm.json"),
            serde_json::to_string(&params).unwrap(),
        )
        .unwrap();

        let gmm = SampleGmm::load_dir(dir.path()).unwrap();
        assert!(gmm.model(ObjectClass::Qso).is_some());
        assert!(gmm.model(ObjectClass::Elg).is_none());
    }

    #[test]
    fn test_vdisp_pool_size() {
        let mut rng = StdRng::seed_from_u64(5);

        // 1000 objects draw from a pool capped at 40 distinct values
        let v = sample_vdisp(1.9, 0.15, 1000, &mut rng).unwrap();
        assert_eq!(v.len(), 1000);
        let distinct: HashSet<u64> = v.iter().map(|x| x.to_bits()).collect();
        assert!(distinct.len() <= 40);
        assert!(v.iter().all(|&x| x > 0.0));

        // Very small samples still get one value
        let v = sample_vdisp(2.3, 0.1, 3, &mut rng).unwrap();
        assert_eq!(v.len(), 3);
        assert!(v.iter().all(|&x| x == v[0]));

        assert!(sample_vdisp(1.9, 0.15, 0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_vdisp_rejects_bad_prior() {
        let mut rng = StdRng::seed_from_u64(5);
        for (mean, sigma) in [(1.9, -1.0), (1.9, 0.0), (1.9, f64::NAN), (f64::INFINITY, 0.1)] {
            assert!(matches!(
                sample_vdisp(mean, sigma, 5, &mut rng),
                Err(MockError::Config(_))
            ));
        }
    }
}
