//! mock-math - Numerical building blocks for mock catalog processing
//!
//! This crate provides the generic numerics used when turning simulated
//! catalogs into spectra, including:
//!
//! - **KdTree** - Static k-d tree for exact nearest-neighbour queries
//! - **GMM** - Gaussian mixture model sampling for synthetic photometry
//!
//! # Example
//!
//! ```text
//! use mock_math::KdTree;
//!
//! // Template library in (Teff, logg) space
//! let tree = KdTree::build(vec![[5000.0, 4.5], [12000.0, 8.0]])?;
//! let hit = tree.nearest(&[11500.0, 7.9]);
//! ```

pub mod gmm;
pub mod kdtree;

// Re-export commonly used types
pub use gmm::{Covariances, GaussianMixtureModel, MixtureError, MixtureParams};
pub use kdtree::{KdTree, KdTreeError, Neighbor};
