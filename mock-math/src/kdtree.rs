//! Static k-d tree for nearest-neighbour queries in small feature spaces
//!
//! The tree is built once over a fixed point set and answers exact Euclidean
//! nearest-neighbour queries. The dimension is a const generic so that each
//! feature space (e.g. `(Teff, logg)` vs `(z, g-r, r-z)`) gets its own type.
//!
//! # Usage
//!
//! ```
//! use mock_math::kdtree::KdTree;
//!
//! let tree = KdTree::build(vec![[0.0, 0.0], [10.0, 10.0]]).unwrap();
//! let hit = tree.nearest(&[1.0, 1.0]).unwrap();
//! assert_eq!(hit.index, 0);
//! ```

use thiserror::Error;

/// Errors raised while building a k-d tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KdTreeError {
    #[error("Cannot build a k-d tree from an empty point set")]
    Empty,
    #[error("Point {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// Result of a nearest-neighbour query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the matched point in the order given to [`KdTree::build`]
    pub index: usize,
    /// Euclidean distance between the query and the matched point
    pub distance: f64,
}

#[derive(Debug, Clone)]
struct Node {
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// A k-d tree over `N`-dimensional points
#[derive(Debug, Clone)]
pub struct KdTree<const N: usize> {
    points: Vec<[f64; N]>,
    nodes: Vec<Node>,
    root: usize,
}

impl<const N: usize> KdTree<N> {
    /// Build a balanced tree by recursive median splits.
    ///
    /// Splitting axes cycle through the dimensions. Points must be finite.
    pub fn build(points: Vec<[f64; N]>) -> Result<Self, KdTreeError> {
        if points.is_empty() {
            return Err(KdTreeError::Empty);
        }
        if let Some(index) = points
            .iter()
            .position(|p| p.iter().any(|v| !v.is_finite()))
        {
            return Err(KdTreeError::NonFinite { index });
        }

        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let Some(root) = Self::build_node(&points, &mut order, 0, &mut nodes) else {
            return Err(KdTreeError::Empty);
        };

        Ok(Self {
            points,
            nodes,
            root,
        })
    }

    fn build_node(
        points: &[[f64; N]],
        order: &mut [usize],
        depth: usize,
        nodes: &mut Vec<Node>,
    ) -> Option<usize> {
        if order.is_empty() {
            return None;
        }

        let axis = depth % N;
        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |&a, &b| points[a][axis].total_cmp(&points[b][axis]));

        let slot = nodes.len();
        nodes.push(Node {
            point: order[mid],
            axis,
            left: None,
            right: None,
        });

        let (lower, rest) = order.split_at_mut(mid);
        let upper = &mut rest[1..];
        let left = Self::build_node(points, lower, depth + 1, nodes);
        let right = Self::build_node(points, upper, depth + 1, nodes);
        nodes[slot].left = left;
        nodes[slot].right = right;

        Some(slot)
    }

    /// Number of points in the tree
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; an empty tree cannot be built
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point stored at `index`
    pub fn point(&self, index: usize) -> Option<&[f64; N]> {
        self.points.get(index)
    }

    /// Find the nearest stored point to `query`.
    ///
    /// Returns `None` only when the query contains NaN, since no distance can
    /// then be ordered.
    pub fn nearest(&self, query: &[f64; N]) -> Option<Neighbor> {
        let mut best: Option<(usize, f64)> = None;
        self.search(self.root, query, &mut best);
        best.map(|(index, dist_sq)| Neighbor {
            index,
            distance: dist_sq.sqrt(),
        })
    }

    /// Nearest neighbour for every query, in query order
    pub fn nearest_many(&self, queries: &[[f64; N]]) -> Vec<Option<Neighbor>> {
        queries.iter().map(|q| self.nearest(q)).collect()
    }

    fn search(&self, node_idx: usize, query: &[f64; N], best: &mut Option<(usize, f64)>) {
        let node = &self.nodes[node_idx];
        let point = &self.points[node.point];

        let dist_sq = squared_distance(point, query);
        let improves = match best {
            Some((_, best_sq)) => dist_sq < *best_sq,
            None => !dist_sq.is_nan(),
        };
        if improves {
            *best = Some((node.point, dist_sq));
        }

        let delta = query[node.axis] - point[node.axis];
        let (near, far) = if delta < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, query, best);
        }
        if let Some(far) = far {
            // Only cross the splitting plane if it is closer than the best hit
            let cross = match best {
                Some((_, best_sq)) => delta * delta < *best_sq,
                None => true,
            };
            if cross {
                self.search(far, query, best);
            }
        }
    }
}

fn squared_distance<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn brute_force<const N: usize>(points: &[[f64; N]], query: &[f64; N]) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for (i, p) in points.iter().enumerate() {
            let d = squared_distance(p, query);
            if d < best.1 {
                best = (i, d);
            }
        }
        (best.0, best.1.sqrt())
    }

    #[test]
    fn test_two_point_library() {
        let tree = KdTree::build(vec![[0.0, 0.0], [10.0, 10.0]]).unwrap();

        let hit = tree.nearest(&[1.0, 1.0]).unwrap();
        assert_eq!(hit.index, 0);
        assert_relative_eq!(hit.distance, 2.0_f64.sqrt(), epsilon = 1e-12);

        let hit = tree.nearest(&[9.0, 9.0]).unwrap();
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn test_exact_match_has_zero_distance() {
        let points = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let tree = KdTree::build(points).unwrap();
        let hit = tree.nearest(&[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.distance, 0.0);
    }

    #[test]
    fn test_matches_brute_force_3d() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let points: Vec<[f64; 3]> = (0..500)
            .map(|_| {
                [
                    rng.gen_range(3000.0..10000.0),
                    rng.gen_range(0.0..5.5),
                    rng.gen_range(-2.5..0.5),
                ]
            })
            .collect();
        let tree = KdTree::build(points.clone()).unwrap();

        for _ in 0..200 {
            let q = [
                rng.gen_range(2500.0..10500.0),
                rng.gen_range(-0.5..6.0),
                rng.gen_range(-3.0..1.0),
            ];
            let hit = tree.nearest(&q).unwrap();
            let (idx, dist) = brute_force(&points, &q);
            assert_relative_eq!(hit.distance, dist, epsilon = 1e-9);
            assert_eq!(
                squared_distance(&points[hit.index], &q),
                squared_distance(&points[idx], &q)
            );
        }
    }

    #[test]
    fn test_duplicate_points() {
        let tree = KdTree::build(vec![[1.0, 1.0]; 16]).unwrap();
        let hit = tree.nearest(&[0.0, 0.0]).unwrap();
        assert!(hit.index < 16);
        assert_relative_eq!(hit.distance, 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_build_errors() {
        let empty: Vec<[f64; 2]> = Vec::new();
        assert_eq!(KdTree::build(empty).unwrap_err(), KdTreeError::Empty);

        let err = KdTree::build(vec![[0.0, 1.0], [f64::NAN, 2.0]]).unwrap_err();
        assert_eq!(err, KdTreeError::NonFinite { index: 1 });
    }

    #[test]
    fn test_nan_query_has_no_match() {
        let tree = KdTree::build(vec![[0.0, 0.0], [1.0, 1.0]]).unwrap();
        assert!(tree.nearest(&[f64::NAN, 0.0]).is_none());
    }

    #[test]
    fn test_nearest_many_preserves_order() {
        let tree = KdTree::build(vec![[0.0], [5.0], [10.0]]).unwrap();
        let hits = tree.nearest_many(&[[9.0], [0.4], [5.2]]);
        let idx: Vec<usize> = hits.iter().map(|h| h.unwrap().index).collect();
        assert_eq!(idx, vec![2, 0, 1]);
    }
}
