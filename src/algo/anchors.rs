//! Anchor selection.
//!
//! Anchors are the vertices a fundus curve must pass through. They are chosen
//! greedily: candidates above a likelihood threshold are visited from most to
//! least likely, and each is accepted only if it lies at least
//! [`AnchorOptions::min_distance`] away from every anchor accepted so far.
//!
//! With the geodesic metric, distance is measured along mesh edges without
//! leaving the fold, so two patches of one fold that touch only through
//! shallow vertices never block each other.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::geodesic::within_radius;
use crate::error::{FundiError, Result};
use crate::mesh::{Mesh, NeighborList};

/// How anchor separation is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Shortest path along mesh edges, restricted to the fold.
    #[default]
    Geodesic,
    /// Straight-line distance between vertex positions.
    Euclidean,
}

/// Options for anchor selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorOptions {
    /// Minimum separation between any two anchors.
    pub min_distance: f64,

    /// Only vertices with likelihood strictly above this are candidates.
    pub likelihood_threshold: f64,

    /// Separation metric.
    pub metric: DistanceMetric,

    /// Stop after this many anchors.
    pub max_anchors: Option<usize>,

    /// A fold is only connected when it has more than this many candidates
    /// (vertices above the likelihood threshold). 0 only skips folds with
    /// no candidate at all.
    pub min_candidates: usize,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            min_distance: 5.0,
            likelihood_threshold: 0.5,
            metric: DistanceMetric::Geodesic,
            max_anchors: None,
            min_candidates: 0,
        }
    }
}

impl AnchorOptions {
    /// Set the minimum anchor separation.
    pub fn with_min_distance(mut self, distance: f64) -> Self {
        self.min_distance = distance;
        self
    }

    /// Set the likelihood threshold for candidates.
    pub fn with_likelihood_threshold(mut self, threshold: f64) -> Self {
        self.likelihood_threshold = threshold;
        self
    }

    /// Set the separation metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Cap the number of anchors.
    pub fn with_max_anchors(mut self, max: usize) -> Self {
        self.max_anchors = Some(max);
        self
    }

    /// Require more than `count` candidates before connecting a fold.
    pub fn with_min_candidates(mut self, count: usize) -> Self {
        self.min_candidates = count;
        self
    }

    /// Number of likelihood values strictly above the candidate threshold.
    pub fn count_candidates(&self, likelihood: &[f64]) -> usize {
        likelihood
            .iter()
            .filter(|&&l| l > self.likelihood_threshold)
            .count()
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_distance.is_finite() && self.min_distance >= 0.0) {
            return Err(FundiError::invalid_param(
                "min_distance",
                self.min_distance,
                "must be finite and non-negative",
            ));
        }
        if !self.likelihood_threshold.is_finite() {
            return Err(FundiError::invalid_param(
                "likelihood_threshold",
                self.likelihood_threshold,
                "must be finite",
            ));
        }
        Ok(())
    }
}

/// Select separated high-likelihood anchors within one fold.
///
/// # Arguments
///
/// * `mesh` - Surface the fold lives on
/// * `neighbors` - Neighbor list of `mesh`
/// * `fold_vertices` - Vertex ids of the fold
/// * `likelihood` - One value per entry of `fold_vertices`
/// * `options` - Threshold, separation and metric
///
/// # Returns
///
/// Anchors in acceptance order, most likely first. Ties in likelihood are
/// broken by ascending vertex id.
///
/// # Example
///
/// ```
/// use fundi::algo::anchors::{select_anchors, AnchorOptions};
/// use fundi::mesh::{Mesh, NeighborList};
///
/// // A strip of four unit-spaced vertices
/// let coords = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0],
///               [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [2.0, 1.0, 0.0], [3.0, 1.0, 0.0]];
/// let faces = vec![[0, 1, 5], [0, 5, 4], [1, 2, 6], [1, 6, 5], [2, 3, 7], [2, 7, 6]];
/// let mesh = Mesh::from_coords(&coords, faces).unwrap();
/// let neighbors = NeighborList::build(&mesh);
///
/// let fold = [0, 1, 2, 3];
/// let likelihood = [0.9, 0.8, 0.7, 0.95];
/// let options = AnchorOptions::default().with_min_distance(2.0);
/// let anchors = select_anchors(&mesh, &neighbors, &fold, &likelihood, &options).unwrap();
/// assert_eq!(anchors, vec![3, 0]);
/// ```
pub fn select_anchors(
    mesh: &Mesh,
    neighbors: &NeighborList,
    fold_vertices: &[usize],
    likelihood: &[f64],
    options: &AnchorOptions,
) -> Result<Vec<usize>> {
    options.validate()?;
    if likelihood.len() != fold_vertices.len() {
        return Err(FundiError::field_length(
            "likelihood",
            fold_vertices.len(),
            likelihood.len(),
        ));
    }
    let n = mesh.num_vertices();
    if neighbors.len() != n {
        return Err(FundiError::field_length("neighbors", n, neighbors.len()));
    }
    if let Some(&v) = fold_vertices.iter().find(|&&v| v >= n) {
        return Err(FundiError::invalid_param("fold vertex", v, "out of range"));
    }

    let mut candidates: Vec<(usize, f64)> = fold_vertices
        .iter()
        .copied()
        .zip(likelihood.iter().copied())
        .filter(|&(_, l)| l > options.likelihood_threshold)
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let max_anchors = options.max_anchors.unwrap_or(usize::MAX);
    let mut anchors: Vec<usize> = Vec::new();

    match options.metric {
        DistanceMetric::Geodesic => {
            let in_fold: HashSet<usize> = fold_vertices.iter().copied().collect();
            let mut blocked: HashSet<usize> = HashSet::new();

            for (v, _) in candidates {
                if anchors.len() >= max_anchors {
                    break;
                }
                if blocked.contains(&v) {
                    continue;
                }
                anchors.push(v);
                blocked.insert(v);

                let reach = within_radius(mesh.points(), neighbors, v, options.min_distance, |w| {
                    in_fold.contains(&w)
                });
                blocked.extend(reach.into_iter().map(|(w, _)| w));
            }
        }
        DistanceMetric::Euclidean => {
            for (v, _) in candidates {
                if anchors.len() >= max_anchors {
                    break;
                }
                let separated = anchors
                    .iter()
                    .all(|&a| a != v && mesh.distance(a, v) >= options.min_distance);
                if separated {
                    anchors.push(v);
                }
            }
        }
    }

    log::debug!(
        "selected {} anchors from {} fold vertices",
        anchors.len(),
        fold_vertices.len()
    );
    Ok(anchors)
}
