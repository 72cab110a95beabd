//! Fold segmentation from a depth map.
//!
//! A fold is a connected patch of vertices deeper than a threshold. Folds are
//! found by region growing over the deep vertices; components smaller than
//! [`FoldOptions::min_fold_size`] are discarded. Shallow islands enclosed by
//! a fold ("holes") are then found by region growing over the remaining
//! vertices and merged into the surrounding fold. The largest non-fold
//! component is the background and is never filled.
//!
//! # Example
//!
//! ```
//! use fundi::algo::folds::{extract_folds, DepthThreshold, FoldOptions, HoleFill};
//! use fundi::mesh::{Mesh, NeighborList};
//! use nalgebra::Point3;
//!
//! // 3x3 vertex patch with a deep center row
//! let mut points = Vec::new();
//! for j in 0..3 {
//!     for i in 0..3 {
//!         points.push(Point3::new(i as f64, j as f64, 0.0));
//!     }
//! }
//! let faces = vec![
//!     [0, 1, 4], [0, 4, 3], [1, 2, 5], [1, 5, 4],
//!     [3, 4, 7], [3, 7, 6], [4, 5, 8], [4, 8, 7],
//! ];
//! let mesh = Mesh::new(points, faces).unwrap();
//! let neighbors = NeighborList::build(&mesh);
//! let depths = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
//!
//! let options = FoldOptions::default()
//!     .with_depth_threshold(DepthThreshold::Absolute(0.5))
//!     .with_min_fold_size(2)
//!     .with_hole_fill(HoleFill::Disabled);
//! let folds = extract_folds(&mesh, &neighbors, &depths, &options).unwrap();
//! assert_eq!(folds.len(), 1);
//! assert_eq!(folds.fold(0).vertices, vec![3, 4, 5]);
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::region::grow_regions;
use super::stats::{percentile, sorted_finite};
use crate::error::{FundiError, Result};
use crate::mesh::{Mesh, NeighborList};

/// How the fold depth threshold is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthThreshold {
    /// Vertices with depth above this value are fold seeds.
    Absolute(f64),
    /// Threshold at this fraction (0 to 1) of the sorted depth values.
    Fraction(f64),
}

impl DepthThreshold {
    /// Resolve to an absolute depth for the given depth map.
    ///
    /// A fraction threshold over a map with no finite values resolves to
    /// `+inf`, so nothing is selected.
    pub fn resolve(&self, depths: &[f64]) -> f64 {
        match *self {
            DepthThreshold::Absolute(t) => t,
            DepthThreshold::Fraction(f) => {
                let sorted = sorted_finite(depths.iter().copied());
                percentile(&sorted, f).unwrap_or(f64::INFINITY)
            }
        }
    }
}

/// Policy for merging holes into folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleFill {
    /// Merge each hole into the fold it shares the most boundary edges with;
    /// ties go to the larger fold label.
    MostSharedBoundary,
    /// Merge each hole into the first fold found scanning hole vertices and
    /// their neighbors in ascending id order.
    ///
    /// The lowest-id hole vertex with a labelled neighbor decides, and labels
    /// are read from the segmentation before any hole is filled. A hole
    /// touching several folds therefore goes to the fold next to its lowest
    /// vertex, not to the one next to its highest.
    FirstContact,
    /// Leave holes unfilled.
    Disabled,
}

/// Options for fold extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldOptions {
    /// Depth threshold defining fold seeds.
    pub depth_threshold: DepthThreshold,

    /// Minimum number of vertices for a component to become a fold.
    pub min_fold_size: usize,

    /// Minimum number of seed vertices a triangle needs to connect seeds.
    ///
    /// 1 (or 2) gives plain edge connectivity between seeds; 3 connects
    /// seeds only through triangles that are entirely deep.
    pub min_seeds_per_face: usize,

    /// How holes are merged into folds.
    pub hole_fill: HoleFill,

    /// Only vertices deeper than this are considered when finding holes.
    /// `None` considers every non-fold vertex.
    pub min_hole_depth: Option<f64>,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            depth_threshold: DepthThreshold::Fraction(0.5),
            min_fold_size: 50,
            min_seeds_per_face: 1,
            hole_fill: HoleFill::MostSharedBoundary,
            min_hole_depth: None,
        }
    }
}

impl FoldOptions {
    /// Set the depth threshold.
    pub fn with_depth_threshold(mut self, threshold: DepthThreshold) -> Self {
        self.depth_threshold = threshold;
        self
    }

    /// Set the minimum fold size.
    pub fn with_min_fold_size(mut self, size: usize) -> Self {
        self.min_fold_size = size;
        self
    }

    /// Set the minimum number of seeds per connecting triangle.
    pub fn with_min_seeds_per_face(mut self, count: usize) -> Self {
        self.min_seeds_per_face = count;
        self
    }

    /// Set the hole filling policy.
    pub fn with_hole_fill(mut self, policy: HoleFill) -> Self {
        self.hole_fill = policy;
        self
    }

    /// Restrict hole search to vertices deeper than `depth`.
    pub fn with_min_hole_depth(mut self, depth: f64) -> Self {
        self.min_hole_depth = Some(depth);
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        match self.depth_threshold {
            DepthThreshold::Fraction(f) if !(0.0..=1.0).contains(&f) => {
                return Err(FundiError::invalid_param(
                    "depth_threshold.fraction",
                    f,
                    "must be in [0, 1]",
                ));
            }
            DepthThreshold::Absolute(t) if t.is_nan() => {
                return Err(FundiError::invalid_param(
                    "depth_threshold.absolute",
                    t,
                    "must be a number",
                ));
            }
            _ => {}
        }
        if !(1..=3).contains(&self.min_seeds_per_face) {
            return Err(FundiError::invalid_param(
                "min_seeds_per_face",
                self.min_seeds_per_face,
                "must be 1, 2 or 3",
            ));
        }
        Ok(())
    }
}

/// A connected deep region of the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fold {
    /// 1-based label, as written to per-vertex label maps.
    pub label: usize,
    /// Member vertices, ascending.
    pub vertices: Vec<usize>,
}

impl Fold {
    /// Number of member vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Check if the fold has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// All folds of a surface.
#[derive(Debug, Clone)]
pub struct FoldSet {
    folds: Vec<Fold>,
    labels: Vec<usize>,
    depth_threshold: f64,
    holes_filled: usize,
}

impl FoldSet {
    /// Number of folds.
    #[inline]
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    /// Check if no folds were found.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Fold by index (label - 1).
    #[inline]
    pub fn fold(&self, index: usize) -> &Fold {
        &self.folds[index]
    }

    /// All folds in label order.
    #[inline]
    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    /// Per-vertex fold labels; 0 is background.
    #[inline]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Index of the fold containing `v`.
    #[inline]
    pub fn fold_of(&self, v: usize) -> Option<usize> {
        self.labels[v].checked_sub(1)
    }

    /// The absolute depth threshold that was applied.
    #[inline]
    pub fn depth_threshold(&self) -> f64 {
        self.depth_threshold
    }

    /// Number of holes merged into folds.
    #[inline]
    pub fn holes_filled(&self) -> usize {
        self.holes_filled
    }
}

/// Segment a surface into folds.
///
/// # Errors
///
/// - [`FundiError::FieldLength`] if `depths` or `neighbors` do not match the mesh
/// - [`FundiError::InvalidParameter`] if the options are out of range
pub fn extract_folds(
    mesh: &Mesh,
    neighbors: &NeighborList,
    depths: &[f64],
    options: &FoldOptions,
) -> Result<FoldSet> {
    options.validate()?;
    let n = mesh.num_vertices();
    if depths.len() != n {
        return Err(FundiError::field_length("depth", n, depths.len()));
    }
    if neighbors.len() != n {
        return Err(FundiError::field_length("neighbors", n, neighbors.len()));
    }

    let threshold = options.depth_threshold.resolve(depths);
    let is_seed: Vec<bool> = depths.iter().map(|&d| d > threshold).collect();
    let seeds: Vec<usize> = (0..n).filter(|&v| is_seed[v]).collect();
    log::debug!(
        "fold threshold {:.4}: {} of {} vertices are seeds",
        threshold,
        seeds.len(),
        n
    );

    let graph: Cow<'_, NeighborList> = if options.min_seeds_per_face > 1 {
        let k = options.min_seeds_per_face;
        let filtered = NeighborList::build_filtered(mesh, |face| {
            face.iter().filter(|&&v| is_seed[v]).count() >= k
        });
        Cow::Owned(filtered)
    } else {
        Cow::Borrowed(neighbors)
    };

    let segmentation = grow_regions(&seeds, &graph, options.min_fold_size.max(1));
    let mut labels = vec![0usize; n];
    for (id, segment) in segmentation.segments().iter().enumerate() {
        for &v in segment {
            labels[v] = id + 1;
        }
    }
    let n_folds = segmentation.num_segments();
    log::debug!("segmented {} folds", n_folds);

    let holes_filled = if n_folds > 0 && options.hole_fill != HoleFill::Disabled {
        fill_holes(neighbors, depths, &mut labels, options)
    } else {
        0
    };

    let mut folds: Vec<Fold> = (1..=n_folds)
        .map(|label| Fold {
            label,
            vertices: Vec::new(),
        })
        .collect();
    for (v, &label) in labels.iter().enumerate() {
        if label > 0 {
            folds[label - 1].vertices.push(v);
        }
    }

    Ok(FoldSet {
        folds,
        labels,
        depth_threshold: threshold,
        holes_filled,
    })
}

/// Merge enclosed non-fold components into neighboring folds.
///
/// Returns the number of holes filled.
fn fill_holes(
    neighbors: &NeighborList,
    depths: &[f64],
    labels: &mut [usize],
    options: &FoldOptions,
) -> usize {
    let seeds: Vec<usize> = (0..labels.len())
        .filter(|&v| labels[v] == 0)
        .filter(|&v| options.min_hole_depth.map_or(true, |min| depths[v] > min))
        .collect();

    let holes = grow_regions(&seeds, neighbors, 1);
    let background = holes.largest();
    log::debug!(
        "found {} candidate holes ({} vertices)",
        holes.num_segments().saturating_sub(1),
        holes.num_segmented()
    );

    let snapshot = labels.to_vec();
    let mut filled = 0;
    for (id, hole) in holes.segments().iter().enumerate() {
        if Some(id) == background {
            continue;
        }
        let target = match options.hole_fill {
            HoleFill::MostSharedBoundary => most_shared_label(hole, neighbors, &snapshot),
            HoleFill::FirstContact => first_contact_label(hole, neighbors, &snapshot),
            HoleFill::Disabled => None,
        };
        if let Some(label) = target {
            for &v in hole {
                labels[v] = label;
            }
            filled += 1;
        }
    }
    filled
}

fn most_shared_label(hole: &[usize], neighbors: &NeighborList, labels: &[usize]) -> Option<usize> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &v in hole {
        for &w in neighbors.neighbors(v) {
            let label = labels[w];
            if label == 0 {
                continue;
            }
            match counts.iter_mut().find(|(l, _)| *l == label) {
                Some((_, c)) => *c += 1,
                None => counts.push((label, 1)),
            }
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(label, _)| label)
}

fn first_contact_label(hole: &[usize], neighbors: &NeighborList, labels: &[usize]) -> Option<usize> {
    hole.iter()
        .flat_map(|&v| neighbors.neighbors(v))
        .map(|&w| labels[w])
        .find(|&label| label > 0)
}
