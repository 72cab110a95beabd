//! # Fundi
//!
//! Extraction of sulcal fundi, the curves running along the bottoms of
//! cortical folds, from triangulated brain-surface meshes.
//!
//! Given a surface and two per-vertex maps (depth and curvature), fundi
//! segments the surface into deep folds, scores how likely each fold vertex
//! is to lie on a fundus, picks well-separated anchor vertices and connects
//! them with a relaxation scheme that never changes the topology of the
//! growing curve.
//!
//! ## Features
//!
//! - **Fold segmentation**: depth thresholding with region growing and hole filling
//! - **Likelihood scoring**: deviation or percentile sigmoid models
//! - **Anchor selection**: greedy, separated by geodesic or Euclidean distance
//! - **Curve connection**: HMMF relaxation gated by a simple-point test
//! - **Fold-parallel pipeline**: rayon over independent folds
//! - **File formats**: PLY with per-vertex scalar properties, plain-text fields
//!
//! ## Quick Start
//!
//! ```no_run
//! use fundi::prelude::*;
//!
//! let surface = fundi::io::load_surface("lh.pial.ply").unwrap();
//! let depth = surface.field("depth").unwrap();
//! let curvature = surface.field("curvature").unwrap();
//!
//! let extraction = extract_fundi(&surface.mesh, depth, curvature, &FundusOptions::default()).unwrap();
//! for result in extraction.results() {
//!     println!("fold {}: {} curve vertices", result.fold.label, result.curve.len());
//! }
//! ```
//!
//! ## Working Stage by Stage
//!
//! ```
//! use fundi::prelude::*;
//!
//! // Path-shaped adjacency: 0-1-2-3-4
//! let rows = vec![vec![1], vec![0, 2], vec![1, 3], vec![2, 4], vec![3]];
//! let neighbors = NeighborList::from_adjacency(rows).unwrap();
//!
//! // Components of the seed set {0, 1, 3, 4}
//! let segments = grow_regions(&[0, 1, 3, 4], &neighbors, 1);
//! assert_eq!(segments.num_segments(), 2);
//!
//! // Vertex 1 is an endpoint of the inside set {0, 1}, so it may flip
//! let values = [1.0, 1.0, 0.0, 0.0, 0.0];
//! assert!(is_simple(1, &values, 0.5, &neighbors));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use fundi::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::anchors::{select_anchors, AnchorOptions, DistanceMetric};
    pub use crate::algo::folds::{extract_folds, DepthThreshold, Fold, FoldOptions, FoldSet, HoleFill};
    pub use crate::algo::fundi::{
        extract_fundi, extract_fundi_with_neighbors, FoldResult, FoldStatus, FoldWarning,
        FundusExtraction, FundusOptions,
    };
    pub use crate::algo::hmmf::{connect_anchors, CurveResult, HmmfOptions, Termination};
    pub use crate::algo::likelihood::{LikelihoodModel, LikelihoodOptions};
    pub use crate::algo::region::{grow_regions, Segmentation};
    pub use crate::algo::topology::is_simple;
    pub use crate::error::{FundiError, Result};
    pub use crate::mesh::{build_neighbors, Mesh, NeighborList};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron_neighbors() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let neighbors = build_neighbors(&points, &faces).unwrap();

        // Every vertex of a tetrahedron touches the other three
        for v in 0..4 {
            assert_eq!(neighbors.degree(v), 3);
            assert!(!neighbors.neighbors(v).contains(&v));
        }
        assert_eq!(neighbors.num_edges(), 6);
        assert!(neighbors.is_symmetric());
    }

    #[test]
    fn test_invalid_face_index() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let result = build_neighbors(&points, &[[0, 1, 2]]);
        assert!(matches!(result, Err(FundiError::InvalidVertexIndex { vertex: 2, .. })));
    }
}
