//! Fundus extraction algorithms.
//!
//! Leaf-first:
//!
//! - **Region growing**: seeded connected components over the vertex graph
//! - **Folds**: depth thresholding, small-component removal, hole filling
//! - **Likelihood**: per-fold sigmoid scoring of depth and curvature
//! - **Geodesics**: bounded Dijkstra over mesh edges
//! - **Anchors**: greedy selection of separated likely vertices
//! - **Topology**: discrete simple-point test
//! - **HMMF**: topology-preserving relaxation connecting anchors into a curve
//! - **Fundi**: the whole pipeline, fold-parallel

pub mod anchors;
pub mod folds;
pub mod fundi;
pub mod geodesic;
pub mod hmmf;
pub mod likelihood;
pub mod progress;
pub mod region;
pub mod stats;
pub mod topology;

pub use progress::Progress;
