//! Whole-surface fundus extraction.
//!
//! Runs the full pipeline on one surface:
//!
//! 1. [`extract_folds`] segments the surface into folds by depth.
//! 2. Per fold, [`likelihood::score`](super::likelihood::score) rates every
//!    vertex from its depth and curvature.
//! 3. [`select_anchors`] picks separated high-likelihood vertices.
//! 4. [`connect_anchors`] relaxes the fold into a curve through the anchors.
//!
//! Folds are independent and run in parallel with rayon unless
//! [`FundusOptions::parallel`] is off. A problem in one fold is recorded on
//! its [`FoldResult`] and never stops the others.
//!
//! # Example
//!
//! ```
//! use fundi::algo::fundi::{extract_fundi, FundusOptions};
//! use fundi::algo::folds::{DepthThreshold, FoldOptions};
//! use fundi::mesh::Mesh;
//!
//! // 5x5 vertex grid with a deep middle row
//! let mut coords = Vec::new();
//! for j in 0..5 {
//!     for i in 0..5 {
//!         coords.push([i as f64, j as f64, 0.0]);
//!     }
//! }
//! let mut faces = Vec::new();
//! for j in 0..4 {
//!     for i in 0..4 {
//!         let v = j * 5 + i;
//!         faces.push([v, v + 1, v + 6]);
//!         faces.push([v, v + 6, v + 5]);
//!     }
//! }
//! let mesh = Mesh::from_coords(&coords, faces).unwrap();
//! let depth: Vec<f64> = (0..25).map(|v| if v / 5 == 2 { 1.0 + (v % 5) as f64 * 0.1 } else { 0.0 }).collect();
//! let curvature = vec![0.0; 25];
//!
//! let options = FundusOptions::default().with_folds(
//!     FoldOptions::default()
//!         .with_depth_threshold(DepthThreshold::Absolute(0.5))
//!         .with_min_fold_size(3),
//! );
//! let extraction = extract_fundi(&mesh, &depth, &curvature, &options).unwrap();
//! assert_eq!(extraction.num_folds(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::anchors::{select_anchors, AnchorOptions};
use super::folds::{extract_folds, Fold, FoldOptions, FoldSet};
use super::hmmf::{connect_anchors, HmmfOptions, Termination};
use super::likelihood::{self, LikelihoodOptions};
use super::progress::Progress;
use crate::error::{FundiError, Result};
use crate::mesh::{Mesh, NeighborList};

/// Options for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundusOptions {
    /// Fold segmentation.
    pub folds: FoldOptions,

    /// Likelihood scoring.
    pub likelihood: LikelihoodOptions,

    /// Anchor selection.
    pub anchors: AnchorOptions,

    /// Curve relaxation.
    pub hmmf: HmmfOptions,

    /// Whether to process folds in parallel (default: true).
    pub parallel: bool,
}

impl Default for FundusOptions {
    fn default() -> Self {
        Self {
            folds: FoldOptions::default(),
            likelihood: LikelihoodOptions::default(),
            anchors: AnchorOptions::default(),
            hmmf: HmmfOptions::default(),
            parallel: true,
        }
    }
}

impl FundusOptions {
    /// Set fold segmentation options.
    pub fn with_folds(mut self, folds: FoldOptions) -> Self {
        self.folds = folds;
        self
    }

    /// Set likelihood options.
    pub fn with_likelihood(mut self, likelihood: LikelihoodOptions) -> Self {
        self.likelihood = likelihood;
        self
    }

    /// Set anchor options.
    pub fn with_anchors(mut self, anchors: AnchorOptions) -> Self {
        self.anchors = anchors;
        self
    }

    /// Set relaxation options.
    pub fn with_hmmf(mut self, hmmf: HmmfOptions) -> Self {
        self.hmmf = hmmf;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Use sequential execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check every stage's parameters.
    pub fn validate(&self) -> Result<()> {
        self.folds.validate()?;
        self.likelihood.validate()?;
        self.anchors.validate()?;
        self.hmmf.validate()
    }
}

/// Outcome of one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FoldStatus {
    /// Anchors were connected.
    Connected {
        /// Relaxation converged before the sweep cap.
        converged: bool,
    },
    /// Too few vertices above the likelihood threshold to look for anchors;
    /// the curve is empty.
    TooFewCandidates {
        /// Number of candidate vertices.
        found: usize,
    },
    /// Fewer than two anchors; the curve is empty.
    TooFewAnchors {
        /// Number of anchors found.
        found: usize,
    },
    /// Processing the fold failed.
    Failed {
        /// Error description.
        message: String,
    },
}

/// Soft problems noticed while processing a fold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum FoldWarning {
    /// Depth and/or curvature had no spread within the fold.
    ConstantValues {
        /// Depth was constant.
        depth: bool,
        /// Curvature was constant.
        curvature: bool,
    },
    /// Relaxation stopped at the sweep cap.
    NonConvergence {
        /// Sweeps performed.
        sweeps: usize,
    },
}

/// Everything computed for one fold.
#[derive(Debug, Clone)]
pub struct FoldResult {
    /// The fold.
    pub fold: Fold,
    /// Likelihood per fold vertex, aligned with `fold.vertices`.
    pub likelihood: Vec<f64>,
    /// Anchors in selection order.
    pub anchors: Vec<usize>,
    /// Curve vertices, ascending.
    pub curve: Vec<usize>,
    /// Final relaxation field per fold vertex, aligned with `fold.vertices`.
    pub field: Vec<f64>,
    /// Relaxation sweeps performed.
    pub sweeps: usize,
    /// Outcome.
    pub status: FoldStatus,
    /// Soft problems.
    pub warnings: Vec<FoldWarning>,
}

impl FoldResult {
    fn new(fold: &Fold) -> Self {
        Self {
            fold: fold.clone(),
            likelihood: vec![0.0; fold.len()],
            anchors: Vec::new(),
            curve: Vec::new(),
            field: vec![0.0; fold.len()],
            sweeps: 0,
            status: FoldStatus::TooFewAnchors { found: 0 },
            warnings: Vec::new(),
        }
    }

    /// Whether a curve was produced.
    pub fn is_connected(&self) -> bool {
        matches!(self.status, FoldStatus::Connected { .. })
    }

    /// Serializable summary.
    pub fn report(&self) -> FoldReport {
        FoldReport {
            label: self.fold.label,
            size: self.fold.len(),
            anchors: self.anchors.clone(),
            curve_size: self.curve.len(),
            sweeps: self.sweeps,
            status: self.status.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

/// JSON-friendly per-fold summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldReport {
    /// Fold label.
    pub label: usize,
    /// Fold vertex count.
    pub size: usize,
    /// Anchor vertices.
    pub anchors: Vec<usize>,
    /// Curve vertex count.
    pub curve_size: usize,
    /// Relaxation sweeps.
    pub sweeps: usize,
    /// Outcome.
    pub status: FoldStatus,
    /// Soft problems.
    pub warnings: Vec<FoldWarning>,
}

/// Result of [`extract_fundi`].
#[derive(Debug, Clone)]
pub struct FundusExtraction {
    folds: FoldSet,
    results: Vec<FoldResult>,
}

impl FundusExtraction {
    /// The fold segmentation.
    #[inline]
    pub fn folds(&self) -> &FoldSet {
        &self.folds
    }

    /// Number of folds.
    #[inline]
    pub fn num_folds(&self) -> usize {
        self.results.len()
    }

    /// Per-fold results in label order.
    #[inline]
    pub fn results(&self) -> &[FoldResult] {
        &self.results
    }

    /// Number of folds with a curve.
    pub fn num_fundi(&self) -> usize {
        self.results.iter().filter(|r| r.is_connected()).count()
    }

    /// Per-vertex fold labels; 0 is background.
    pub fn fold_labels(&self) -> &[usize] {
        self.folds.labels()
    }

    /// Per-vertex likelihood, 0 outside folds.
    pub fn likelihood_field(&self) -> Vec<f64> {
        self.scatter(|r| &r.likelihood)
    }

    /// Per-vertex final relaxation field, 0 outside folds.
    pub fn hmmf_field(&self) -> Vec<f64> {
        self.scatter(|r| &r.field)
    }

    /// Per-vertex fundus labels: the fold label on curve vertices, else 0.
    pub fn fundus_labels(&self) -> Vec<usize> {
        let mut labels = vec![0; self.folds.labels().len()];
        for result in &self.results {
            for &v in &result.curve {
                labels[v] = result.fold.label;
            }
        }
        labels
    }

    /// Summaries of every fold.
    pub fn report(&self) -> Vec<FoldReport> {
        self.results.iter().map(FoldResult::report).collect()
    }

    fn scatter<F>(&self, values: F) -> Vec<f64>
    where
        F: Fn(&FoldResult) -> &Vec<f64>,
    {
        let mut field = vec![0.0; self.folds.labels().len()];
        for result in &self.results {
            for (&v, &x) in result.fold.vertices.iter().zip(values(result)) {
                field[v] = x;
            }
        }
        field
    }
}

/// Extract fundi from a surface.
///
/// Builds the neighbor list and runs [`extract_fundi_with_neighbors`].
pub fn extract_fundi(
    mesh: &Mesh,
    depths: &[f64],
    curvatures: &[f64],
    options: &FundusOptions,
) -> Result<FundusExtraction> {
    let neighbors = NeighborList::build(mesh);
    extract_fundi_with_progress(mesh, &neighbors, depths, curvatures, options, &Progress::none())
}

/// Extract fundi reusing a prebuilt neighbor list.
pub fn extract_fundi_with_neighbors(
    mesh: &Mesh,
    neighbors: &NeighborList,
    depths: &[f64],
    curvatures: &[f64],
    options: &FundusOptions,
) -> Result<FundusExtraction> {
    extract_fundi_with_progress(mesh, neighbors, depths, curvatures, options, &Progress::none())
}

/// Extract fundi, reporting once per finished fold.
///
/// # Errors
///
/// Only input problems are errors: invalid options, or per-vertex fields
/// and neighbor lists that do not match the mesh. Per-fold problems end up
/// in [`FoldResult::status`].
pub fn extract_fundi_with_progress(
    mesh: &Mesh,
    neighbors: &NeighborList,
    depths: &[f64],
    curvatures: &[f64],
    options: &FundusOptions,
    progress: &Progress,
) -> Result<FundusExtraction> {
    options.validate()?;
    let n = mesh.num_vertices();
    if curvatures.len() != n {
        return Err(FundiError::field_length("curvature", n, curvatures.len()));
    }

    let folds = extract_folds(mesh, neighbors, depths, &options.folds)?;
    log::info!(
        "{} folds (depth threshold {:.4}, {} holes filled)",
        folds.len(),
        folds.depth_threshold(),
        folds.holes_filled()
    );

    let total = folds.len();
    let done = AtomicUsize::new(0);
    let run = |fold: &Fold| {
        let result = process_fold(mesh, neighbors, fold, depths, curvatures, options);
        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        progress.report(finished, total, "fold connected");
        result
    };

    let results: Vec<FoldResult> = if options.parallel {
        folds.folds().par_iter().map(run).collect()
    } else {
        folds.folds().iter().map(run).collect()
    };

    let extraction = FundusExtraction { folds, results };
    log::info!(
        "extracted {} fundi from {} folds",
        extraction.num_fundi(),
        extraction.num_folds()
    );
    Ok(extraction)
}

fn process_fold(
    mesh: &Mesh,
    neighbors: &NeighborList,
    fold: &Fold,
    depths: &[f64],
    curvatures: &[f64],
    options: &FundusOptions,
) -> FoldResult {
    let mut result = FoldResult::new(fold);
    if let Err(err) = connect_fold(mesh, neighbors, depths, curvatures, options, &mut result) {
        log::warn!("fold {}: {}", fold.label, err);
        result.curve.clear();
        result.status = FoldStatus::Failed {
            message: err.to_string(),
        };
    }
    result
}

fn connect_fold(
    mesh: &Mesh,
    neighbors: &NeighborList,
    depths: &[f64],
    curvatures: &[f64],
    options: &FundusOptions,
    result: &mut FoldResult,
) -> Result<()> {
    let label = result.fold.label;
    let vertices = &result.fold.vertices;

    let fold_depths: Vec<f64> = vertices.iter().map(|&v| depths[v]).collect();
    let fold_curves: Vec<f64> = vertices.iter().map(|&v| curvatures[v]).collect();
    let score = likelihood::score(&fold_depths, &fold_curves, &options.likelihood)?;
    if score.constant_depth || score.constant_curvature {
        log::warn!(
            "fold {}: constant values within fold (depth: {}, curvature: {})",
            label,
            score.constant_depth,
            score.constant_curvature
        );
        result.warnings.push(FoldWarning::ConstantValues {
            depth: score.constant_depth,
            curvature: score.constant_curvature,
        });
    }

    let candidates = options.anchors.count_candidates(&score.values);
    if candidates <= options.anchors.min_candidates {
        log::debug!("fold {}: {} candidate(s), no curve", label, candidates);
        result.likelihood = score.values;
        result.status = FoldStatus::TooFewCandidates { found: candidates };
        return Ok(());
    }

    let anchors = select_anchors(mesh, neighbors, vertices, &score.values, &options.anchors)?;
    result.likelihood = score.values;
    if anchors.len() < 2 {
        log::debug!("fold {}: {} anchor(s), no curve", label, anchors.len());
        result.status = FoldStatus::TooFewAnchors {
            found: anchors.len(),
        };
        result.anchors = anchors;
        return Ok(());
    }

    let curve = connect_anchors(neighbors, vertices, &result.likelihood, &anchors, &options.hmmf)?;

    let converged = curve.termination == Termination::Converged;
    if curve.is_exhausted() {
        log::warn!(
            "fold {}: relaxation did not converge in {} sweeps",
            label,
            curve.sweeps
        );
        result.warnings.push(FoldWarning::NonConvergence {
            sweeps: curve.sweeps,
        });
    }
    log::debug!(
        "fold {}: {} vertices, {} anchors, {} curve vertices",
        label,
        vertices.len(),
        anchors.len(),
        curve.curve.len()
    );

    result.field = curve.field;
    result.curve = curve.curve;
    result.sweeps = curve.sweeps;
    result.anchors = anchors;
    result.status = FoldStatus::Connected { converged };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::folds::DepthThreshold;
    use crate::mesh::testing::grid_mesh;

    fn center_fold_options() -> FundusOptions {
        FundusOptions::default()
            .with_folds(
                FoldOptions::default()
                    .with_depth_threshold(DepthThreshold::Absolute(0.5))
                    .with_min_fold_size(4),
            )
            .with_anchors(
                AnchorOptions::default()
                    .with_likelihood_threshold(0.2)
                    .with_min_distance(1.2),
            )
    }

    fn center_depths() -> Vec<f64> {
        let mut depths = vec![0.0; 16];
        for v in [5, 6, 9, 10] {
            depths[v] = 1.0;
        }
        depths
    }

    #[test]
    fn test_end_to_end_center_fold() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mesh = grid_mesh(3);
        let depths = center_depths();
        let curvatures = vec![0.0; 16];

        let extraction = extract_fundi(&mesh, &depths, &curvatures, &center_fold_options()).unwrap();
        assert_eq!(extraction.num_folds(), 1);

        let result = &extraction.results()[0];
        assert_eq!(result.fold.vertices, vec![5, 6, 9, 10]);
        // Constant inputs give a flat likelihood
        for &l in &result.likelihood {
            assert!((l - 0.25).abs() < 1e-12);
        }
        assert!(result.warnings.contains(&FoldWarning::ConstantValues {
            depth: true,
            curvature: true
        }));

        // Anchor selection is greedy, not a farthest-pair search. With every
        // likelihood tied, 5 (lowest id) goes first and blocks 6 and 9 at
        // distance 1; 10 sits one diagonal edge (sqrt 2) away and is kept.
        // The geodesically farthest pair, 6 and 9, can never both be chosen.
        assert_eq!(result.anchors, vec![5, 10]);
        assert!(result.is_connected());
        assert!(result.curve.contains(&5));
        assert!(result.curve.contains(&10));

        let labels = extraction.fundus_labels();
        assert_eq!(labels[5], 1);
        assert_eq!(labels[0], 0);
        assert_eq!(extraction.fold_labels()[6], 1);
    }

    #[test]
    fn test_single_anchor_gives_empty_curve() {
        let mesh = grid_mesh(3);
        let depths = center_depths();
        let curvatures = vec![0.0; 16];
        let mut options = center_fold_options();
        options.anchors.min_distance = 5.0;

        let extraction = extract_fundi(&mesh, &depths, &curvatures, &options).unwrap();
        let result = &extraction.results()[0];
        assert_eq!(result.anchors, vec![5]);
        assert_eq!(result.status, FoldStatus::TooFewAnchors { found: 1 });
        assert!(result.curve.is_empty());
        assert_eq!(extraction.num_fundi(), 0);
        assert!(extraction.fundus_labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn test_exhausted_fold_flagged() {
        let mesh = grid_mesh(3);
        let options = center_fold_options().with_hmmf(HmmfOptions::default().with_max_count(1));

        let extraction = extract_fundi(&mesh, &center_depths(), &[0.0; 16], &options).unwrap();
        let result = &extraction.results()[0];
        assert_eq!(result.sweeps, 1);
        assert_eq!(result.status, FoldStatus::Connected { converged: false });
        assert!(result.is_connected());
        assert!(result
            .warnings
            .contains(&FoldWarning::NonConvergence { sweeps: 1 }));
        // The best-effort curve still holds the anchors
        assert!(result.curve.contains(&5));
        assert!(result.curve.contains(&10));
        assert_eq!(extraction.num_fundi(), 1);

        let report = &extraction.report()[0];
        assert_eq!(report.status, FoldStatus::Connected { converged: false });
        assert!(report.warnings.contains(&FoldWarning::NonConvergence { sweeps: 1 }));
    }

    #[test]
    fn test_too_few_candidates_skips_fold() {
        let mesh = grid_mesh(3);
        // All four fold vertices score 0.25, above the 0.2 threshold
        let mut options = center_fold_options();
        options.anchors = options.anchors.with_min_candidates(4);

        let extraction = extract_fundi(&mesh, &center_depths(), &[0.0; 16], &options).unwrap();
        let result = &extraction.results()[0];
        assert_eq!(result.status, FoldStatus::TooFewCandidates { found: 4 });
        assert!(result.anchors.is_empty());
        assert!(result.curve.is_empty());
        assert!((result.likelihood[0] - 0.25).abs() < 1e-12);

        options.anchors = options.anchors.with_min_candidates(3);
        let extraction = extract_fundi(&mesh, &center_depths(), &[0.0; 16], &options).unwrap();
        assert!(extraction.results()[0].is_connected());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mesh = grid_mesh(12);
        let n = mesh.num_vertices();
        // Two deep stripes separated by a shallow column
        let depths: Vec<f64> = (0..n)
            .map(|v| {
                let (i, j) = (v % 13, v / 13);
                match i {
                    2..=4 | 8..=10 => 1.0 + 0.1 * ((j * 7 + i) % 5) as f64,
                    _ => 0.0,
                }
            })
            .collect();
        let curvatures: Vec<f64> = (0..n).map(|v| ((v as f64) * 0.37).sin()).collect();

        let options = FundusOptions::default()
            .with_folds(
                FoldOptions::default()
                    .with_depth_threshold(DepthThreshold::Absolute(0.5))
                    .with_min_fold_size(10),
            )
            .with_anchors(AnchorOptions::default().with_min_distance(3.0));

        let par = extract_fundi(&mesh, &depths, &curvatures, &options).unwrap();
        let seq = extract_fundi(&mesh, &depths, &curvatures, &options.clone().sequential()).unwrap();

        assert_eq!(par.num_folds(), 2);
        assert_eq!(par.report(), seq.report());
        assert_eq!(par.fundus_labels(), seq.fundus_labels());
        assert_eq!(par.likelihood_field(), seq.likelihood_field());
        assert_eq!(par.hmmf_field(), seq.hmmf_field());
    }

    #[test]
    fn test_progress_reports_each_fold() {
        let mesh = grid_mesh(3);
        let neighbors = NeighborList::build(&mesh);
        let count = std::sync::Arc::new(AtomicUsize::new(0));
        let seen = std::sync::Arc::clone(&count);
        let progress = Progress::new(move |_, total, _| {
            assert_eq!(total, 1);
            seen.fetch_add(1, Ordering::Relaxed);
        });

        extract_fundi_with_progress(
            &mesh,
            &neighbors,
            &center_depths(),
            &[0.0; 16],
            &center_fold_options(),
            &progress,
        )
        .unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_input_errors() {
        let mesh = grid_mesh(3);
        let options = center_fold_options();
        assert!(matches!(
            extract_fundi(&mesh, &center_depths(), &[0.0; 3], &options),
            Err(FundiError::FieldLength { .. })
        ));
        assert!(matches!(
            extract_fundi(&mesh, &[0.0; 3], &[0.0; 16], &options),
            Err(FundiError::FieldLength { .. })
        ));
        let bad = options.with_hmmf(HmmfOptions::default().with_max_count(0));
        assert!(extract_fundi(&mesh, &center_depths(), &[0.0; 16], &bad).is_err());
    }

    #[test]
    fn test_no_folds() {
        let mesh = grid_mesh(3);
        let extraction = extract_fundi(&mesh, &[0.0; 16], &[0.0; 16], &center_fold_options()).unwrap();
        assert_eq!(extraction.num_folds(), 0);
        assert!(extraction.likelihood_field().iter().all(|&l| l == 0.0));
    }
}
