//! Anchor connection by Hidden Markov Measure Field relaxation.
//!
//! Each fold vertex carries a value `H` in `[0, 1]`; the curve is the set of
//! vertices with `H` above a threshold. Starting from a field where every
//! likely vertex is inside and the anchors are pinned at 1, repeated sweeps
//! lower `H` where that reduces the cost
//!
//! ```text
//! cost(i) = H[i] * (wL - L[i]) + wN * Σ_j (H[i] - H[j])²
//! ```
//!
//! The first term rewards keeping likely vertices; the second rewards
//! agreeing with neighbors. A vertex may only cross the threshold when it is
//! a simple point (see [`topology`](super::topology)), so the inside set is
//! thinned toward a curve without being cut apart.
//!
//! Within a sweep, costs read the field from the previous sweep while
//! topology tests read the field being written, so the order in which
//! vertices are visited only matters through the topology gate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::topology::is_simple_by;
use crate::error::{FundiError, Result};
use crate::mesh::NeighborList;

/// Options for HMMF relaxation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmfOptions {
    /// Field values above this are on the curve.
    pub threshold: f64,

    /// Likelihood weight `wL` in the cost.
    pub w_likelihood: f64,

    /// Neighbor smoothness weight `wN` in the cost.
    pub w_neighbors: f64,

    /// Step by which a value is tentatively lowered each sweep.
    pub decrement: f64,

    /// Values at or below this are frozen.
    pub min_h: f64,

    /// Per-vertex cost decrease below which a sweep counts as stalled.
    pub min_change: f64,

    /// Number of stalled sweeps before stopping.
    pub n_tries_no_change: usize,

    /// Hard cap on the number of sweeps.
    pub max_count: usize,

    /// Offset in the initial mapping `(L + offset) / 2`. Slightly above 1 so
    /// every positive likelihood starts strictly above 0.5.
    pub init_offset: f64,
}

impl Default for HmmfOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            w_likelihood: 1.1,
            w_neighbors: 0.4,
            decrement: 0.05,
            min_h: 0.01,
            min_change: 0.0001,
            n_tries_no_change: 3,
            max_count: 100,
            init_offset: 1.000001,
        }
    }
}

impl HmmfOptions {
    /// Set the curve threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the likelihood and neighbor weights.
    pub fn with_weights(mut self, w_likelihood: f64, w_neighbors: f64) -> Self {
        self.w_likelihood = w_likelihood;
        self.w_neighbors = w_neighbors;
        self
    }

    /// Set the per-sweep decrement.
    pub fn with_decrement(mut self, decrement: f64) -> Self {
        self.decrement = decrement;
        self
    }

    /// Set the minimum cost change.
    pub fn with_min_change(mut self, min_change: f64) -> Self {
        self.min_change = min_change;
        self
    }

    /// Set the number of stalled sweeps tolerated.
    pub fn with_n_tries_no_change(mut self, n: usize) -> Self {
        self.n_tries_no_change = n;
        self
    }

    /// Set the sweep cap.
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Set the value at or below which vertices are frozen.
    pub fn with_min_h(mut self, min_h: f64) -> Self {
        self.min_h = min_h;
        self
    }

    /// Set the offset of the initial mapping `(L + offset) / 2`.
    pub fn with_init_offset(mut self, offset: f64) -> Self {
        self.init_offset = offset;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.threshold) {
            return Err(FundiError::invalid_param(
                "threshold",
                self.threshold,
                "must be in [0, 1)",
            ));
        }
        for (name, value) in [
            ("w_likelihood", self.w_likelihood),
            ("w_neighbors", self.w_neighbors),
            ("min_h", self.min_h),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FundiError::invalid_param(
                    name,
                    value,
                    "must be finite and non-negative",
                ));
            }
        }
        if !(self.decrement.is_finite() && self.decrement > 0.0) {
            return Err(FundiError::invalid_param(
                "decrement",
                self.decrement,
                "must be positive",
            ));
        }
        if !self.min_change.is_finite() {
            return Err(FundiError::invalid_param(
                "min_change",
                self.min_change,
                "must be finite",
            ));
        }
        if self.n_tries_no_change == 0 {
            return Err(FundiError::invalid_param(
                "n_tries_no_change",
                self.n_tries_no_change,
                "must be at least 1",
            ));
        }
        if self.max_count == 0 {
            return Err(FundiError::invalid_param(
                "max_count",
                self.max_count,
                "must be at least 1",
            ));
        }
        if !(self.init_offset.is_finite() && self.init_offset > 0.0) {
            return Err(FundiError::invalid_param(
                "init_offset",
                self.init_offset,
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Cost of value `h` at a vertex whose in-fold neighbors are `ring`
    /// (fold-local indices into `field`) and which has `outside` neighbors
    /// off the fold, where the field is 0.
    #[inline]
    fn cost(&self, h: f64, likelihood: f64, ring: &[usize], outside: usize, field: &[f64]) -> f64 {
        let smoothness: f64 =
            ring.iter().map(|&j| (h - field[j]).powi(2)).sum::<f64>() + outside as f64 * h * h;
        h * (self.w_likelihood - likelihood) + self.w_neighbors * smoothness
    }
}

/// Counts consecutive stalled sweeps.
///
/// A sweep is stalled when the number of points above the threshold is
/// unchanged and the per-vertex cost decrease is below `min_change`. Any
/// other sweep resets the count.
#[derive(Debug, Clone)]
struct StallCounter {
    min_change: f64,
    n_vertices: f64,
    previous: Option<(usize, f64)>,
    stalls: usize,
}

impl StallCounter {
    fn new(min_change: f64, n_vertices: usize) -> Self {
        Self {
            min_change,
            n_vertices: n_vertices.max(1) as f64,
            previous: None,
            stalls: 0,
        }
    }

    /// Record a finished sweep and return the current run of stalls.
    fn record(&mut self, n_points: usize, cost_sum: f64) -> usize {
        if let Some((prev_points, prev_sum)) = self.previous {
            let stalled = n_points == prev_points
                && (prev_sum - cost_sum) / self.n_vertices < self.min_change;
            self.stalls = if stalled { self.stalls + 1 } else { 0 };
        }
        self.previous = Some((n_points, cost_sum));
        self.stalls
    }
}

/// How a relaxation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The field stopped changing.
    Converged,
    /// The sweep cap was reached first.
    Exhausted,
    /// Fewer than two anchors; nothing to connect.
    NotRun,
}

/// Output of [`connect_anchors`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurveResult {
    /// Final field, aligned with the fold vertices.
    pub field: Vec<f64>,
    /// Vertices with field value above the threshold, ascending.
    pub curve: Vec<usize>,
    /// How the run ended.
    pub termination: Termination,
    /// Number of sweeps performed.
    pub sweeps: usize,
}

impl CurveResult {
    fn not_run(n: usize) -> Self {
        Self {
            field: vec![0.0; n],
            curve: Vec::new(),
            termination: Termination::NotRun,
            sweeps: 0,
        }
    }

    /// The run hit the sweep cap.
    pub fn is_exhausted(&self) -> bool {
        self.termination == Termination::Exhausted
    }
}

/// Connect anchors within a fold into a curve.
///
/// Every buffer is sized to the fold, not the mesh. Neighbors outside the
/// fold take part in the smoothness term with a fixed value of 0.
///
/// # Arguments
///
/// * `neighbors` - Neighbor list of the whole mesh
/// * `fold_vertices` - Distinct vertices of the fold; only these are updated
/// * `likelihood` - One value per entry of `fold_vertices`
/// * `anchors` - Fold vertices pinned on the curve
/// * `options` - Relaxation parameters
///
/// With fewer than two distinct anchors nothing runs and the curve is empty.
///
/// # Errors
///
/// [`FundiError::FieldLength`] if `likelihood` does not match the fold,
/// [`FundiError::InvalidParameter`] for bad options, out-of-range or
/// repeated fold vertices, or anchors outside the fold.
///
/// # Example
///
/// ```
/// use fundi::algo::hmmf::{connect_anchors, HmmfOptions, Termination};
/// use fundi::mesh::NeighborList;
///
/// // Path 0-1-2-3-4 with both ends anchored
/// let rows = vec![vec![1], vec![0, 2], vec![1, 3], vec![2, 4], vec![3]];
/// let neighbors = NeighborList::from_adjacency(rows).unwrap();
/// let fold = [0, 1, 2, 3, 4];
/// let likelihood = [0.9; 5];
///
/// let result = connect_anchors(&neighbors, &fold, &likelihood, &[0, 4], &HmmfOptions::default()).unwrap();
/// assert_eq!(result.curve, vec![0, 1, 2, 3, 4]);
/// assert_ne!(result.termination, Termination::NotRun);
/// ```
pub fn connect_anchors(
    neighbors: &NeighborList,
    fold_vertices: &[usize],
    likelihood: &[f64],
    anchors: &[usize],
    options: &HmmfOptions,
) -> Result<CurveResult> {
    options.validate()?;
    let n_fold = fold_vertices.len();
    if likelihood.len() != n_fold {
        return Err(FundiError::field_length("likelihood", n_fold, likelihood.len()));
    }

    let mut local: HashMap<usize, usize> = HashMap::with_capacity(n_fold);
    for (i, &v) in fold_vertices.iter().enumerate() {
        if v >= neighbors.len() {
            return Err(FundiError::invalid_param("fold vertex", v, "out of range"));
        }
        if local.insert(v, i).is_some() {
            return Err(FundiError::invalid_param("fold vertex", v, "repeated"));
        }
    }

    let mut is_anchor = vec![false; n_fold];
    for &a in anchors {
        let i = *local
            .get(&a)
            .ok_or_else(|| FundiError::invalid_param("anchor", a, "not in the fold"))?;
        is_anchor[i] = true;
    }
    let n_anchors = is_anchor.iter().filter(|&&a| a).count();
    if n_anchors < 2 {
        log::debug!("{} anchor(s), skipping relaxation", n_anchors);
        return Ok(CurveResult::not_run(n_fold));
    }

    // Fold-local rings, plus how many neighbors lie off the fold
    let mut rings: Vec<Vec<usize>> = Vec::with_capacity(n_fold);
    let mut outside: Vec<usize> = Vec::with_capacity(n_fold);
    for &v in fold_vertices {
        let ring: Vec<usize> = neighbors
            .neighbors(v)
            .iter()
            .filter_map(|w| local.get(w).copied())
            .collect();
        outside.push(neighbors.degree(v) - ring.len());
        rings.push(ring);
    }

    let thr = options.threshold;
    let mut h: Vec<f64> = likelihood
        .iter()
        .zip(&is_anchor)
        .map(|(&l, &anchor)| {
            if anchor {
                return 1.0;
            }
            let init = if l > 0.0 { ((l + options.init_offset) / 2.0).min(1.0) } else { 0.0 };
            if init > thr {
                init
            } else {
                0.0
            }
        })
        .collect();

    let mut costs: Vec<f64> = (0..n_fold)
        .map(|i| options.cost(h[i], likelihood[i], &rings[i], outside[i], &h))
        .collect();

    let mut stalls = StallCounter::new(options.min_change, n_fold);
    let mut sweeps = 0;

    let termination = loop {
        let mut h_new = h.clone();

        for (i, &v) in fold_vertices.iter().enumerate() {
            if is_anchor[i] || h[i] <= options.min_h {
                continue;
            }
            let ring = &rings[i];
            let q = (h[i] - options.decrement).max(0.0);
            let cost_q = options.cost(q, likelihood[i], ring, outside[i], &h);
            let test = h[i] - (costs[i] - cost_q);

            let value_of = |k: usize| local.get(&k).map_or(0.0, |&j| h_new[j]);
            let update = if h[i] >= thr && thr >= test {
                is_simple_by(v, neighbors, |k| value_of(k) > thr)
            } else if h[i] <= thr && thr <= test {
                is_simple_by(v, neighbors, |k| 1.0 - value_of(k) > thr)
            } else {
                true
            };

            if update {
                let value = test.clamp(0.0, 1.0);
                h_new[i] = value;
                costs[i] = options.cost(value, likelihood[i], ring, outside[i], &h);
            }
        }

        let cost_sum: f64 = costs.iter().sum();
        let n_points = h_new.iter().filter(|&&x| x > thr).count();
        let run = stalls.record(n_points, cost_sum);
        h = h_new;
        sweeps += 1;

        log::trace!(
            "sweep {}: cost {:.6}, {} points above threshold",
            sweeps,
            cost_sum,
            n_points
        );

        if run >= options.n_tries_no_change {
            break Termination::Converged;
        }
        if sweeps >= options.max_count {
            break Termination::Exhausted;
        }
    };

    let mut curve: Vec<usize> = fold_vertices
        .iter()
        .zip(&h)
        .filter(|(_, &x)| x > thr)
        .map(|(&v, _)| v)
        .collect();
    curve.sort_unstable();
    log::debug!(
        "relaxation {:?} after {} sweeps: {} curve vertices",
        termination,
        sweeps,
        curve.len()
    );

    Ok(CurveResult {
        field: h,
        curve,
        termination,
        sweeps,
    })
}

/// Vertices whose field value exceeds `threshold`, ascending.
pub fn threshold_curve(field: &[f64], threshold: f64) -> Vec<usize> {
    field
        .iter()
        .enumerate()
        .filter(|(_, &h)| h > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Map a field to 1 above `threshold` and 0 elsewhere.
pub fn binarize(field: &[f64], threshold: f64) -> Vec<f64> {
    field
        .iter()
        .map(|&h| if h > threshold { 1.0 } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::testing::{grid_mesh, ring_neighbors};

    #[test]
    fn test_ring_with_opposite_anchors() {
        let neighbors = ring_neighbors(20);
        let fold: Vec<usize> = (0..20).collect();
        let likelihood = vec![0.6; 20];
        let options = HmmfOptions::default();

        let result = connect_anchors(&neighbors, &fold, &likelihood, &[0, 10], &options).unwrap();

        assert!(result.sweeps <= options.max_count);
        assert_eq!(result.termination, Termination::Converged);
        assert!(result.curve.contains(&0));
        assert!(result.curve.contains(&10));
        assert_eq!(result.field[0], 1.0);
        assert_eq!(result.field[10], 1.0);
        assert!(result.field.iter().all(|&h| (0.0..=1.0).contains(&h)));
    }

    #[test]
    fn test_initial_field_mapping() {
        // One sweep is never enough to converge
        let neighbors = ring_neighbors(6);
        let fold: Vec<usize> = (0..6).collect();
        let likelihood = vec![1.0, 0.0, 0.2, 0.2, 0.2, 1.0];
        let options = HmmfOptions::default().with_max_count(1);

        let result = connect_anchors(&neighbors, &fold, &likelihood, &[0, 5], &options).unwrap();
        assert_eq!(result.termination, Termination::Exhausted);
        assert!(result.is_exhausted());
        assert_eq!(result.sweeps, 1);
        // Zero likelihood starts outside and is frozen there
        assert_eq!(result.field[1], 0.0);
    }

    #[test]
    fn test_grid_fold_thins_toward_likely_row() {
        let mesh = grid_mesh(4);
        let neighbors = NeighborList::build(&mesh);
        // Rows 1 to 3 form the fold; row 2 is the likely one
        let fold: Vec<usize> = (5..20).collect();
        let mut likelihood = vec![0.0; 25];
        for &v in &fold {
            likelihood[v] = if (10..15).contains(&v) { 0.9 } else { 0.1 };
        }

        let options = HmmfOptions::default();
        let result = connect_anchors(&neighbors, &fold, &likelihood, &[10, 14], &options).unwrap();

        assert!(result.sweeps <= options.max_count);
        assert!(result.curve.contains(&10));
        assert!(result.curve.contains(&14));
        assert!(result.curve.iter().all(|v| fold.contains(v)));
        assert!(result.curve.len() < fold.len());
        assert_eq!(result.field.len(), fold.len());
    }

    #[test]
    fn test_off_fold_neighbors_count_as_zero() {
        let mesh = grid_mesh(4);
        let neighbors = NeighborList::build(&mesh);
        // Row 2 alone; rows 1 and 3 pull every interior vertex toward 0
        let fold: Vec<usize> = (10..15).collect();
        let likelihood = vec![0.9; 5];

        let result = connect_anchors(&neighbors, &fold, &likelihood, &[10, 14], &HmmfOptions::default()).unwrap();
        assert_eq!(result.field.len(), 5);
        assert_eq!(result.field[0], 1.0);
        assert_eq!(result.field[4], 1.0);
        assert!(result.field[1..4].iter().all(|&h| h < 1.0));
        assert!(result.curve.iter().all(|v| fold.contains(v)));
    }

    #[test]
    fn test_stall_count_resets_after_change() {
        let mut counter = StallCounter::new(1e-3, 10);
        assert_eq!(counter.record(5, 10.0), 0);
        // Stalled: same points, cost barely moved
        assert_eq!(counter.record(5, 10.0), 1);
        // Cost dropped by 0.1 per vertex
        assert_eq!(counter.record(5, 9.0), 0);
        assert_eq!(counter.record(5, 9.0), 1);
        // Point count changed
        assert_eq!(counter.record(4, 9.0), 0);
        assert_eq!(counter.record(4, 9.0), 1);
        assert_eq!(counter.record(4, 9.0), 2);
    }

    #[test]
    fn test_converges_only_after_consecutive_stalls() {
        let neighbors = ring_neighbors(20);
        let fold: Vec<usize> = (0..20).collect();
        let likelihood = vec![0.6; 20];

        let once = HmmfOptions::default().with_n_tries_no_change(1);
        let thrice = HmmfOptions::default().with_n_tries_no_change(3);
        let a = connect_anchors(&neighbors, &fold, &likelihood, &[0, 10], &once).unwrap();
        let b = connect_anchors(&neighbors, &fold, &likelihood, &[0, 10], &thrice).unwrap();
        assert_eq!(a.termination, Termination::Converged);
        assert_eq!(b.termination, Termination::Converged);
        // Three in a row take at least two more sweeps than one
        assert!(b.sweeps >= a.sweeps + 2);
    }

    #[test]
    fn test_builders() {
        let options = HmmfOptions::default().with_min_h(0.05).with_init_offset(1.5);
        assert_eq!(options.min_h, 0.05);
        assert_eq!(options.init_offset, 1.5);
        assert!(options.validate().is_ok());
        assert!(HmmfOptions::default().with_init_offset(0.0).validate().is_err());
        assert!(HmmfOptions::default().with_min_h(-1.0).validate().is_err());
    }

    #[test]
    fn test_fewer_than_two_anchors_does_not_run() {
        let neighbors = ring_neighbors(8);
        let fold: Vec<usize> = (0..8).collect();
        let likelihood = vec![0.9; 8];
        let options = HmmfOptions::default();

        for anchors in [&[][..], &[3][..], &[3, 3][..]] {
            let result = connect_anchors(&neighbors, &fold, &likelihood, anchors, &options).unwrap();
            assert_eq!(result.termination, Termination::NotRun);
            assert!(result.curve.is_empty());
            assert_eq!(result.sweeps, 0);
            assert!(result.field.iter().all(|&h| h == 0.0));
        }
    }

    #[test]
    fn test_rethresholding_is_idempotent() {
        let neighbors = ring_neighbors(20);
        let fold: Vec<usize> = (0..20).collect();
        let likelihood: Vec<f64> = (0..20).map(|i| 0.3 + 0.03 * i as f64).collect();
        let options = HmmfOptions::default();

        let result = connect_anchors(&neighbors, &fold, &likelihood, &[2, 15], &options).unwrap();
        let binary = binarize(&result.field, options.threshold);
        assert_eq!(threshold_curve(&binary, options.threshold), result.curve);
        assert_eq!(binarize(&binary, options.threshold), binary);
    }

    #[test]
    fn test_invalid_input() {
        let neighbors = ring_neighbors(4);
        let fold = [0, 1, 2, 3];
        let options = HmmfOptions::default();

        assert!(matches!(
            connect_anchors(&neighbors, &fold, &[0.5; 3], &[0, 2], &options),
            Err(FundiError::FieldLength { .. })
        ));
        assert!(connect_anchors(&neighbors, &fold, &[0.5; 4], &[0, 9], &options).is_err());
        // Anchors must lie in the fold; fold vertices must be distinct
        assert!(connect_anchors(&neighbors, &[0, 1, 2], &[0.5; 3], &[0, 3], &options).is_err());
        assert!(connect_anchors(&neighbors, &[0, 1, 1], &[0.5; 3], &[0, 1], &options).is_err());

        let bad = HmmfOptions::default().with_max_count(0);
        assert!(connect_anchors(&neighbors, &fold, &[0.5; 4], &[0, 2], &bad).is_err());
        let bad = HmmfOptions::default().with_decrement(0.0);
        assert!(bad.validate().is_err());
        let bad = HmmfOptions::default().with_weights(f64::NAN, 0.4);
        assert!(bad.validate().is_err());
    }
}
