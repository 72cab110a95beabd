//! Fundus likelihood from depth and curvature.
//!
//! Each fold is scored on its own. Depth and curvature are each mapped through
//! a logistic curve whose center and gain come from the fold's own value
//! distribution, and the likelihood is the product of the two. A vertex must
//! be both relatively deep and relatively curved to score high.
//!
//! # Models
//!
//! - [`LikelihoodModel::Deviation`]: depth normalized by its fold maximum,
//!   centered at the mean normalized depth; curvature centered at 0. Gains are
//!   the reciprocal standard deviations (curvature deviation halved, since
//!   curvature is taken to live on `[-1, 1]`).
//! - [`LikelihoodModel::Percentile`]: both terms centered at the value found
//!   at `fraction_below` of the fold's sorted values, with gain
//!   `slope_factor / |center|`.
//!
//! Zero spread never divides by zero: the affected term gets gain 0 and a
//! flat output of 0.5.

use serde::{Deserialize, Serialize};

use super::stats::{mean, percentile, safe_recip, sigmoid, sorted_finite, std_dev};
use crate::error::{FundiError, Result};

/// Spreads at or below this are treated as zero.
const MIN_DEVIATION: f64 = 1e-12;

/// `ln(0.9 / 0.1)`: a gain that maps one scale unit above center to 0.9.
pub const DEFAULT_SLOPE_FACTOR: f64 = 2.197_224_577_336_219_6;

/// Sigmoid parameterization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LikelihoodModel {
    /// Mean / standard deviation based mapping.
    #[default]
    Deviation,
    /// Percentile based mapping.
    Percentile {
        /// Fraction of fold values lying below the sigmoid center.
        fraction_below: f64,
        /// Gain numerator.
        slope_factor: f64,
    },
}

/// Options for likelihood scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodOptions {
    /// Sigmoid parameterization.
    pub model: LikelihoodModel,
}

impl LikelihoodOptions {
    /// Use the percentile model.
    pub fn percentile(fraction_below: f64, slope_factor: f64) -> Self {
        Self {
            model: LikelihoodModel::Percentile {
                fraction_below,
                slope_factor,
            },
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if let LikelihoodModel::Percentile {
            fraction_below,
            slope_factor,
        } = self.model
        {
            if !(0.0..=1.0).contains(&fraction_below) {
                return Err(FundiError::invalid_param(
                    "fraction_below",
                    fraction_below,
                    "must be in [0, 1]",
                ));
            }
            if !(slope_factor.is_finite() && slope_factor >= 0.0) {
                return Err(FundiError::invalid_param(
                    "slope_factor",
                    slope_factor,
                    "must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }
}

/// Likelihood values for one fold, aligned with the input slices.
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodScore {
    /// Per-vertex likelihood in `[0, 1]`.
    pub values: Vec<f64>,
    /// Gain applied to the depth term.
    pub depth_gain: f64,
    /// Gain applied to the curvature term.
    pub curvature_gain: f64,
    /// Depth had no spread within the fold.
    pub constant_depth: bool,
    /// Curvature had no spread within the fold.
    pub constant_curvature: bool,
}

impl LikelihoodScore {
    /// Both inputs were constant, so every vertex scored the same.
    pub fn is_flat(&self) -> bool {
        self.constant_depth && self.constant_curvature
    }
}

/// Score every vertex of one fold.
///
/// `depths[k]` and `curvatures[k]` belong to the same vertex. Non-finite
/// inputs score 0.
///
/// # Errors
///
/// [`FundiError::FieldLength`] if the slices differ in length, or
/// [`FundiError::InvalidParameter`] for invalid options.
///
/// # Example
///
/// ```
/// use fundi::algo::likelihood::{score, LikelihoodOptions};
///
/// let depths = [0.2, 0.5, 1.0, 0.9];
/// let curvatures = [-0.3, 0.0, 0.4, 0.1];
/// let result = score(&depths, &curvatures, &LikelihoodOptions::default()).unwrap();
///
/// assert!(result.values.iter().all(|&l| (0.0..=1.0).contains(&l)));
/// // Deepest and most curved vertex scores highest
/// let best = result.values.iter().cloned().fold(f64::MIN, f64::max);
/// assert_eq!(best, result.values[2]);
/// ```
pub fn score(depths: &[f64], curvatures: &[f64], options: &LikelihoodOptions) -> Result<LikelihoodScore> {
    options.validate()?;
    if depths.len() != curvatures.len() {
        return Err(FundiError::field_length("curvature", depths.len(), curvatures.len()));
    }

    let result = match options.model {
        LikelihoodModel::Deviation => score_deviation(depths, curvatures),
        LikelihoodModel::Percentile {
            fraction_below,
            slope_factor,
        } => score_percentile(depths, curvatures, fraction_below, slope_factor),
    };
    Ok(result)
}

fn score_deviation(depths: &[f64], curvatures: &[f64]) -> LikelihoodScore {
    let max_depth = depths
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let scale = if max_depth > 0.0 { max_depth } else { 1.0 };
    let normalized: Vec<f64> = depths.iter().map(|d| d / scale).collect();

    let finite_depths: Vec<f64> = normalized.iter().copied().filter(|d| d.is_finite()).collect();
    let finite_curves: Vec<f64> = curvatures.iter().copied().filter(|c| c.is_finite()).collect();

    let depth_avg = mean(&finite_depths);
    let depth_std = std_dev(&finite_depths);
    let curve_std = std_dev(&finite_curves) / 2.0;

    let constant_depth = depth_std <= MIN_DEVIATION;
    let constant_curvature = curve_std <= MIN_DEVIATION;
    let depth_gain = if constant_depth { 0.0 } else { safe_recip(1.0, depth_std) };
    let curvature_gain = if constant_curvature { 0.0 } else { safe_recip(1.0, curve_std) };

    let values = normalized
        .iter()
        .zip(curvatures)
        .map(|(&d, &c)| {
            combine(
                sigmoid(d, depth_gain, depth_avg),
                sigmoid(c, curvature_gain, 0.0),
            )
        })
        .collect();

    LikelihoodScore {
        values,
        depth_gain,
        curvature_gain,
        constant_depth,
        constant_curvature,
    }
}

fn score_percentile(
    depths: &[f64],
    curvatures: &[f64],
    fraction_below: f64,
    slope_factor: f64,
) -> LikelihoodScore {
    let sorted_depths = sorted_finite(depths.iter().copied());
    let sorted_curves = sorted_finite(curvatures.iter().copied());
    let p_depth = percentile(&sorted_depths, fraction_below).unwrap_or(0.0);
    let p_curve = percentile(&sorted_curves, fraction_below).unwrap_or(0.0);

    let spread = |sorted: &[f64]| match (sorted.first(), sorted.last()) {
        (Some(lo), Some(hi)) => hi - lo,
        _ => 0.0,
    };
    let constant_depth = spread(&sorted_depths) <= MIN_DEVIATION;
    let constant_curvature = spread(&sorted_curves) <= MIN_DEVIATION;

    // Absolute center keeps the mapping increasing for negative centers
    let depth_gain = safe_recip(slope_factor, p_depth.abs());
    let curvature_gain = safe_recip(slope_factor, p_curve.abs());

    let values = depths
        .iter()
        .zip(curvatures)
        .map(|(&d, &c)| {
            combine(
                sigmoid(d, depth_gain, p_depth),
                sigmoid(c, curvature_gain, p_curve),
            )
        })
        .collect();

    LikelihoodScore {
        values,
        depth_gain,
        curvature_gain,
        constant_depth,
        constant_curvature,
    }
}

#[inline]
fn combine(depth_term: f64, curvature_term: f64) -> f64 {
    let l = depth_term * curvature_term;
    if l.is_nan() {
        0.0
    } else {
        l.clamp(0.0, 1.0)
    }
}
