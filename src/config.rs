//! JSON parameter files.
//!
//! A config file holds a [`FundusOptions`]. Every section and field is
//! optional; anything left out keeps its default.
//!
//! ```json
//! {
//!   "folds": { "depth_threshold": { "absolute": 0.2 }, "min_fold_size": 30 },
//!   "likelihood": { "model": { "kind": "percentile", "fraction_below": 0.5, "slope_factor": 2.2 } },
//!   "anchors": { "min_distance": 5.0, "metric": "geodesic" },
//!   "hmmf": { "max_count": 200 },
//!   "parallel": false
//! }
//! ```

use std::fs;
use std::path::Path;

use crate::algo::fundi::FundusOptions;
use crate::error::{FundiError, Result};

/// Parse and validate options from a JSON string.
pub fn parse_config(text: &str) -> Result<FundusOptions> {
    let options: FundusOptions = serde_json::from_str(text).map_err(|e| FundiError::Config {
        path: "<string>".into(),
        message: e.to_string(),
    })?;
    options.validate()?;
    Ok(options)
}

/// Load and validate options from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FundusOptions> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let options: FundusOptions = serde_json::from_str(&text).map_err(|e| FundiError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    options.validate()?;
    log::debug!("loaded configuration from {}", path.display());
    Ok(options)
}

/// Write options as pretty-printed JSON.
pub fn save_config<P: AsRef<Path>>(path: P, options: &FundusOptions) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(options).map_err(|e| FundiError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::anchors::DistanceMetric;
    use crate::algo::folds::{DepthThreshold, HoleFill};
    use crate::algo::likelihood::LikelihoodModel;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(parse_config("{}").unwrap(), FundusOptions::default());
    }

    #[test]
    fn test_partial_override() {
        let text = r#"{
            "folds": { "depth_threshold": { "absolute": 0.2 }, "hole_fill": "first_contact" },
            "likelihood": { "model": { "kind": "percentile", "fraction_below": 0.4, "slope_factor": 2.0 } },
            "anchors": { "metric": "euclidean", "max_anchors": 10 },
            "hmmf": { "max_count": 250 },
            "parallel": false
        }"#;
        let options = parse_config(text).unwrap();

        assert_eq!(options.folds.depth_threshold, DepthThreshold::Absolute(0.2));
        assert_eq!(options.folds.hole_fill, HoleFill::FirstContact);
        assert_eq!(options.folds.min_fold_size, 50);
        assert_eq!(
            options.likelihood.model,
            LikelihoodModel::Percentile {
                fraction_below: 0.4,
                slope_factor: 2.0
            }
        );
        assert_eq!(options.anchors.metric, DistanceMetric::Euclidean);
        assert_eq!(options.anchors.max_anchors, Some(10));
        assert_eq!(options.anchors.min_distance, 5.0);
        assert_eq!(options.hmmf.max_count, 250);
        assert_eq!(options.hmmf.w_likelihood, 1.1);
        assert!(!options.parallel);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            parse_config(r#"{ "hmmf": { "max_count": 0 } }"#),
            Err(FundiError::InvalidParameter { name: "max_count", .. })
        ));
        assert!(matches!(
            parse_config(r#"{ "anchors": { "min_distance": "far" } }"#),
            Err(FundiError::Config { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("fundi_config_{}.json", std::process::id()));
        let options = FundusOptions::default().sequential();
        save_config(&path, &options).unwrap();
        let loaded = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, options);
    }
}
