//! Engine tuning configuration
//!
//! Tunables for the spatial index and render batching, loadable from a TOML
//! file so content teams can adjust culling behavior without a rebuild.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spatial::{KdCoefficients, DEFAULT_MIN_VISIBLE_PIXELS, DEFAULT_QUERY_FRACTION, MAX_DEPTH};

/// Tuning knobs for scene management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineTuning {
    /// Maximum depth of each cell's spatial index
    pub kd_depth: usize,

    /// Split-policy weights for index builds
    pub kd_coefficients: KdCoefficients,

    /// Fraction of a cell's total face count a subtree must carry before it
    /// is worth an occlusion query
    pub occlusion_query_fraction: f32,

    /// Visible-pixel count below which a queried region counts as occluded
    pub min_visible_pixels: u32,

    /// Pre-allocated node capacity for each render batch tree
    pub batch_pool_capacity: usize,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            kd_depth: MAX_DEPTH,
            kd_coefficients: KdCoefficients::default(),
            occlusion_query_fraction: DEFAULT_QUERY_FRACTION,
            min_visible_pixels: DEFAULT_MIN_VISIBLE_PIXELS,
            batch_pool_capacity: 4096,
        }
    }
}

impl EngineTuning {
    /// Load tuning from a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save tuning to a TOML file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let tuning = EngineTuning::default();
        assert!(tuning.kd_depth <= MAX_DEPTH);
        assert!(tuning.occlusion_query_fraction > 0.0);
        assert!(tuning.min_visible_pixels >= 1);
    }

    #[test]
    fn test_toml_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "scene_engine_tuning_{}.toml",
            std::process::id()
        ));

        let mut tuning = EngineTuning::default();
        tuning.kd_depth = 6;
        tuning.kd_coefficients.split = 2.5;

        tuning.save_to_file(&path).unwrap();
        let loaded = EngineTuning::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.kd_depth, 6);
        assert_eq!(loaded.kd_coefficients.split, 2.5);
        assert_eq!(loaded.batch_pool_capacity, tuning.batch_pool_capacity);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = EngineTuning::load_from_file("/nonexistent/tuning.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
