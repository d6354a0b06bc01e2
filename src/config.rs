//! Analysis parameters and optional TOML configuration file

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Thresholds for the market basket pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningParams {
    /// Minimum fraction of baskets an itemset must appear in, in (0, 1]
    pub min_support: f64,
    /// Minimum rule confidence, in [0, 1]
    pub min_confidence: f64,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_confidence: 0.3,
        }
    }
}

impl MiningParams {
    pub fn validate(&self) -> Result<()> {
        validate_min_support(self.min_support)?;
        validate_min_confidence(self.min_confidence)
    }
}

pub(crate) fn validate_min_support(min_support: f64) -> Result<()> {
    if min_support.is_finite() && min_support > 0.0 && min_support <= 1.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidMinSupport(min_support))
    }
}

pub(crate) fn validate_min_confidence(min_confidence: f64) -> Result<()> {
    if (0.0..=1.0).contains(&min_confidence) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidMinConfidence(min_confidence))
    }
}

/// Parameters for the customer segmentation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Number of clusters for K-Means
    pub clusters: usize,
    /// Seed for centroid initialisation
    pub seed: u64,
    /// Number of seeded restarts; the lowest-inertia run is kept
    pub n_init: usize,
    /// Maximum iterations per run
    pub max_iters: u64,
    /// Convergence tolerance
    pub tolerance: f64,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            clusters: 3,
            seed: 42,
            n_init: 10,
            max_iters: 300,
            tolerance: 1e-4,
        }
    }
}

impl SegmentationParams {
    /// Checks everything that does not depend on the data.
    /// The customer-count bound is checked by the segmentation engine.
    pub fn validate(&self) -> Result<()> {
        if self.clusters < 2 {
            return Err(AnalysisError::TooFewClusters(self.clusters));
        }
        if self.n_init == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "n_init",
                reason: "at least one run is required".to_string(),
            });
        }
        if self.max_iters == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "max_iters",
                reason: "at least one iteration is required".to_string(),
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "tolerance",
                reason: format!("must be a positive number, got {}", self.tolerance),
            });
        }
        Ok(())
    }
}

/// Full configuration, loadable from a TOML file
///
/// ```toml
/// [mining]
/// min_support = 0.02
///
/// [segmentation]
/// clusters = 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub mining: MiningParams,
    pub segmentation: SegmentationParams,
}

impl AnalysisConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.mining.validate().is_ok());
        assert!(config.segmentation.validate().is_ok());
        assert_eq!(config.segmentation.clusters, 3);
        assert_eq!(config.segmentation.seed, 42);
    }

    #[test]
    fn test_partial_toml() {
        let config = AnalysisConfig::from_toml_str(
            "[mining]\nmin_support = 0.05\n\n[segmentation]\nclusters = 4\n",
        )
        .unwrap();
        assert_eq!(config.mining.min_support, 0.05);
        assert_eq!(config.mining.min_confidence, 0.3);
        assert_eq!(config.segmentation.clusters, 4);
        assert_eq!(config.segmentation.n_init, 10);
    }

    #[test]
    fn test_invalid_mining_params() {
        for min_support in [0.0, -0.1, 1.5, f64::NAN] {
            let params = MiningParams { min_support, ..Default::default() };
            assert!(matches!(params.validate(), Err(AnalysisError::InvalidMinSupport(_))));
        }
        let params = MiningParams { min_confidence: 1.01, ..Default::default() };
        assert!(matches!(params.validate(), Err(AnalysisError::InvalidMinConfidence(_))));

        let params = MiningParams { min_support: 1.0, min_confidence: 0.0 };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_segmentation_params() {
        let params = SegmentationParams { clusters: 1, ..Default::default() };
        assert!(matches!(params.validate(), Err(AnalysisError::TooFewClusters(1))));

        let params = SegmentationParams { n_init: 0, ..Default::default() };
        assert!(params.validate().unwrap_err().is_validation());
    }
}
