//! Run configuration
//!
//! Every knob of a run lives here and is passed down explicitly. All fields
//! have defaults, so a JSON config file only needs to name what it changes.

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column layout of the training and testing CSVs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSchema {
    /// Columns standard-scaled as numeric features
    pub numeric_columns: Vec<String>,
    /// Free-text column fed to the count vectorizer
    pub text_column: String,
    /// Columns holding string-encoded label lists
    pub label_columns: Vec<String>,
    /// Regression target
    pub target_column: String,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            numeric_columns: [
                "yearpublished",
                "minplayers",
                "maxplayers",
                "playingtime",
                "minplaytime",
                "maxplaytime",
                "minage",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            text_column: "description".to_string(),
            label_columns: [
                "boardgamecategory",
                "boardgamemechanic",
                "boardgamefamily",
                "boardgamedesigner",
                "boardgameartist",
                "boardgamepublisher",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            target_column: "average".to_string(),
        }
    }
}

/// Random search settings for the Ridge family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgeSearchConfig {
    /// Candidate regularization strengths
    pub alphas: Vec<f64>,
    /// Search iterations (capped at the grid size)
    pub n_iter: usize,
}

impl Default for RidgeSearchConfig {
    fn default() -> Self {
        Self {
            alphas: (-6..6).step_by(2).map(|e| 10f64.powi(e)).collect(),
            n_iter: 12,
        }
    }
}

/// Half-open integer range `[start, stop)` walked in `step` increments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntRange {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl IntRange {
    pub fn values(&self) -> Vec<i64> {
        if self.step <= 0 {
            return Vec::new();
        }
        (self.start..self.stop).step_by(self.step as usize).collect()
    }
}

/// Random search settings for the Random Forest family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestSearchConfig {
    /// Trees per forest
    pub n_estimators: usize,
    pub max_depth: IntRange,
    pub bootstrap: Vec<bool>,
    pub min_samples_leaf: Vec<i64>,
    pub min_samples_split: Vec<i64>,
    /// Search iterations
    pub n_iter: usize,
    /// Search and cross-validation only see this many leading training rows
    pub subset_rows: usize,
}

impl Default for ForestSearchConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: IntRange { start: 20, stop: 100, step: 2 },
            bootstrap: vec![true, false],
            min_samples_leaf: vec![1, 2, 4],
            min_samples_split: vec![2, 5, 10],
            n_iter: 10,
            subset_rows: 2000,
        }
    }
}

/// Text vectorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Vocabulary size limit (top terms by corpus frequency)
    pub max_features: Option<usize>,
    /// Drop English stop words
    pub english_stop_words: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: Some(1000),
            english_stop_words: true,
        }
    }
}

/// Diagnostic chart settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Axis domain shared by x and y
    pub domain: (f64, f64),
    /// Plot area width in pixels
    pub width: u32,
    /// Plot area height in pixels
    pub height: u32,
    /// Raster resolution multiplier
    pub scale_factor: f64,
    /// Loess neighbourhood as a fraction of the points
    pub loess_bandwidth: f64,
    pub point_color: String,
    pub reference_color: String,
    pub loess_color: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            domain: (2.0, 10.0),
            width: 1000,
            height: 1000,
            scale_factor: 1.0,
            loess_bandwidth: 1.0,
            point_color: "#f75402".to_string(),
            reference_color: "#1049ad".to_string(),
            loess_color: "#f75402".to_string(),
        }
    }
}

/// Configuration for a complete training and evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub schema: FeatureSchema,
    /// Seed for candidate sampling and bootstrap draws
    pub seed: u64,
    /// Worker threads for tree building; rayon default when unset
    pub n_jobs: Option<usize>,
    /// Folds used by both search and cross-validation
    pub cv_folds: usize,
    pub ridge: RidgeSearchConfig,
    pub forest: ForestSearchConfig,
    pub vectorizer: VectorizerConfig,
    pub plot: PlotConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            schema: FeatureSchema::default(),
            seed: 42,
            n_jobs: None,
            cv_folds: 5,
            ridge: RidgeSearchConfig::default(),
            forest: ForestSearchConfig::default(),
            vectorizer: VectorizerConfig::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl RunConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the worker count
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Builder method to set the fold count
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set the forest subset size
    pub fn with_forest_subset_rows(mut self, rows: usize) -> Self {
        self.forest.subset_rows = rows;
        self
    }

    /// Builder method to set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.forest.n_estimators = n;
        self
    }

    /// Reject configurations that cannot produce a run
    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(invalid("cv_folds", self.cv_folds, "must be at least 2"));
        }
        if self.n_jobs == Some(0) {
            return Err(invalid("n_jobs", 0, "must be positive"));
        }
        if self.ridge.alphas.is_empty() || self.ridge.alphas.iter().any(|a| *a < 0.0) {
            return Err(PredictorError::ConfigError(
                "ridge.alphas must be a non-empty list of non-negative values".to_string(),
            ));
        }
        if self.forest.n_estimators == 0 {
            return Err(invalid("forest.n_estimators", 0, "must be positive"));
        }
        if self.forest.max_depth.values().is_empty()
            || self.forest.bootstrap.is_empty()
            || self.forest.min_samples_leaf.is_empty()
            || self.forest.min_samples_split.is_empty()
        {
            return Err(PredictorError::ConfigError(
                "forest search space has an empty dimension".to_string(),
            ));
        }
        if self.forest.min_samples_leaf.iter().any(|v| *v < 1) {
            return Err(PredictorError::ConfigError(
                "forest.min_samples_leaf values must be >= 1".to_string(),
            ));
        }
        if self.forest.min_samples_split.iter().any(|v| *v < 2) {
            return Err(PredictorError::ConfigError(
                "forest.min_samples_split values must be >= 2".to_string(),
            ));
        }
        if self.plot.domain.0 >= self.plot.domain.1 {
            return Err(PredictorError::ConfigError(format!(
                "plot.domain lower bound {} must be below upper bound {}",
                self.plot.domain.0, self.plot.domain.1
            )));
        }
        if self.plot.scale_factor <= 0.0 || self.plot.loess_bandwidth <= 0.0 {
            return Err(PredictorError::ConfigError(
                "plot.scale_factor and plot.loess_bandwidth must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> PredictorError {
    PredictorError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.ridge.n_iter, 12);
        assert_eq!(config.ridge.alphas.len(), 6);
        assert!((config.ridge.alphas[0] - 1e-6).abs() < 1e-18);
        assert!((config.ridge.alphas[5] - 1e4).abs() < 1e-9);
        assert_eq!(config.forest.subset_rows, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_depth_grid() {
        let depths = ForestSearchConfig::default().max_depth.values();
        assert_eq!(depths.first(), Some(&20));
        assert_eq!(depths.last(), Some(&98));
        assert_eq!(depths.len(), 40);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"seed": 7, "forest": {"n_iter": 3}}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.forest.n_iter, 3);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.schema.target_column, "average");
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new().with_seed(1).with_n_jobs(2).with_cv_folds(3);
        assert_eq!(config.seed, 1);
        assert_eq!(config.n_jobs, Some(2));
        assert_eq!(config.cv_folds, 3);
    }

    #[test]
    fn test_validate_rejects_single_fold() {
        let config = RunConfig::new().with_cv_folds(1);
        assert!(matches!(config.validate(), Err(PredictorError::InvalidParameter { .. })));
    }
}
