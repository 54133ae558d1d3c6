//! Model training module
//!
//! Provides the estimators compared in a run:
//! - Mean-of-target baseline
//! - Ridge regression
//! - Regression trees and Random Forests
//!
//! plus the [`Pipeline`] that puts a column plan in front of a matrix
//! regressor, K-fold cross-validation and the regression metrics.

pub mod cross_validation;
pub mod decision_tree;
pub mod dummy;
pub mod linear_models;
pub mod metrics;
pub mod pipeline;
pub mod random_forest;

pub use cross_validation::{cross_validate, CvResults, CvSplit, KFold, ScoreSummary, ScoreTable};
pub use decision_tree::{DecisionTree, TreeNode};
pub use dummy::DummyRegressor;
pub use linear_models::RidgeRegression;
pub use metrics::{
    default_scorers, mean_absolute_percentage_error, mean_squared_error, r2_score,
    root_mean_squared_error, Scorer,
};
pub use pipeline::Pipeline;
pub use random_forest::RandomForest;

use crate::data::{FeatureFrame, FeatureMatrix};
use crate::error::Result;
use ndarray::Array1;

/// Regressor over a dense or sparse feature matrix
pub trait Regressor: Send + Sync {
    /// Short model name for logs
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>>;

    /// R² of the predictions on `x`
    fn score(&self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<f64> {
        r2_score(y, &self.predict(x)?)
    }
}

/// Model over a raw feature frame; what cross-validation and search operate on
pub trait Estimator: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(&mut self, frame: &FeatureFrame, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, frame: &FeatureFrame) -> Result<Array1<f64>>;

    /// R² of the predictions on `frame`
    fn score(&self, frame: &FeatureFrame, y: &Array1<f64>) -> Result<f64> {
        r2_score(y, &self.predict(frame)?)
    }

    /// Same configuration, no fitted state
    fn clone_unfitted(&self) -> Box<dyn Estimator>;
}
