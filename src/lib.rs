//! Rating Predictor - board game rating regression
//!
//! This crate trains and compares regression models that predict a game's
//! average rating from its metadata:
//! - Typed loading of the game CSVs, including string-encoded label lists
//! - A column plan of scaling, word counts and multi-label indicators
//! - Baseline, Ridge and Random Forest models with randomized search
//! - K-fold cross-validation and a comparison table
//! - Held-out evaluation with an actual-vs-predicted chart
//!
//! # Modules
//!
//! - [`data`] - CSV loading, list-literal decoding, feature frames
//! - [`preprocessing`] - Scaler, count vectorizer, multi-label binarizer, column plan
//! - [`training`] - Estimators, pipeline, cross-validation, metrics
//! - [`optimizer`] - Randomized hyperparameter search
//! - [`evaluation`] - Result tables and artifact checks
//! - [`plot`] - SVG and PNG charts with loess smoothing
//! - [`experiment`] - The end-to-end run
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Data and models
pub mod data;
pub mod preprocessing;
pub mod training;
pub mod optimizer;

// Outputs
pub mod evaluation;
pub mod plot;

// Orchestration
pub mod experiment;
pub mod cli;

pub use error::{PredictorError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PredictorError, Result};

    // Configuration
    pub use crate::config::{FeatureSchema, ForestSearchConfig, PlotConfig, RidgeSearchConfig, RunConfig};

    // Data
    pub use crate::data::{load_dataset, ColumnData, Dataset, FeatureFrame, FeatureMatrix};

    // Preprocessing
    pub use crate::preprocessing::{ColumnPlan, ColumnTransform, MultiLabelBinarizer, TransformKind};

    // Training
    pub use crate::training::{
        cross_validate, DummyRegressor, Estimator, KFold, Pipeline, RandomForest, Regressor,
        RidgeRegression, Scorer,
    };

    // Optimization
    pub use crate::optimizer::{RandomizedSearch, SearchSpace, Study};

    // Outputs
    pub use crate::evaluation::ComparisonTable;
    pub use crate::plot::{results_chart, save_chart, Chart};

    // Orchestration
    pub use crate::experiment::{run, Experiment, RunPaths, RunSummary};
}
