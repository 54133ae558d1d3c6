//! Hyperparameter search
//!
//! Randomized search over a discrete grid: candidates are distinct grid
//! points drawn with a seeded RNG, each scored by K-fold cross-validation.

mod random_search;
mod search_space;
mod study;

pub use random_search::RandomizedSearch;
pub use search_space::{format_params, Parameter, ParameterValue, SearchSpace, TrialParams, TrialParamsExt};
pub use study::{Study, TrialResult};
