//! Random Forest regressor

use super::decision_tree::DecisionTree;
use super::Regressor;
use crate::data::FeatureMatrix;
use crate::error::{PredictorError, Result};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Average of regression trees grown on bootstrap samples (or the full sample)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random state
    pub random_state: Option<u64>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Fit the forest; trees are grown in parallel
    pub fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PredictorError::TrainingError(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(PredictorError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let start = Instant::now();
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit_on_indices(x, y, &sample_indices)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = x.ncols();

        debug!(
            n_estimators = self.n_estimators,
            n_samples,
            n_features = self.n_features,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted random forest"
        );
        Ok(self)
    }

    /// Mean of the tree predictions
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PredictorError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut total = Array1::zeros(x.nrows());
        for p in &all_predictions {
            total += p;
        }
        Ok(total / all_predictions.len() as f64)
    }
}

impl Regressor for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y)?;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CsrMatrix;
    use ndarray::{array, Array2};

    fn sample_data() -> (FeatureMatrix, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = x.column(0).mapv(|v| if v < 20.0 { 2.0 } else { 8.0 });
        (x.into(), y)
    }

    #[test]
    fn test_forest_learns_step() {
        let (x, y) = sample_data();
        let mut forest = RandomForest::new(10).with_random_state(7);
        forest.fit(&x, &y).unwrap();

        let p = forest.predict(&array![[2.0, 0.0], [35.0, 1.0]].into()).unwrap();
        assert!(p[0] < 4.0);
        assert!(p[1] > 6.0);
        assert_eq!(forest.trees().len(), 10);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = sample_data();
        let mut a = RandomForest::new(5).with_random_state(3);
        let mut b = RandomForest::new(5).with_random_state(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_without_bootstrap_trees_agree() {
        let (x, y) = sample_data();
        let mut forest = RandomForest::new(3).with_bootstrap(false).with_max_depth(3);
        forest.fit(&x, &y).unwrap();

        let first = forest.trees()[0].predict(&x).unwrap();
        for tree in forest.trees() {
            assert_eq!(tree.predict(&x).unwrap(), first);
        }
    }

    #[test]
    fn test_not_fitted() {
        let forest = RandomForest::new(2);
        assert!(matches!(forest.predict(&array![[1.0]].into()), Err(PredictorError::ModelNotFitted)));
    }

    #[test]
    fn test_forest_on_sparse_indicators() {
        // 300 rows, one of 150 "publishers" each; the rating follows publisher parity
        let rows: Vec<Vec<(usize, f64)>> = (0..300).map(|i| vec![(i % 150, 1.0)]).collect();
        let x = FeatureMatrix::Sparse(CsrMatrix::from_rows(150, rows).unwrap());
        let y: Array1<f64> = (0..300).map(|i| if (i % 150) % 2 == 0 { 3.0 } else { 7.0 }).collect();

        let mut forest = RandomForest::new(5).with_bootstrap(false).with_random_state(1);
        forest.fit(&x, &y).unwrap();
        let p = forest.predict(&x).unwrap();
        for (pi, yi) in p.iter().zip(y.iter()) {
            assert!((pi - yi).abs() < 1e-9);
        }
    }
}
