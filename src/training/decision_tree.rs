//! Regression tree (MSE criterion)
//!
//! Split search runs over dense columns by sorting the node's values. For a
//! sparse matrix only the node's stored entries are gathered and sorted; the
//! implicit zeros of each column are folded into a single block.

use super::Regressor;
use crate::data::{CsrMatrix, FeatureMatrix};
use crate::error::{PredictorError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node: rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Best split found for one node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Rows of a node sharing one feature value
#[derive(Debug, Clone, Copy)]
struct ValueBlock {
    value: f64,
    count: usize,
    sum: f64,
    sq: f64,
}

impl ValueBlock {
    fn single(value: f64, y: f64) -> Self {
        Self {
            value,
            count: 1,
            sum: y,
            sq: y * y,
        }
    }
}

/// Node-level target totals shared by every feature's scan
#[derive(Debug, Clone, Copy)]
struct NodeStats {
    n: usize,
    sum: f64,
    sq: f64,
    sse: f64,
}

fn better(a: SplitCandidate, b: SplitCandidate) -> SplitCandidate {
    if b.gain > a.gain || (b.gain == a.gain && b.feature_idx < a.feature_idx) {
        b
    } else {
        a
    }
}

/// Regression tree. Every feature is considered at every split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth, unlimited when `None`
    pub max_depth: Option<usize>,
    /// Minimum samples to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
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

    /// Fit on every row of `x`
    pub fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_on_indices(x, y, &indices)
    }

    /// Fit on the listed rows of `x`. Repeated indices count once per
    /// occurrence, which is how bootstrap samples are passed in.
    pub fn fit_on_indices(&mut self, x: &FeatureMatrix, y: &Array1<f64>, indices: &[usize]) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if indices.is_empty() {
            return Err(PredictorError::TrainingError(
                "cannot grow a tree on zero rows".to_string(),
            ));
        }
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(PredictorError::InvalidParameter {
                name: "min_samples_split/min_samples_leaf".to_string(),
                value: format!("{}/{}", self.min_samples_split, self.min_samples_leaf),
                reason: "need split >= 2 and leaf >= 1".to_string(),
            });
        }

        self.n_features = x.ncols();
        self.root = Some(self.build_tree(x, y, indices, 0));
        Ok(self)
    }

    fn build_tree(&self, x: &FeatureMatrix, y: &Array1<f64>, indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let value = sum / n_samples as f64;

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(y, indices);

        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let Some(best) = self.find_best_split(x, y, indices) else {
            return TreeNode::Leaf { value, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x.get(i, best.feature_idx) <= best.threshold);

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Largest reduction in summed squared error over all features.
    /// Ties go to the lowest feature index.
    fn find_best_split(&self, x: &FeatureMatrix, y: &Array1<f64>, indices: &[usize]) -> Option<SplitCandidate> {
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let n = indices.len();
        let stats = NodeStats {
            n,
            sum,
            sq,
            sse: sq - sum * sum / n as f64,
        };

        match x {
            FeatureMatrix::Dense(x) => (0..x.ncols())
                .into_par_iter()
                .filter_map(|feature_idx| self.best_dense_split(x, y, indices, feature_idx, stats))
                .reduce_with(better),
            FeatureMatrix::Sparse(x) => self.best_sparse_split(x, y, indices, stats),
        }
    }

    fn best_dense_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        stats: NodeStats,
    ) -> Option<SplitCandidate> {
        let column = x.column(feature_idx);

        // constant features cannot split; skip the sort
        let first = column[indices[0]];
        if indices.iter().all(|&i| column[i] == first) {
            return None;
        }

        let mut blocks: Vec<ValueBlock> = indices.iter().map(|&i| ValueBlock::single(column[i], y[i])).collect();
        blocks.sort_unstable_by(|a, b| a.value.total_cmp(&b.value));
        self.scan_blocks(feature_idx, &blocks, stats)
    }

    /// Gather the stored entries of the node's rows, sort them by feature and
    /// value, and scan each feature that has at least one stored entry.
    /// Features with none are all zero on this node.
    fn best_sparse_split(
        &self,
        x: &CsrMatrix,
        y: &Array1<f64>,
        indices: &[usize],
        stats: NodeStats,
    ) -> Option<SplitCandidate> {
        let mut entries: Vec<(usize, f64, f64)> = Vec::new();
        for &i in indices {
            entries.extend(x.row(i).map(|(c, v)| (c, v, y[i])));
        }
        entries.par_sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut columns: Vec<&[(usize, f64, f64)]> = Vec::new();
        let mut start = 0;
        for k in 1..=entries.len() {
            if k == entries.len() || entries[k].0 != entries[start].0 {
                columns.push(&entries[start..k]);
                start = k;
            }
        }

        columns
            .into_par_iter()
            .filter_map(|column| self.best_sparse_column_split(column, stats))
            .reduce_with(better)
    }

    /// `column` holds one feature's stored entries, sorted by value
    fn best_sparse_column_split(&self, column: &[(usize, f64, f64)], stats: NodeStats) -> Option<SplitCandidate> {
        let feature_idx = column[0].0;
        let stored_sum: f64 = column.iter().map(|e| e.2).sum();
        let stored_sq: f64 = column.iter().map(|e| e.2 * e.2).sum();
        let zeros = ValueBlock {
            value: 0.0,
            count: stats.n - column.len(),
            sum: stats.sum - stored_sum,
            sq: stats.sq - stored_sq,
        };

        let n_negative = column.partition_point(|e| e.1 < 0.0);
        let mut blocks: Vec<ValueBlock> = Vec::with_capacity(column.len() + 1);
        blocks.extend(column[..n_negative].iter().map(|e| ValueBlock::single(e.1, e.2)));
        if zeros.count > 0 {
            blocks.push(zeros);
        }
        blocks.extend(column[n_negative..].iter().map(|e| ValueBlock::single(e.1, e.2)));

        self.scan_blocks(feature_idx, &blocks, stats)
    }

    /// Evaluate every boundary between distinct values of blocks sorted by value
    fn scan_blocks(&self, feature_idx: usize, blocks: &[ValueBlock], stats: NodeStats) -> Option<SplitCandidate> {
        let min_leaf = self.min_samples_leaf;
        let mut n_left = 0;
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for pair in blocks.windows(2) {
            let (block, next) = (pair[0], pair[1].value);
            n_left += block.count;
            left_sum += block.sum;
            left_sq += block.sq;

            if block.value == next {
                continue;
            }

            let n_right = stats.n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = stats.sum - left_sum;
            let right_sq = stats.sq - left_sq;
            let child_sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = stats.sse - child_sse;

            if best.map_or(true, |b| gain > b.gain) {
                let mut threshold = (block.value + next) / 2.0;
                if threshold >= next {
                    threshold = block.value;
                }
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold,
                    gain,
                });
            }
        }

        best
    }

    /// Make predictions
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PredictorError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(PredictorError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok((0..x.nrows()).map(|i| predict_sample(root, |f| x.get(i, f))).collect())
    }

    /// Get tree depth (a lone leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, count_leaves)
    }
}

impl Regressor for DecisionTree {
    fn name(&self) -> &'static str {
        "decision_tree"
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y)?;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }
}

fn is_pure(y: &Array1<f64>, indices: &[usize]) -> bool {
    let first = y[indices[0]];
    indices.iter().all(|&i| (y[i] - first).abs() < 1e-10)
}

/// Walk from `root` to a leaf, reading feature values through `value_of`
fn predict_sample<F: Fn(usize) -> f64>(root: &TreeNode, value_of: F) -> f64 {
    let mut node = root;
    loop {
        match node {
            TreeNode::Leaf { value, .. } => return *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                node = if value_of(*feature_idx) <= *threshold { &**left } else { &**right };
            }
        }
    }
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 0,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}
