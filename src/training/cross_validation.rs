//! K-fold cross-validation

use super::metrics::Scorer;
use super::Estimator;
use crate::data::Dataset;
use crate::error::{PredictorError, Result};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Contiguous, unshuffled K-fold splitter.
///
/// The first `n_samples % n_splits` folds hold one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CvSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(PredictorError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(PredictorError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;
        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices: Vec<usize> = (current..current + fold_size).collect();
            let train_indices: Vec<usize> = (0..current).chain(current + fold_size..n_samples).collect();

            splits.push(CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

/// Per-fold values of every cross-validation key, in insertion order:
/// `fit_time`, `score_time`, then `test_<scorer>` and `train_<scorer>` per scorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvResults {
    columns: Vec<(String, Vec<f64>)>,
}

impl CvResults {
    fn push(&mut self, key: &str, value: f64) {
        match self.columns.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.columns.push((key.to_string(), vec![value])),
        }
    }

    /// Per-fold values for `key`
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Mean of `test_<scorer>` across folds
    pub fn mean_test_score(&self, scorer: &str) -> Option<f64> {
        self.get(&format!("test_{}", scorer)).map(mean)
    }

    /// Mean and sample standard deviation per key, rounded to 3 decimals
    pub fn summarize(&self) -> ScoreTable {
        let rows = self
            .columns
            .iter()
            .map(|(key, values)| ScoreSummary {
                metric: key.clone(),
                mean: round3(mean(values)),
                std: round3(sample_std(values)),
            })
            .collect();
        ScoreTable { rows }
    }
}

/// Aggregated value of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub metric: String,
    pub mean: f64,
    pub std: f64,
}

/// One model's summarized cross-validation scores, ordered by metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub rows: Vec<ScoreSummary>,
}

impl ScoreTable {
    pub fn get(&self, metric: &str) -> Option<&ScoreSummary> {
        self.rows.iter().find(|r| r.metric == metric)
    }

    pub fn metrics(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.metric.as_str()).collect()
    }
}

/// Fit a fresh copy of `estimator` on each training fold and score it on
/// both the held-out fold and the training fold.
pub fn cross_validate(
    estimator: &dyn Estimator,
    data: &Dataset,
    cv: &KFold,
    scorers: &[Scorer],
) -> Result<CvResults> {
    let splits = cv.split(data.n_rows())?;
    let mut results = CvResults::default();

    for split in &splits {
        let train_x = data.features.take(&split.train_indices);
        let train_y: Array1<f64> = data.target.select(Axis(0), &split.train_indices);
        let test_x = data.features.take(&split.test_indices);
        let test_y: Array1<f64> = data.target.select(Axis(0), &split.test_indices);

        let mut model = estimator.clone_unfitted();
        let fit_start = Instant::now();
        model.fit(&train_x, &train_y)?;
        let fit_time = fit_start.elapsed().as_secs_f64();

        let score_start = Instant::now();
        let test_pred = model.predict(&test_x)?;
        let test_scores = scorers
            .iter()
            .map(|s| s.score(&test_y, &test_pred))
            .collect::<Result<Vec<_>>>()?;
        let score_time = score_start.elapsed().as_secs_f64();

        let train_pred = model.predict(&train_x)?;
        let train_scores = scorers
            .iter()
            .map(|s| s.score(&train_y, &train_pred))
            .collect::<Result<Vec<_>>>()?;

        results.push("fit_time", fit_time);
        results.push("score_time", score_time);
        for ((scorer, test), train) in scorers.iter().zip(&test_scores).zip(&train_scores) {
            results.push(&format!("test_{}", scorer.name()), *test);
            results.push(&format!("train_{}", scorer.name()), *train);
        }

        debug!(
            model = estimator.name(),
            fold = split.fold_idx,
            fit_time,
            test_score = test_scores.first().copied().unwrap_or(f64::NAN),
            "Cross-validation fold done"
        );
    }

    Ok(results)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// ddof = 1; NaN for fewer than two values
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Round half to even at 3 decimals
fn round3(v: f64) -> f64 {
    (v * 1000.0).round_ties_even() / 1000.0
}
