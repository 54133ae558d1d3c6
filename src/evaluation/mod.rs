//! Result tables written at the end of a run
//!
//! - [`ComparisonTable`]: cross-validation means of every model, side by side
//! - [`write_prediction_table`]: held-out actual vs. predicted values
//! - [`write_error_score_table`]: MAPE and R² of the final model
//!
//! Tables are written as CSV with a leading unnamed index column.

mod artifacts;

pub use artifacts::{ensure_writable_dir, verify_artifact, write_csv};

use crate::error::{PredictorError, Result};
use crate::training::ScoreTable;
use ndarray::Array1;
use polars::prelude::*;
use std::path::Path;

pub const MODEL_COMPARISON_FILE: &str = "model_comparison_table.csv";
pub const PREDICTION_COMPARISON_FILE: &str = "prediction_comparison_table.csv";
pub const ERROR_SCORE_FILE: &str = "model_error_score_table.csv";
pub const RESULTS_PLOT_FILE: &str = "results_plot.png";

/// Cross-validation means of several models on their shared metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    metrics: Vec<String>,
    models: Vec<(String, Vec<f64>)>,
}

impl ComparisonTable {
    /// Inner-join `tables` on metric name. Row order follows the first table.
    pub fn inner_join(tables: &[(&str, &ScoreTable)]) -> Result<Self> {
        let (_, first) = tables.first().ok_or_else(|| {
            PredictorError::ValidationError("no score tables to compare".to_string())
        })?;

        let metrics: Vec<String> = first
            .metrics()
            .into_iter()
            .filter(|m| tables.iter().all(|(_, t)| t.get(m).is_some()))
            .map(str::to_string)
            .collect();

        let models = tables
            .iter()
            .map(|(name, table)| {
                let means = metrics
                    .iter()
                    .filter_map(|m| table.get(m).map(|s| s.mean))
                    .collect();
                (name.to_string(), means)
            })
            .collect();

        Ok(Self { metrics, models })
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Mean of `metric` for `model`
    pub fn get(&self, model: &str, metric: &str) -> Option<f64> {
        let row = self.metrics.iter().position(|m| m == metric)?;
        self.models
            .iter()
            .find(|(n, _)| n == model)
            .map(|(_, values)| values[row])
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = vec![Series::new("".into(), self.metrics.clone()).into()];
        for (name, values) in &self.models {
            columns.push(Series::new(name.as_str().into(), values.clone()).into());
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_csv(&mut self.to_dataframe()?, path)
    }
}

/// Per-row `Actual Scores` / `Predicted Scores` with a row index
pub fn write_prediction_table(path: &Path, actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(PredictorError::ShapeError {
            expected: format!("{} predictions", actual.len()),
            actual: format!("{} predictions", predicted.len()),
        });
    }

    let index: Vec<u64> = (0..actual.len() as u64).collect();
    let mut df = DataFrame::new(vec![
        Series::new("".into(), index).into(),
        Series::new("Actual Scores".into(), actual.to_vec()).into(),
        Series::new("Predicted Scores".into(), predicted.to_vec()).into(),
    ])?;
    write_csv(&mut df, path)
}

/// One-row table with columns `MAPE` and `Score`, index `0`
pub fn write_error_score_table(path: &Path, mape: f64, score: f64) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Series::new("".into(), &[0u64]).into(),
        Series::new("MAPE".into(), &[mape]).into(),
        Series::new("Score".into(), &[score]).into(),
    ])?;
    write_csv(&mut df, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ScoreSummary;
    use tempfile::tempdir;

    fn table(rows: &[(&str, f64)]) -> ScoreTable {
        ScoreTable {
            rows: rows
                .iter()
                .map(|(m, v)| ScoreSummary {
                    metric: m.to_string(),
                    mean: *v,
                    std: 0.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_inner_join_keeps_shared_metrics_in_first_order() {
        let dummy = table(&[("fit_time", 0.1), ("test_r2", -0.001), ("only_here", 1.0)]);
        let ridge = table(&[("test_r2", 0.4), ("fit_time", 2.0)]);
        let forest = table(&[("test_r2", 0.5), ("fit_time", 9.0)]);

        let joined = ComparisonTable::inner_join(&[
            ("Dummy_Regressor", &dummy),
            ("Ridge", &ridge),
            ("Random_Forest", &forest),
        ])
        .unwrap();

        assert_eq!(joined.metrics(), &["fit_time".to_string(), "test_r2".to_string()]);
        assert_eq!(joined.get("Ridge", "test_r2"), Some(0.4));
        assert_eq!(joined.model_names(), vec!["Dummy_Regressor", "Ridge", "Random_Forest"]);
    }

    #[test]
    fn test_comparison_csv_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MODEL_COMPARISON_FILE);
        let t = table(&[("test_r2", 0.25)]);
        ComparisonTable::inner_join(&[("A", &t), ("B", &t)])
            .unwrap()
            .write_csv(&path)
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().ends_with(",A,B"));
        assert_eq!(lines.next(), Some("test_r2,0.25,0.25"));
    }

    #[test]
    fn test_error_score_table_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ERROR_SCORE_FILE);
        write_error_score_table(&path, 0.5, 0.25).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].ends_with(",MAPE,Score"));
        assert_eq!(lines[1], "0,0.5,0.25");
    }

    #[test]
    fn test_prediction_table_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PREDICTION_COMPARISON_FILE);
        let actual = Array1::from_vec(vec![6.5, 7.0]);
        let predicted = Array1::from_vec(vec![6.25, 7.5]);
        write_prediction_table(&path, &actual, &predicted).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].ends_with(",Actual Scores,Predicted Scores"));
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("1,7"));
    }
}
