//! Standard (z-score) scaling of numeric columns

use super::ColumnTransform;
use crate::data::{ColumnData, FeatureMatrix};
use crate::error::{PredictorError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean
    scale: f64,  // population std, 1 for constant columns
}

/// Feature scaler: `(x - mean) / std`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    /// Create a new scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit one parameter pair per column
    pub fn fit(&mut self, columns: &[&[f64]]) -> Result<&mut Self> {
        self.params = columns.iter().map(|values| Self::compute_params(values)).collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale columns into a row-major matrix
    pub fn transform(&self, columns: &[&[f64]]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        if columns.len() != self.params.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", columns.len()),
            });
        }

        let n_rows = columns.first().map_or(0, |c| c.len());
        Ok(Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| {
            let p = &self.params[c];
            (columns[c][r] - p.center) / p.scale
        }))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, columns: &[&[f64]]) -> Result<Array2<f64>> {
        self.fit(columns)?;
        self.transform(columns)
    }

    /// Fitted means
    pub fn means(&self) -> Array1<f64> {
        self.params.iter().map(|p| p.center).collect()
    }

    fn compute_params(values: &[f64]) -> ScalerParams {
        if values.is_empty() {
            return ScalerParams { center: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        ScalerParams {
            center: mean,
            scale: if std == 0.0 { 1.0 } else { std },
        }
    }
}

impl ColumnTransform for StandardScaler {
    fn fit(&mut self, columns: &[&ColumnData], _target: Option<&Array1<f64>>) -> Result<()> {
        let slices = numeric_slices(columns)?;
        StandardScaler::fit(self, &slices)?;
        Ok(())
    }

    fn transform(&self, columns: &[&ColumnData]) -> Result<FeatureMatrix> {
        let slices = numeric_slices(columns)?;
        Ok(StandardScaler::transform(self, &slices)?.into())
    }

    fn n_features_out(&self) -> usize {
        self.params.len()
    }
}

fn numeric_slices<'a>(columns: &[&'a ColumnData]) -> Result<Vec<&'a [f64]>> {
    columns
        .iter()
        .map(|c| {
            c.as_numeric().ok_or_else(|| {
                PredictorError::PreprocessingError(format!(
                    "standard scaler needs numeric columns, got {}",
                    c.kind()
                ))
            })
        })
        .collect()
}
