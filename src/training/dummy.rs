//! Mean-of-target baseline

use super::{Estimator, Regressor};
use crate::data::{FeatureFrame, FeatureMatrix};
use crate::error::{PredictorError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Predicts the training mean for every row, ignoring the features
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DummyRegressor {
    constant: Option<f64>,
}

impl DummyRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted constant, if any
    pub fn constant(&self) -> Option<f64> {
        self.constant
    }

    fn fit_target(&mut self, y: &Array1<f64>) -> Result<()> {
        let mean = y.mean().ok_or_else(|| {
            PredictorError::TrainingError("cannot fit baseline on an empty target".to_string())
        })?;
        self.constant = Some(mean);
        Ok(())
    }

    fn predict_rows(&self, n_rows: usize) -> Result<Array1<f64>> {
        let c = self.constant.ok_or(PredictorError::ModelNotFitted)?;
        Ok(Array1::from_elem(n_rows, c))
    }
}

impl Regressor for DummyRegressor {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        self.fit_target(y)
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.predict_rows(x.nrows())
    }
}

impl Estimator for DummyRegressor {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn fit(&mut self, frame: &FeatureFrame, y: &Array1<f64>) -> Result<()> {
        if frame.n_rows() != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", frame.n_rows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        self.fit_target(y)
    }

    fn predict(&self, frame: &FeatureFrame) -> Result<Array1<f64>> {
        self.predict_rows(frame.n_rows())
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(DummyRegressor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CsrMatrix;
    use ndarray::{array, Array2};

    #[test]
    fn test_predicts_training_mean() {
        let x = FeatureMatrix::Dense(Array2::zeros((4, 2)));
        let y = array![1.0, 2.0, 3.0, 6.0];
        let mut model = DummyRegressor::new();
        Regressor::fit(&mut model, &x, &y).unwrap();
        assert_eq!(model.constant(), Some(3.0));
        let p = Regressor::predict(&model, &CsrMatrix::zeros(2, 2).into()).unwrap();
        assert_eq!(p.to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_score_on_training_data_is_zero() {
        let x = FeatureMatrix::Dense(Array2::zeros((3, 1)));
        let y = array![1.0, 2.0, 3.0];
        let mut model = DummyRegressor::new();
        Regressor::fit(&mut model, &x, &y).unwrap();
        assert!(Regressor::score(&model, &x, &y).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_not_fitted() {
        let model = DummyRegressor::new();
        assert!(matches!(
            Regressor::predict(&model, &FeatureMatrix::Dense(Array2::zeros((1, 1)))),
            Err(PredictorError::ModelNotFitted)
        ));
    }
}
