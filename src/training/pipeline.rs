//! Column plan followed by a matrix regressor

use super::{Estimator, Regressor};
use crate::data::FeatureFrame;
use crate::error::{PredictorError, Result};
use crate::preprocessing::{ColumnPlan, FittedColumnTransformer};
use ndarray::Array1;

/// Fits the plan on the training frame, then the regressor on its output.
///
/// `template` is the unfitted regressor; every fit starts from a clone of it.
#[derive(Debug)]
pub struct Pipeline<R> {
    plan: ColumnPlan,
    template: R,
    fitted: Option<(FittedColumnTransformer, R)>,
}

impl<R: Regressor + Clone> Pipeline<R> {
    pub fn new(plan: ColumnPlan, regressor: R) -> Self {
        Self {
            plan,
            template: regressor,
            fitted: None,
        }
    }

    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }

    /// Unfitted regressor configuration
    pub fn regressor(&self) -> &R {
        &self.template
    }

    /// Fitted transformer and regressor, once `fit` has run
    pub fn fitted(&self) -> Option<(&FittedColumnTransformer, &R)> {
        self.fitted.as_ref().map(|(t, r)| (t, r))
    }
}

impl<R: Regressor + Clone + 'static> Estimator for Pipeline<R> {
    fn name(&self) -> &'static str {
        self.template.name()
    }

    fn fit(&mut self, frame: &FeatureFrame, y: &Array1<f64>) -> Result<()> {
        if frame.n_rows() != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", frame.n_rows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let transformer = self.plan.fit(frame, Some(y))?;
        let x = transformer.transform(frame)?;
        let mut regressor = self.template.clone();
        regressor.fit(&x, y)?;
        self.fitted = Some((transformer, regressor));
        Ok(())
    }

    fn predict(&self, frame: &FeatureFrame) -> Result<Array1<f64>> {
        let (transformer, regressor) = self.fitted.as_ref().ok_or(PredictorError::ModelNotFitted)?;
        let x = transformer.transform(frame)?;
        regressor.predict(&x)
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(Pipeline::new(self.plan.clone(), self.template.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnData;
    use crate::preprocessing::TransformKind;
    use crate::training::RidgeRegression;

    fn frame() -> FeatureFrame {
        FeatureFrame::new()
            .with_column("x", ColumnData::Numeric(vec![1.0, 2.0, 3.0, 4.0]))
            .unwrap()
            .with_column(
                "tags",
                ColumnData::Labels(vec![vec!["a".into()], vec![], vec!["a".into()], vec![]]),
            )
            .unwrap()
    }

    fn plan() -> ColumnPlan {
        ColumnPlan::new()
            .add(TransformKind::StandardScaler, vec!["x".into()])
            .add(TransformKind::MultiLabelBinarizer, vec!["tags".into()])
    }

    #[test]
    fn test_pipeline_fit_predict() {
        let y = Array1::from_vec(vec![2.0, 4.0, 6.0, 8.0]);
        let mut pipe = Pipeline::new(plan(), RidgeRegression::new(1e-6));
        pipe.fit(&frame(), &y).unwrap();

        let p = pipe.predict(&frame()).unwrap();
        for (pi, yi) in p.iter().zip(y.iter()) {
            assert!((pi - yi).abs() < 1e-3);
        }
        let (transformer, _) = pipe.fitted().unwrap();
        assert_eq!(transformer.n_features_out(), 2);
    }

    #[test]
    fn test_clone_unfitted_has_no_state() {
        let y = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let mut pipe = Pipeline::new(plan(), RidgeRegression::new(1.0));
        pipe.fit(&frame(), &y).unwrap();

        let fresh = pipe.clone_unfitted();
        assert!(matches!(fresh.predict(&frame()), Err(PredictorError::ModelNotFitted)));
    }
}
