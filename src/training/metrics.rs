//! Regression metrics and cross-validation scorers

use crate::error::{PredictorError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PredictorError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(PredictorError::ValidationError(
            "cannot score an empty target".to_string(),
        ));
    }
    Ok(())
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 on a perfect fit and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Mean absolute percentage error as a fraction, `mean(|y - ŷ| / max(|y|, ε))`
pub fn mean_absolute_percentage_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs() / t.abs().max(f64::EPSILON))
        .sum();
    Ok(total / y_true.len() as f64)
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(total / y_true.len() as f64)
}

pub fn root_mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(mean_squared_error(y_true, y_pred)?.sqrt())
}

/// Named score where larger is always better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scorer {
    R2,
    NegMape,
    NegRmse,
    NegMse,
}

impl Scorer {
    /// Key used in score tables
    pub fn name(&self) -> &'static str {
        match self {
            Scorer::R2 => "r2",
            Scorer::NegMape => "MAPE",
            Scorer::NegRmse => "neg_rmse",
            Scorer::NegMse => "neg_mse",
        }
    }

    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        match self {
            Scorer::R2 => r2_score(y_true, y_pred),
            Scorer::NegMape => Ok(-mean_absolute_percentage_error(y_true, y_pred)?),
            Scorer::NegRmse => Ok(-root_mean_squared_error(y_true, y_pred)?),
            Scorer::NegMse => Ok(-mean_squared_error(y_true, y_pred)?),
        }
    }
}

/// R², negative MAPE, negative RMSE, negative MSE
pub fn default_scorers() -> Vec<Scorer> {
    vec![Scorer::R2, Scorer::NegMape, Scorer::NegRmse, Scorer::NegMse]
}
