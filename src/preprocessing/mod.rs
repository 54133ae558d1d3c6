//! Feature preprocessing
//!
//! Turns a [`FeatureFrame`](crate::data::FeatureFrame) into a numeric
//! [`FeatureMatrix`]:
//! - Standard scaling of numeric columns
//! - Bag-of-words counts for a free-text column
//! - Indicator encoding of label-list columns
//!
//! A [`ColumnPlan`] says which transform applies to which columns. Fitting a
//! plan produces a [`FittedColumnTransformer`]; the plan itself is never
//! touched, so one plan can be shared by every model in a run.

mod column_transformer;
mod multilabel;
mod scaler;
mod text;

pub use column_transformer::{
    ColumnPlan, FittedColumnTransformer, PlanStep, TransformKind, SPARSE_THRESHOLD,
};
pub use multilabel::{MultiLabelAdapter, MultiLabelBinarizer};
pub use scaler::StandardScaler;
pub use text::{CountVectorizer, TextTokenizer, ENGLISH_STOP_WORDS};

use crate::data::{ColumnData, FeatureMatrix};
use crate::error::Result;
use ndarray::Array1;

/// A transform over one or more columns with a fit/transform lifecycle.
///
/// `fit` always receives the target, whether or not the transform uses it.
pub trait ColumnTransform: Send + Sync {
    /// Learn state from the training columns
    fn fit(&mut self, columns: &[&ColumnData], target: Option<&Array1<f64>>) -> Result<()>;

    /// Map columns to a `(rows, n_features_out)` block
    fn transform(&self, columns: &[&ColumnData]) -> Result<FeatureMatrix>;

    /// Output width once fitted
    fn n_features_out(&self) -> usize;
}
