//! Tabular data handling
//!
//! - [`literal`] decodes string-encoded label lists
//! - [`loader`] reads the CSV files into typed frames
//! - [`matrix`] holds the numeric matrices the column plan produces
//!
//! [`FeatureFrame`] is the column-oriented table every transform and
//! estimator consumes. Once built it is never mutated; row subsets are copies.

pub mod literal;
pub mod loader;
pub mod matrix;

pub use literal::{decode_list_column, encode_list_literal, parse_list_literal};
pub use loader::{load_dataset, read_csv, split_features_target};
pub use matrix::{CsrMatrix, FeatureMatrix};

use crate::error::{PredictorError, Result};
use ndarray::Array1;

/// Typed values of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
    Labels(Vec<Vec<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ColumnData::Numeric(_) => "numeric",
            ColumnData::Text(_) => "text",
            ColumnData::Labels(_) => "labels",
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            ColumnData::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_labels(&self) -> Option<&[Vec<String>]> {
        match self {
            ColumnData::Labels(v) => Some(v),
            _ => None,
        }
    }

    /// Copy the given rows, in order
    pub fn take(&self, rows: &[usize]) -> Self {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
            ColumnData::Labels(v) => ColumnData::Labels(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Named, equal-length columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    names: Vec<String>,
    columns: Vec<ColumnData>,
    n_rows: usize,
}

impl FeatureFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. The first column fixes the row count.
    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> Result<Self> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(PredictorError::DataError(format!("duplicate column '{}'", name)));
        }
        if !self.columns.is_empty() && data.len() != self.n_rows {
            return Err(PredictorError::ShapeError {
                expected: format!("{} rows in column '{}'", self.n_rows, name),
                actual: format!("{} rows", data.len()),
            });
        }
        self.n_rows = data.len();
        self.names.push(name);
        self.columns.push(data);
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Result<&ColumnData> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| PredictorError::FeatureNotFound(name.to_string()))
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Copy the given rows of every column
    pub fn take(&self, rows: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
        }
    }

    /// First `n` rows (all rows when `n` exceeds the height)
    pub fn head(&self, n: usize) -> Self {
        let rows: Vec<usize> = (0..n.min(self.n_rows)).collect();
        self.take(&rows)
    }
}

/// Feature frame paired with its regression target
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: FeatureFrame,
    pub target: Array1<f64>,
}

impl Dataset {
    pub fn new(features: FeatureFrame, target: Array1<f64>) -> Result<Self> {
        if features.n_rows() != target.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("target length = {}", features.n_rows()),
                actual: format!("target length = {}", target.len()),
            });
        }
        Ok(Self { features, target })
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    /// First `n` rows of features and target
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.n_rows());
        Self {
            features: self.features.head(n),
            target: self.target.slice(ndarray::s![..n]).to_owned(),
        }
    }
}
