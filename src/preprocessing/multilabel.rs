//! Multi-label binarization
//!
//! [`MultiLabelBinarizer`] turns label sets into sparse indicator rows. The
//! [`MultiLabelAdapter`] puts it behind the plan's fit/transform contract,
//! which always hands over a target the binarizer has no use for.

use super::ColumnTransform;
use crate::data::{ColumnData, CsrMatrix, FeatureMatrix};
use crate::error::{PredictorError, Result};
use ndarray::Array1;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Label sets to a fixed-width zero/one matrix
#[derive(Debug, Clone, Default)]
pub struct MultiLabelBinarizer {
    classes: Vec<String>,
    index: HashMap<String, usize>,
    is_fitted: bool,
}

impl MultiLabelBinarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the sorted set of labels seen in `rows`
    pub fn fit(&mut self, rows: &[Vec<String>]) -> &mut Self {
        let classes: BTreeSet<&String> = rows.iter().flatten().collect();
        self.classes = classes.into_iter().cloned().collect();
        self.index = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        self.is_fitted = true;
        self
    }

    /// Indicator matrix over the fitted classes. Unseen labels are skipped.
    pub fn transform(&self, rows: &[Vec<String>]) -> Result<CsrMatrix> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }

        let mut unseen: BTreeSet<&str> = BTreeSet::new();
        let mut entries: Vec<Vec<(usize, f64)>> = Vec::with_capacity(rows.len());

        for labels in rows {
            let mut row: Vec<(usize, f64)> = Vec::with_capacity(labels.len());
            for label in labels {
                match self.index.get(label) {
                    // a repeated label still sets a single 1
                    Some(&c) if !row.iter().any(|&(seen, _)| seen == c) => row.push((c, 1.0)),
                    Some(_) => {}
                    None => {
                        unseen.insert(label.as_str());
                    }
                }
            }
            entries.push(row);
        }

        if !unseen.is_empty() {
            warn!(
                count = unseen.len(),
                examples = ?unseen.iter().take(5).collect::<Vec<_>>(),
                "Unknown label(s) ignored"
            );
        }

        CsrMatrix::from_rows(self.classes.len(), entries)
    }

    pub fn fit_transform(&mut self, rows: &[Vec<String>]) -> Result<CsrMatrix> {
        self.fit(rows);
        self.transform(rows)
    }

    /// Labels observed at fit time, sorted
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Binarizer usable as a plan step
#[derive(Debug, Clone, Default)]
pub struct MultiLabelAdapter {
    encoder: MultiLabelBinarizer,
}

impl MultiLabelAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }
}

impl ColumnTransform for MultiLabelAdapter {
    fn fit(&mut self, columns: &[&ColumnData], _target: Option<&Array1<f64>>) -> Result<()> {
        self.encoder.fit(single_labels(columns)?);
        Ok(())
    }

    fn transform(&self, columns: &[&ColumnData]) -> Result<FeatureMatrix> {
        Ok(self.encoder.transform(single_labels(columns)?)?.into())
    }

    fn n_features_out(&self) -> usize {
        self.encoder.classes().len()
    }
}

fn single_labels<'a>(columns: &[&'a ColumnData]) -> Result<&'a [Vec<String>]> {
    match columns {
        [col] => col.as_labels().ok_or_else(|| {
            PredictorError::PreprocessingError(format!(
                "multi-label binarizer needs a label-list column, got {}",
                col.kind()
            ))
        }),
        _ => Err(PredictorError::PreprocessingError(format!(
            "multi-label binarizer takes exactly one column, got {}",
            columns.len()
        ))),
    }
}
