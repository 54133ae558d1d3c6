//! Column plan and its fitted counterpart

use super::{ColumnTransform, CountVectorizer, MultiLabelAdapter, StandardScaler};
use crate::config::{FeatureSchema, VectorizerConfig};
use crate::data::{ColumnData, FeatureFrame, FeatureMatrix};
use crate::error::{PredictorError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Stacked output is sparse when less than this share of its cells is stored
pub const SPARSE_THRESHOLD: f64 = 0.3;

/// Which transform a plan step applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransformKind {
    StandardScaler,
    CountVectorizer {
        max_features: Option<usize>,
        english_stop_words: bool,
    },
    MultiLabelBinarizer,
}

impl TransformKind {
    /// Fresh, unfitted transform for this kind
    pub fn build(&self) -> Box<dyn ColumnTransform> {
        match self {
            TransformKind::StandardScaler => Box::new(StandardScaler::new()),
            TransformKind::CountVectorizer {
                max_features,
                english_stop_words,
            } => {
                let mut cv = CountVectorizer::new();
                if let Some(n) = max_features {
                    cv = cv.with_max_features(*n);
                }
                if *english_stop_words {
                    cv = cv.with_english_stop_words();
                }
                Box::new(cv)
            }
            TransformKind::MultiLabelBinarizer => Box::new(MultiLabelAdapter::new()),
        }
    }

    fn base_name(&self) -> &'static str {
        match self {
            TransformKind::StandardScaler => "standardscaler",
            TransformKind::CountVectorizer { .. } => "countvectorizer",
            TransformKind::MultiLabelBinarizer => "multilabelbinarizer",
        }
    }
}

/// One transform bound to the columns it reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub kind: TransformKind,
    pub columns: Vec<String>,
}

/// Ordered list of column transforms. Columns no step names are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPlan {
    steps: Vec<PlanStep>,
}

impl ColumnPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn add(mut self, kind: TransformKind, columns: Vec<String>) -> Self {
        self.steps.push(PlanStep { kind, columns });
        self
    }

    /// Scale the numeric columns, vectorize the text column, binarize each
    /// label column separately.
    pub fn from_schema(schema: &FeatureSchema, vectorizer: &VectorizerConfig) -> Self {
        let mut plan = Self::new()
            .add(TransformKind::StandardScaler, schema.numeric_columns.clone())
            .add(
                TransformKind::CountVectorizer {
                    max_features: vectorizer.max_features,
                    english_stop_words: vectorizer.english_stop_words,
                },
                vec![schema.text_column.clone()],
            );
        for col in &schema.label_columns {
            plan = plan.add(TransformKind::MultiLabelBinarizer, vec![col.clone()]);
        }
        plan
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Step names; a name used by several steps gets `-1`, `-2`, ... suffixes
    pub fn step_names(&self) -> Vec<String> {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for step in &self.steps {
            *totals.entry(step.kind.base_name()).or_insert(0) += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.steps
            .iter()
            .map(|step| {
                let base = step.kind.base_name();
                if totals[base] > 1 {
                    let n = seen.entry(base).or_insert(0);
                    *n += 1;
                    format!("{}-{}", base, n)
                } else {
                    base.to_string()
                }
            })
            .collect()
    }

    /// Fit a fresh transform per step on `frame`
    pub fn fit(&self, frame: &FeatureFrame, target: Option<&Array1<f64>>) -> Result<FittedColumnTransformer> {
        if self.steps.is_empty() {
            return Err(PredictorError::PreprocessingError(
                "column plan has no steps".to_string(),
            ));
        }

        let names = self.step_names();
        let mut fitted = Vec::with_capacity(self.steps.len());

        for (step, name) in self.steps.iter().zip(names) {
            let columns = select(frame, &step.columns)?;
            let mut transform = step.kind.build();
            transform.fit(&columns, target)?;
            debug!(step = %name, width = transform.n_features_out(), "Fitted plan step");
            fitted.push(FittedStep {
                name,
                columns: step.columns.clone(),
                transform,
            });
        }

        Ok(FittedColumnTransformer { steps: fitted })
    }
}

struct FittedStep {
    name: String,
    columns: Vec<String>,
    transform: Box<dyn ColumnTransform>,
}

/// Fitted plan: horizontally stacks every step's output block
pub struct FittedColumnTransformer {
    steps: Vec<FittedStep>,
}

impl FittedColumnTransformer {
    /// Feature matrix for `frame`, sparse or dense per [`SPARSE_THRESHOLD`]
    pub fn transform(&self, frame: &FeatureFrame) -> Result<FeatureMatrix> {
        let mut blocks: Vec<FeatureMatrix> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let columns = select(frame, &step.columns)?;
            let block = step.transform.transform(&columns)?;
            if block.ncols() > 0 {
                blocks.push(block);
            }
        }

        if blocks.is_empty() {
            return Ok(FeatureMatrix::Dense(Array2::zeros((frame.n_rows(), 0))));
        }
        FeatureMatrix::hstack(blocks, SPARSE_THRESHOLD)
    }

    /// Total output width
    pub fn n_features_out(&self) -> usize {
        self.steps.iter().map(|s| s.transform.n_features_out()).sum()
    }

    /// `(step name, output width)` pairs in plan order
    pub fn step_widths(&self) -> Vec<(String, usize)> {
        self.steps
            .iter()
            .map(|s| (s.name.clone(), s.transform.n_features_out()))
            .collect()
    }
}

impl std::fmt::Debug for FittedColumnTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedColumnTransformer")
            .field("steps", &self.step_widths())
            .finish()
    }
}

fn select<'a>(frame: &'a FeatureFrame, names: &[String]) -> Result<Vec<&'a ColumnData>> {
    names.iter().map(|n| frame.column(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FeatureFrame {
        FeatureFrame::new()
            .with_column("year", ColumnData::Numeric(vec![2000.0, 2010.0, 2020.0]))
            .unwrap()
            .with_column(
                "description",
                ColumnData::Text(vec![
                    "dice rolling".into(),
                    "card drafting".into(),
                    "dice drafting".into(),
                ]),
            )
            .unwrap()
            .with_column(
                "mechanic",
                ColumnData::Labels(vec![vec!["Dice".into()], vec!["Cards".into()], vec![]]),
            )
            .unwrap()
            .with_column("unused", ColumnData::Numeric(vec![1.0, 2.0, 3.0]))
            .unwrap()
    }

    fn schema() -> FeatureSchema {
        FeatureSchema {
            numeric_columns: vec!["year".into()],
            text_column: "description".into(),
            label_columns: vec!["mechanic".into()],
            target_column: "average".into(),
        }
    }

    #[test]
    fn test_plan_from_schema_widths() {
        let plan = ColumnPlan::from_schema(&schema(), &VectorizerConfig::default());
        let fitted = plan.fit(&frame(), None).unwrap();
        let x = fitted.transform(&frame()).unwrap();

        // 1 scaled + 4 terms (card, dice, drafting, rolling) + 2 labels
        assert_eq!((x.nrows(), x.ncols()), (3, 7));
        assert_eq!(fitted.n_features_out(), 7);
        assert_eq!(&x.to_dense().row(0).to_vec()[5..], &[0.0, 1.0]);
    }

    #[test]
    fn test_many_labels_stack_sparse() {
        let n = 200;
        let frame = FeatureFrame::new()
            .with_column("year", ColumnData::Numeric((0..n).map(|i| i as f64).collect()))
            .unwrap()
            .with_column(
                "designer",
                ColumnData::Labels((0..n).map(|i| vec![format!("designer {:03}", i)]).collect()),
            )
            .unwrap();
        let plan = ColumnPlan::new()
            .add(TransformKind::StandardScaler, vec!["year".into()])
            .add(TransformKind::MultiLabelBinarizer, vec!["designer".into()]);

        let x = plan.fit(&frame, None).unwrap().transform(&frame).unwrap();
        assert!(x.is_sparse());
        assert_eq!(x.ncols(), 1 + n);
        assert_eq!(x.get(7, 1 + 7), 1.0);
        assert_eq!(x.get(7, 1 + 8), 0.0);
        assert!((x.get(0, 0) + x.get(n - 1, 0)).abs() < 1e-9);
    }

    #[test]
    fn test_step_names_suffix_duplicates() {
        let plan = ColumnPlan::new()
            .add(TransformKind::StandardScaler, vec!["a".into()])
            .add(TransformKind::MultiLabelBinarizer, vec!["b".into()])
            .add(TransformKind::MultiLabelBinarizer, vec!["c".into()]);
        assert_eq!(
            plan.step_names(),
            vec!["standardscaler", "multilabelbinarizer-1", "multilabelbinarizer-2"]
        );
    }

    #[test]
    fn test_plan_is_reusable() {
        let plan = ColumnPlan::from_schema(&schema(), &VectorizerConfig::default());
        let before = plan.clone();
        let full = frame();
        let a = plan.fit(&full, None).unwrap();
        let b = plan.fit(&full.head(1), None).unwrap();
        assert_eq!(plan, before);
        assert!(a.n_features_out() > b.n_features_out());
    }

    #[test]
    fn test_missing_column_fails() {
        let plan = ColumnPlan::new().add(TransformKind::StandardScaler, vec!["nope".into()]);
        assert!(matches!(plan.fit(&frame(), None), Err(PredictorError::FeatureNotFound(_))));
    }
}
