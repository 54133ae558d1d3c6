//! CSV loading and feature/target splitting

use super::{decode_list_column, ColumnData, Dataset, FeatureFrame};
use crate::config::FeatureSchema;
use crate::error::{PredictorError, Result};
use ndarray::Array1;
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Read a CSV file with a header row. The whole file is scanned for schema inference.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(PredictorError::DataError(format!(
            "input file not found: {}",
            path.display()
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    Ok(df)
}

/// Read a CSV file and split it into the schema's features and target
pub fn load_dataset(path: &Path, schema: &FeatureSchema) -> Result<Dataset> {
    let start = Instant::now();
    let df = read_csv(path)?;
    let dataset = split_features_target(&df, schema)?;

    info!(
        path = %path.display(),
        rows = dataset.n_rows(),
        columns = dataset.features.n_columns(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Pull the schema's columns out of a data frame, decoding label lists on the way.
///
/// Columns the schema does not mention are dropped.
pub fn split_features_target(df: &DataFrame, schema: &FeatureSchema) -> Result<Dataset> {
    let mut frame = FeatureFrame::new();

    for name in &schema.numeric_columns {
        frame = frame.with_column(name.clone(), ColumnData::Numeric(numeric_column(df, name)?))?;
    }

    frame = frame.with_column(
        schema.text_column.clone(),
        ColumnData::Text(text_column(df, &schema.text_column)?),
    )?;

    for name in &schema.label_columns {
        frame = frame.with_column(name.clone(), ColumnData::Labels(label_column(df, name)?))?;
    }

    let target = Array1::from_vec(numeric_column(df, &schema.target_column)?);
    Dataset::new(frame, target)
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| PredictorError::FeatureNotFound(name.to_string()))
}

/// Numeric column as `f64`; missing values are an error
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let casted = series(df, name)?.cast(&DataType::Float64)?;
    let ca = casted.f64()?;

    if ca.null_count() > 0 {
        return Err(PredictorError::DataError(format!(
            "numeric column '{}' has {} missing or non-numeric values",
            name,
            ca.null_count()
        )));
    }

    Ok(ca.into_no_null_iter().collect())
}

/// Text column; missing values are an error
pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let casted = series(df, name)?.cast(&DataType::String)?;
    let ca = casted.str()?;

    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.map(str::to_string).ok_or_else(|| {
                PredictorError::DataError(format!("text column '{}' row {} is missing", name, row))
            })
        })
        .collect()
}

/// Label-list column decoded from its string literals
pub fn label_column(df: &DataFrame, name: &str) -> Result<Vec<Vec<String>>> {
    let casted = series(df, name)?.cast(&DataType::String)?;
    let ca = casted.str()?;
    let cells: Vec<Option<&str>> = ca.into_iter().collect();
    decode_list_column(name, &cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            numeric_columns: vec!["year".into()],
            text_column: "description".into(),
            label_columns: vec!["category".into()],
            target_column: "average".into(),
        }
    }

    #[test]
    fn test_split_features_target() {
        let df = df!(
            "year" => &[2001i64, 2010],
            "description" => &["a dice game", "a card game"],
            "category" => &["['Dice']", "['Card Game', 'Fantasy']"],
            "ignored" => &[1, 2],
            "average" => &[6.5, 7.25]
        )
        .unwrap();

        let ds = split_features_target(&df, &schema()).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.features.n_columns(), 3);
        assert!(ds.features.column("ignored").is_err());
        assert_eq!(ds.features.column("year").unwrap().as_numeric().unwrap(), &[2001.0, 2010.0]);
        assert_eq!(
            ds.features.column("category").unwrap().as_labels().unwrap()[1],
            vec!["Card Game".to_string(), "Fantasy".to_string()]
        );
        assert_eq!(ds.target.to_vec(), vec![6.5, 7.25]);
    }

    #[test]
    fn test_malformed_label_cell_is_fatal() {
        let df = df!(
            "year" => &[2001.0],
            "description" => &["text"],
            "category" => &["Dice"],
            "average" => &[6.5]
        )
        .unwrap();

        let err = split_features_target(&df, &schema()).unwrap_err();
        assert!(matches!(err, PredictorError::LiteralError { .. }));
    }

    #[test]
    fn test_missing_column() {
        let df = df!("year" => &[1.0]).unwrap();
        assert!(matches!(
            split_features_target(&df, &schema()),
            Err(PredictorError::FeatureNotFound(_))
        ));
    }
}
