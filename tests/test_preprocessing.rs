//! Integration test: List decoding and the column plan end-to-end

use rating_predictor::config::{FeatureSchema, VectorizerConfig};
use rating_predictor::data::{
    decode_list_column, encode_list_literal, parse_list_literal, ColumnData, FeatureFrame,
};
use rating_predictor::preprocessing::{ColumnPlan, MultiLabelBinarizer, TransformKind};

fn labels(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn game_frame() -> FeatureFrame {
    FeatureFrame::new()
        .with_column("minplayers", ColumnData::Numeric(vec![1.0, 2.0, 3.0, 4.0]))
        .unwrap()
        .with_column(
            "description",
            ColumnData::Text(vec![
                "Build a castle and trade goods".to_string(),
                "Trade routes across the sea".to_string(),
                "The dragons guard the castle".to_string(),
                "Roll dice, trade, win".to_string(),
            ]),
        )
        .unwrap()
        .with_column(
            "boardgamecategory",
            ColumnData::Labels(labels(&[&["Economic"], &["Economic", "Nautical"], &["Fantasy"], &[]])),
        )
        .unwrap()
}

#[test]
fn test_decode_reproduces_labels() {
    let original = vec!["Card Game".to_string(), "Bluffing".to_string(), "It's \"quoted\"".to_string()];
    let decoded = parse_list_literal(&encode_list_literal(&original)).unwrap();
    assert_eq!(decoded, original);

    assert_eq!(
        parse_list_literal("['Dice', \"Party Game\"]").unwrap(),
        vec!["Dice".to_string(), "Party Game".to_string()]
    );
    assert!(parse_list_literal("[]").unwrap().is_empty());
}

#[test]
fn test_decode_rejects_non_sequences() {
    for bad in ["Card Game", "{'a': 1}", "['a', 1]", "['unterminated", "42"] {
        assert!(parse_list_literal(bad).is_err(), "accepted {:?}", bad);
    }

    let err = decode_list_column("boardgamemechanic", &[Some("['ok']"), Some("oops")]).unwrap_err();
    assert!(err.to_string().contains("boardgamemechanic"));
    assert!(err.to_string().contains("row 1"));
}

#[test]
fn test_binarizer_ignores_unseen_labels() {
    let mut mlb = MultiLabelBinarizer::new();
    mlb.fit(&labels(&[&["a"], &["b"]]));

    let out = mlb.transform(&labels(&[&["c"], &["a", "c"]])).unwrap();
    assert_eq!((out.nrows(), out.ncols()), (2, 2));
    assert_eq!(out.nnz(), 1);
    let dense = out.to_dense();
    assert_eq!(dense.row(0).to_vec(), vec![0.0, 0.0]);
    assert_eq!(dense.row(1).to_vec(), vec![1.0, 0.0]);
}

#[test]
fn test_plan_output_width_and_scaling() {
    let plan = ColumnPlan::new()
        .add(TransformKind::StandardScaler, vec!["minplayers".to_string()])
        .add(
            TransformKind::CountVectorizer {
                max_features: None,
                english_stop_words: true,
            },
            vec!["description".to_string()],
        )
        .add(TransformKind::MultiLabelBinarizer, vec!["boardgamecategory".to_string()]);

    let frame = game_frame();
    let fitted = plan.fit(&frame, None).unwrap();
    let x = fitted.transform(&frame).unwrap().to_dense();

    assert_eq!(x.nrows(), 4);
    assert_eq!(x.ncols(), fitted.n_features_out());

    let widths = fitted.step_widths();
    assert_eq!(widths[0].1, 1);
    // Economic, Fantasy, Nautical
    assert_eq!(widths[2].1, 3);

    let scaled: f64 = x.column(0).sum();
    assert!(scaled.abs() < 1e-9);
    // No labels at all gives an all-zero indicator block
    let last_row = x.row(3);
    let tail = last_row.slice(ndarray::s![x.ncols() - 3..]);
    assert!(tail.iter().all(|v| *v == 0.0));
}

#[test]
fn test_default_plan_matches_schema() {
    let plan = ColumnPlan::from_schema(&FeatureSchema::default(), &VectorizerConfig::default());
    let names = plan.step_names();
    assert_eq!(names.len(), 8);
    assert_eq!(names[0], "standardscaler");
    assert_eq!(names[1], "countvectorizer");
    assert!(names[2..].iter().all(|n| n.starts_with("multilabelbinarizer")));
}
