//! Integration test: Full run (load → compare models → evaluate → write results)

use rating_predictor::config::{IntRange, RunConfig};
use rating_predictor::error::PredictorError;
use rating_predictor::evaluation::{
    ERROR_SCORE_FILE, MODEL_COMPARISON_FILE, PREDICTION_COMPARISON_FILE, RESULTS_PLOT_FILE,
};
use rating_predictor::experiment::{run, verify_results, Experiment, RunPaths};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CATEGORIES: &[&str] = &["Card Game", "Dice", "Fantasy", "Economic", "Wargame"];
const MECHANICS: &[&str] = &["Hand Management", "Worker Placement", "Dice Rolling"];
const WORDS: &[&str] = &["dragons", "trade", "castle", "fleet", "harvest", "merchants", "dungeon", "empire"];

fn list(items: &[&str], i: usize, n: usize) -> String {
    let picked: Vec<String> = (0..n)
        .map(|k| format!("'{}'", items[(i + k * 2) % items.len()]))
        .collect();
    format!("\"[{}]\"", picked.join(", "))
}

/// Synthetic games whose rating depends on player counts, playing time and category
fn write_games_csv(path: &Path, rows: usize, offset: usize) {
    let mut csv = String::from(
        "yearpublished,minplayers,maxplayers,playingtime,minplaytime,maxplaytime,minage,\
         description,boardgamecategory,boardgamemechanic,boardgamefamily,boardgamedesigner,\
         boardgameartist,boardgamepublisher,average\n",
    );

    for r in 0..rows {
        let i = r + offset;
        let minplayers = 1 + i % 4;
        let maxplayers = minplayers + 1 + i % 3;
        let playingtime = 20 + (i * 7) % 160;
        let category = i % CATEGORIES.len();
        let average = 4.0
            + 0.3 * minplayers as f64
            + playingtime as f64 / 60.0
            + if category == 2 { 0.8 } else { 0.0 }
            + ((i * 13) % 10) as f64 / 20.0;
        let description = format!(
            "A game of {} and {} for the whole table",
            WORDS[i % WORDS.len()],
            WORDS[(i * 3 + 1) % WORDS.len()]
        );

        writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:.3}",
            1990 + i % 30,
            minplayers,
            maxplayers,
            playingtime,
            playingtime.saturating_sub(10),
            playingtime + 10,
            8 + i % 6,
            description,
            list(CATEGORIES, category, 1 + i % 2),
            list(MECHANICS, i, 1 + i % 3),
            format!("\"['Family {}']\"", i % 3),
            list(&["Designer A", "Designer B", "Designer C"], i, 1),
            "[]",
            list(&["Publisher X", "Publisher Y"], i, 1),
            average
        )
        .unwrap();
    }

    fs::write(path, csv).unwrap();
}

fn small_config() -> RunConfig {
    let mut config = RunConfig::default().with_cv_folds(3).with_n_estimators(5);
    config.forest.max_depth = IntRange { start: 2, stop: 6, step: 2 };
    config.forest.n_iter = 3;
    config.forest.subset_rows = 45;
    config.plot.width = 200;
    config.plot.height = 200;
    config
}

fn inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let train = dir.join("train.csv");
    let test = dir.join("test.csv");
    write_games_csv(&train, 60, 0);
    write_games_csv(&test, 20, 1000);
    (train, test)
}

fn first_column(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_run_writes_all_artifacts() {
    let dir = tempdir().unwrap();
    let (train, test) = inputs(dir.path());
    let results = dir.path().join("results");

    let summary = run(small_config(), RunPaths::new(&train, &test, &results)).unwrap();

    verify_results(&results).unwrap();
    for name in [MODEL_COMPARISON_FILE, PREDICTION_COMPARISON_FILE, ERROR_SCORE_FILE, RESULTS_PLOT_FILE] {
        assert!(fs::metadata(results.join(name)).unwrap().len() > 0, "{} is empty", name);
    }
    assert_eq!(summary.artifacts.len(), 4);

    let comparison = fs::read_to_string(results.join(MODEL_COMPARISON_FILE)).unwrap();
    assert!(comparison
        .lines()
        .next()
        .unwrap()
        .ends_with(",Dummy_Regressor,Ridge,Random_Forest"));
    assert_eq!(
        summary.comparison.metrics(),
        &[
            "fit_time", "score_time", "test_r2", "train_r2", "test_MAPE", "train_MAPE",
            "test_neg_rmse", "train_neg_rmse", "test_neg_mse", "train_neg_mse",
        ]
        .map(String::from)
    );

    let predictions = fs::read_to_string(results.join(PREDICTION_COMPARISON_FILE)).unwrap();
    assert_eq!(predictions.lines().count(), 21);

    assert!(summary.held_out.mape.is_finite() && summary.held_out.mape >= 0.0);
    assert!(summary.ridge_params.is_some() && summary.forest_params.is_some());
}

#[test]
fn test_comparison_index_stable_across_runs() {
    let dir = tempdir().unwrap();
    let (train, test) = inputs(dir.path());
    let first = dir.path().join("first");
    let second = dir.path().join("second");

    let a = run(small_config(), RunPaths::new(&train, &test, &first)).unwrap();
    let b = run(small_config(), RunPaths::new(&train, &test, &second)).unwrap();

    assert_eq!(
        first_column(&first.join(MODEL_COMPARISON_FILE)),
        first_column(&second.join(MODEL_COMPARISON_FILE))
    );
    assert_eq!(a.forest_params, b.forest_params);
    assert_eq!(a.ridge_params, b.ridge_params);
    assert_eq!(
        fs::read_to_string(first.join(PREDICTION_COMPARISON_FILE)).unwrap(),
        fs::read_to_string(second.join(PREDICTION_COMPARISON_FILE)).unwrap()
    );
}

#[test]
fn test_forest_tunes_on_leading_rows_and_refits_on_all() {
    let dir = tempdir().unwrap();
    let (train, test) = inputs(dir.path());

    // every game past the tuning subset moves to a publisher the subset never sees
    let text = fs::read_to_string(&train).unwrap();
    let rewritten: Vec<String> = text
        .lines()
        .enumerate()
        .map(|(n, line)| {
            if n > 45 {
                line.replace("'Publisher X'", "'Publisher Late'")
                    .replace("'Publisher Y'", "'Publisher Late'")
            } else {
                line.to_string()
            }
        })
        .collect();
    fs::write(&train, rewritten.join("\n") + "\n").unwrap();

    let experiment =
        Experiment::prepare(small_config(), RunPaths::new(&train, &test, dir.path().join("out"))).unwrap();
    let (forest, pipeline) = experiment.forest().unwrap();
    assert_eq!(forest.n_rows, 45);
    assert_eq!(experiment.ridge().unwrap().n_rows, 60);
    assert_eq!(experiment.baseline().unwrap().n_rows, 60);

    let subset_plan = experiment.plan().fit(&experiment.train().head(45).features, None).unwrap();
    assert_eq!(
        subset_plan.step_widths().last().unwrap(),
        &("multilabelbinarizer-6".to_string(), 2)
    );

    let (fitted, model) = pipeline.fitted().unwrap();
    assert_eq!(
        fitted.step_widths().last().unwrap(),
        &("multilabelbinarizer-6".to_string(), 3)
    );
    assert_eq!(model.trees().len(), 5);
}

#[test]
fn test_unwritable_results_dir_fails_before_training() {
    let dir = tempdir().unwrap();
    let (train, test) = inputs(dir.path());
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();
    let results = blocker.join("results");

    let err = Experiment::prepare(small_config(), RunPaths::new(&train, &test, &results)).unwrap_err();
    assert!(matches!(err, PredictorError::IoError(_) | PredictorError::ConfigError(_)));
    assert!(!results.exists());
}

#[cfg(unix)]
#[test]
fn test_read_only_results_dir_rejected() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let (train, test) = inputs(dir.path());
    let results = dir.path().join("locked");
    fs::create_dir(&results).unwrap();
    fs::set_permissions(&results, fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users can write regardless of mode bits
    if fs::write(results.join("scratch"), "x").is_ok() {
        return;
    }

    let err = Experiment::prepare(small_config(), RunPaths::new(&train, &test, &results)).unwrap_err();
    assert!(err.to_string().contains("not writable"));
    assert_eq!(fs::read_dir(&results).unwrap().count(), 0);

    fs::set_permissions(&results, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_missing_input_file() {
    let dir = tempdir().unwrap();
    let paths = RunPaths::new(dir.path().join("nope.csv"), dir.path().join("nope2.csv"), dir.path().join("out"));
    assert!(matches!(
        Experiment::prepare(small_config(), paths).unwrap_err(),
        PredictorError::DataError(_)
    ));
}

#[test]
fn test_malformed_label_list_rejected() {
    let dir = tempdir().unwrap();
    let (train, test) = inputs(dir.path());
    let text = fs::read_to_string(&train).unwrap();
    fs::write(&train, text.replacen("\"['Publisher", "\"not a list ['Publisher", 1)).unwrap();

    let err = Experiment::prepare(small_config(), RunPaths::new(&train, &test, dir.path().join("out"))).unwrap_err();
    assert!(
        matches!(err, PredictorError::LiteralError { ref column, .. } if column == "boardgamepublisher"),
        "{}",
        err
    );
}
