//! End-to-end run: compare the baseline, Ridge and Random Forest families by
//! cross-validation, then evaluate the forest on the held-out file.
//!
//! Each stage is a method on [`Experiment`] so callers can report progress
//! between them; [`Experiment::run`] chains them all.

use crate::config::RunConfig;
use crate::data::{load_dataset, Dataset};
use crate::error::{PredictorError, Result};
use crate::evaluation::{
    ensure_writable_dir, verify_artifact, write_error_score_table, write_prediction_table,
    ComparisonTable, ERROR_SCORE_FILE, MODEL_COMPARISON_FILE, PREDICTION_COMPARISON_FILE,
    RESULTS_PLOT_FILE,
};
use crate::optimizer::{format_params, RandomizedSearch, SearchSpace, TrialParams, TrialParamsExt};
use crate::plot::{results_chart, save_chart};
use crate::preprocessing::ColumnPlan;
use crate::training::{
    cross_validate, default_scorers, mean_absolute_percentage_error, r2_score, DummyRegressor,
    Estimator, KFold, Pipeline, RandomForest, RidgeRegression, ScoreTable,
};
use ndarray::Array1;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

pub const BASELINE_NAME: &str = "Dummy_Regressor";
pub const RIDGE_NAME: &str = "Ridge";
pub const FOREST_NAME: &str = "Random_Forest";

/// Input files and output directory of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub training_file: PathBuf,
    pub testing_file: PathBuf,
    pub results_dir: PathBuf,
}

impl RunPaths {
    pub fn new(
        training_file: impl Into<PathBuf>,
        testing_file: impl Into<PathBuf>,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            training_file: training_file.into(),
            testing_file: testing_file.into(),
            results_dir: results_dir.into(),
        }
    }

    pub fn artifact(&self, file_name: &str) -> PathBuf {
        self.results_dir.join(file_name)
    }
}

/// Outcome of one model family: its tuned parameters and CV summary
#[derive(Debug, Clone)]
pub struct FamilyResult {
    pub best_params: Option<TrialParams>,
    pub scores: ScoreTable,
    /// Training rows the search and cross-validation saw
    pub n_rows: usize,
}

/// Held-out metrics of the final forest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldOutScores {
    pub mape: f64,
    pub score: f64,
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub comparison: ComparisonTable,
    pub ridge_params: Option<TrialParams>,
    pub forest_params: Option<TrialParams>,
    pub held_out: HeldOutScores,
    pub artifacts: Vec<PathBuf>,
    pub elapsed_secs: f64,
}

/// Loaded data plus the settings shared by every stage
#[derive(Debug)]
pub struct Experiment {
    config: RunConfig,
    paths: RunPaths,
    plan: ColumnPlan,
    train: Dataset,
    test: Dataset,
}

impl Experiment {
    /// Validate the configuration, prepare the results directory and load
    /// both datasets. Nothing is written until a later stage.
    pub fn prepare(config: RunConfig, paths: RunPaths) -> Result<Self> {
        config.validate()?;
        ensure_writable_dir(&paths.results_dir)?;

        let train = load_dataset(&paths.training_file, &config.schema)?;
        let test = load_dataset(&paths.testing_file, &config.schema)?;
        if train.n_rows() < config.cv_folds {
            return Err(PredictorError::DataError(format!(
                "training file has {} rows, fewer than {} folds",
                train.n_rows(),
                config.cv_folds
            )));
        }
        if test.n_rows() == 0 {
            return Err(PredictorError::DataError("testing file has no rows".to_string()));
        }

        let plan = ColumnPlan::from_schema(&config.schema, &config.vectorizer);
        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            steps = ?plan.step_names(),
            seed = config.seed,
            "Experiment prepared"
        );

        Ok(Self {
            config,
            paths,
            plan,
            train,
            test,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn train(&self) -> &Dataset {
        &self.train
    }

    pub fn test(&self) -> &Dataset {
        &self.test
    }

    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }

    fn kfold(&self) -> KFold {
        KFold::new(self.config.cv_folds)
    }

    /// Rows the forest search and cross-validation see
    fn forest_subset(&self) -> Dataset {
        self.train.head(self.config.forest.subset_rows)
    }

    fn summarize(&self, model: &dyn Estimator, data: &Dataset) -> Result<ScoreTable> {
        Ok(cross_validate(model, data, &self.kfold(), &default_scorers())?.summarize())
    }

    /// Mean-of-target predictor, cross-validated on the full training set
    pub fn baseline(&self) -> Result<FamilyResult> {
        let start = Instant::now();
        let scores = self.summarize(&DummyRegressor::new(), &self.train)?;
        info!(
            model = BASELINE_NAME,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Baseline cross-validated"
        );
        Ok(FamilyResult {
            best_params: None,
            scores,
            n_rows: self.train.n_rows(),
        })
    }

    pub fn ridge_pipeline(&self, alpha: f64) -> Pipeline<RidgeRegression> {
        Pipeline::new(self.plan.clone(), RidgeRegression::new(alpha))
    }

    /// Search `alpha` on the full training set, then cross-validate the winner
    pub fn ridge(&self) -> Result<FamilyResult> {
        let start = Instant::now();
        let space = SearchSpace::new().floats("alpha", &self.config.ridge.alphas);
        let study = RandomizedSearch::new(space, self.config.ridge.n_iter)
            .with_cv(self.kfold())
            .with_seed(self.config.seed)
            .run(&self.train, |params| {
                Ok(Box::new(self.ridge_pipeline(params.float("alpha")?)) as Box<dyn Estimator>)
            })?;

        let best = best_params(study.best_params())?;
        let scores = self.summarize(&self.ridge_pipeline(best.float("alpha")?), &self.train)?;
        info!(
            model = RIDGE_NAME,
            best = %format_params(&best),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Ridge tuned and cross-validated"
        );
        Ok(FamilyResult {
            best_params: Some(best),
            scores,
            n_rows: self.train.n_rows(),
        })
    }

    pub fn forest_pipeline(&self, params: &TrialParams) -> Result<Pipeline<RandomForest>> {
        let forest = RandomForest::new(self.config.forest.n_estimators)
            .with_max_depth(positive(params.int("max_depth")?, "max_depth")?)
            .with_min_samples_split(positive(params.int("min_samples_split")?, "min_samples_split")?)
            .with_min_samples_leaf(positive(params.int("min_samples_leaf")?, "min_samples_leaf")?)
            .with_bootstrap(params.bool("bootstrap")?)
            .with_random_state(self.config.seed);
        Ok(Pipeline::new(self.plan.clone(), forest))
    }

    /// Search and cross-validate on the leading training rows, then fit the
    /// winner on the full training set
    pub fn forest(&self) -> Result<(FamilyResult, Pipeline<RandomForest>)> {
        let start = Instant::now();
        let forest = &self.config.forest;
        let space = SearchSpace::new()
            .ints("max_depth", &forest.max_depth.values())
            .bools("bootstrap", &forest.bootstrap)
            .ints("min_samples_leaf", &forest.min_samples_leaf)
            .ints("min_samples_split", &forest.min_samples_split);

        let subset = self.forest_subset();
        let study = RandomizedSearch::new(space, forest.n_iter)
            .with_cv(self.kfold())
            .with_seed(self.config.seed)
            .run(&subset, |params| {
                Ok(Box::new(self.forest_pipeline(params)?) as Box<dyn Estimator>)
            })?;

        let best = best_params(study.best_params())?;
        let scores = self.summarize(&self.forest_pipeline(&best)?, &subset)?;

        let mut pipeline = self.forest_pipeline(&best)?;
        pipeline.fit(&self.train.features, &self.train.target)?;

        info!(
            model = FOREST_NAME,
            best = %format_params(&best),
            subset_rows = subset.n_rows(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Random Forest tuned, cross-validated and refit"
        );
        Ok((
            FamilyResult {
                best_params: Some(best),
                scores,
                n_rows: subset.n_rows(),
            },
            pipeline,
        ))
    }

    /// Join the three summaries and write the comparison table
    pub fn write_comparison(
        &self,
        baseline: &FamilyResult,
        ridge: &FamilyResult,
        forest: &FamilyResult,
    ) -> Result<ComparisonTable> {
        let table = ComparisonTable::inner_join(&[
            (BASELINE_NAME, &baseline.scores),
            (RIDGE_NAME, &ridge.scores),
            (FOREST_NAME, &forest.scores),
        ])?;
        let path = self.paths.artifact(MODEL_COMPARISON_FILE);
        table.write_csv(&path)?;
        verify_artifact(&path)?;
        Ok(table)
    }

    /// Predict the held-out file, write the prediction and error tables and the plot
    pub fn evaluate(&self, model: &dyn Estimator) -> Result<HeldOutScores> {
        let actual = &self.test.target;
        let predicted = model.predict(&self.test.features)?;
        let scores = held_out_scores(actual, &predicted)?;

        let predictions_path = self.paths.artifact(PREDICTION_COMPARISON_FILE);
        write_prediction_table(&predictions_path, actual, &predicted)?;
        verify_artifact(&predictions_path)?;

        let error_path = self.paths.artifact(ERROR_SCORE_FILE);
        write_error_score_table(&error_path, scores.mape, scores.score)?;
        verify_artifact(&error_path)?;

        let plot_path = self.paths.artifact(RESULTS_PLOT_FILE);
        let chart = results_chart(actual, &predicted, &self.config.plot)?;
        save_chart(&chart, &plot_path, self.config.plot.scale_factor)?;
        verify_artifact(&plot_path)?;

        info!(mape = scores.mape, score = scores.score, "Held-out evaluation written");
        Ok(scores)
    }

    /// Every stage in order
    pub fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let baseline = self.baseline()?;
        let ridge = self.ridge()?;
        let (forest, pipeline) = self.forest()?;
        let comparison = self.write_comparison(&baseline, &ridge, &forest)?;
        let held_out = self.evaluate(&pipeline)?;

        Ok(RunSummary {
            comparison,
            ridge_params: ridge.best_params,
            forest_params: forest.best_params,
            held_out,
            artifacts: self.artifact_paths(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        [
            MODEL_COMPARISON_FILE,
            PREDICTION_COMPARISON_FILE,
            ERROR_SCORE_FILE,
            RESULTS_PLOT_FILE,
        ]
        .iter()
        .map(|name| self.paths.artifact(name))
        .collect()
    }
}

/// Prepare and run in one call
pub fn run(config: RunConfig, paths: RunPaths) -> Result<RunSummary> {
    Experiment::prepare(config, paths)?.run()
}

/// MAPE and R² of held-out predictions
pub fn held_out_scores(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<HeldOutScores> {
    Ok(HeldOutScores {
        mape: mean_absolute_percentage_error(actual, predicted)?,
        score: r2_score(actual, predicted)?,
    })
}

/// Whether every artifact of a run under `results_dir` is present
pub fn verify_results(results_dir: &Path) -> Result<()> {
    for name in [
        MODEL_COMPARISON_FILE,
        PREDICTION_COMPARISON_FILE,
        ERROR_SCORE_FILE,
        RESULTS_PLOT_FILE,
    ] {
        verify_artifact(&results_dir.join(name))?;
    }
    Ok(())
}

fn best_params(params: Option<&TrialParams>) -> Result<TrialParams> {
    params
        .cloned()
        .ok_or_else(|| PredictorError::SearchError("search finished without a best trial".to_string()))
}

fn positive(value: i64, name: &str) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| PredictorError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: "must be a positive integer".to_string(),
        })
}
