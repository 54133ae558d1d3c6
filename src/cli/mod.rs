//! Rating Predictor CLI Module
//!
//! Parses the run arguments, applies them over the configuration and drives
//! the experiment stage by stage with progress output.

use anyhow::Context;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::RunConfig;
use crate::experiment::{Experiment, RunPaths, FOREST_NAME};
use crate::optimizer::format_params;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rating-predictor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compare regression models for board game ratings and evaluate the best on held-out data")]
#[command(long_about = None)]
pub struct Cli {
    /// Training CSV
    #[arg(long = "training-file", alias = "training_file")]
    pub training_file: PathBuf,

    /// Held-out testing CSV with the same columns
    #[arg(long = "testing-file", alias = "testing_file")]
    pub testing_file: PathBuf,

    /// Directory for result tables and the plot (created if missing)
    #[arg(long = "results-dir", alias = "results_dir")]
    pub results_dir: PathBuf,

    /// JSON run configuration; unset fields keep their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for search sampling and bootstrap draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for forest training
    #[arg(long = "n-jobs", alias = "n_jobs")]
    pub n_jobs: Option<usize>,
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(n_jobs) = self.n_jobs {
            config = config.with_n_jobs(n_jobs);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn paths(&self) -> RunPaths {
        RunPaths::new(&self.training_file, &self.testing_file, &self.results_dir)
    }
}

/// Size the global rayon pool; a no-op when `n_jobs` is unset
pub fn install_thread_pool(n_jobs: Option<usize>) -> anyhow::Result<()> {
    if let Some(n) = n_jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("failed to configure the worker thread pool")?;
    }
    Ok(())
}

// ─── Run ───────────────────────────────────────────────────────────────────────

pub fn cmd_run(cli: &Cli) -> anyhow::Result<()> {
    let total = Instant::now();
    let config = cli.run_config()?;
    install_thread_pool(config.n_jobs)?;

    section("Data");
    step_run("Loading training and testing files");
    let start = Instant::now();
    let experiment = Experiment::prepare(config, cli.paths())?;
    step_done(&format!(
        "{} train / {} test rows in {:.2?}",
        experiment.train().n_rows(),
        experiment.test().n_rows(),
        start.elapsed()
    ));

    section("Cross-validation");
    step_run("Baseline");
    let start = Instant::now();
    let baseline = experiment.baseline()?;
    step_done(&format!("{:.2?}", start.elapsed()));

    step_run("Ridge search");
    let start = Instant::now();
    let ridge = experiment.ridge()?;
    step_done(&format!(
        "{} in {:.2?}",
        ridge.best_params.as_ref().map(format_params).unwrap_or_default(),
        start.elapsed()
    ));

    step_run("Random Forest search");
    let start = Instant::now();
    let (forest, pipeline) = experiment.forest()?;
    step_done(&format!(
        "{} in {:.2?}",
        forest.best_params.as_ref().map(format_params).unwrap_or_default(),
        start.elapsed()
    ));

    let comparison = experiment.write_comparison(&baseline, &ridge, &forest)?;

    section("Evaluation");
    step_run(&format!("Predicting held-out scores with {}", FOREST_NAME.cyan()));
    let start = Instant::now();
    let scores = experiment.evaluate(&pipeline)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    section("Results");
    for model in comparison.model_names() {
        if let Some(r2) = comparison.get(model, "test_r2") {
            kv(model, &format!("test R² {:.3}", r2));
        }
    }
    kv("Held-out MAPE", &format!("{:.4}", scores.mape));
    kv("Held-out R²", &format!("{:.4}", scores.score));
    kv("Results dir", &experiment.paths().results_dir.display().to_string());
    kv("Time", &format!("{:.2?}", total.elapsed()));
    println!();

    Ok(())
}
