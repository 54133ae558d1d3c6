//! Rating Predictor - Main Entry Point
//!
//! Trains and compares regression models on a training CSV, then evaluates
//! the chosen model on a testing CSV.

use clap::Parser;
use rating_predictor::cli::{cmd_run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rating_predictor=info".into()),
        )
        .init();

    let cli = Cli::parse();
    cmd_run(&cli)
}
