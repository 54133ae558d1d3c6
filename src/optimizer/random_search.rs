//! Randomized search over a discrete grid, scored by cross-validation

use super::search_space::{format_params, SearchSpace, TrialParams};
use super::study::{Study, TrialResult};
use crate::data::Dataset;
use crate::error::{PredictorError, Result};
use crate::training::{cross_validate, Estimator, KFold, Scorer};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Draws `n_iter` distinct grid points and keeps the one with the best mean
/// cross-validated score
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    space: SearchSpace,
    n_iter: usize,
    cv: KFold,
    scorer: Scorer,
    seed: u64,
}

impl RandomizedSearch {
    pub fn new(space: SearchSpace, n_iter: usize) -> Self {
        Self {
            space,
            n_iter,
            cv: KFold::new(5),
            scorer: Scorer::R2,
            seed: 42,
        }
    }

    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Candidate configurations in evaluation order.
    ///
    /// A grid no larger than the budget is walked in full, in grid order.
    pub fn candidates(&self) -> Result<Vec<TrialParams>> {
        let grid_size = self.space.grid_size();
        if grid_size == 0 {
            return Err(PredictorError::SearchError("search space is empty".to_string()));
        }
        if self.n_iter == 0 {
            return Err(PredictorError::SearchError("n_iter must be positive".to_string()));
        }

        let positions: Vec<usize> = if grid_size <= self.n_iter {
            if grid_size < self.n_iter {
                warn!(
                    n_iter = self.n_iter,
                    grid_size,
                    "Search budget exceeds grid size; evaluating every grid point"
                );
            }
            (0..grid_size).collect()
        } else {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            index::sample(&mut rng, grid_size, self.n_iter).into_vec()
        };

        positions.into_iter().map(|i| self.space.grid_point(i)).collect()
    }

    /// Evaluate every candidate built by `build` on `data`
    pub fn run<F>(&self, data: &Dataset, build: F) -> Result<Study>
    where
        F: Fn(&TrialParams) -> Result<Box<dyn Estimator>>,
    {
        let start = Instant::now();
        let candidates = self.candidates()?;
        let mut study = Study::new();

        for (trial_id, params) in candidates.into_iter().enumerate() {
            let trial_start = Instant::now();
            let estimator = build(&params)?;
            let results = cross_validate(estimator.as_ref(), data, &self.cv, &[self.scorer])?;
            let value = results.mean_test_score(self.scorer.name()).ok_or_else(|| {
                PredictorError::SearchError(format!("no test_{} scores", self.scorer.name()))
            })?;

            debug!(
                trial = trial_id,
                params = %format_params(&params),
                value,
                "Search trial done"
            );

            study.add_trial(TrialResult {
                trial_id,
                params,
                value,
                duration_secs: trial_start.elapsed().as_secs_f64(),
            });
        }

        study.total_duration_secs = start.elapsed().as_secs_f64();

        let best = study.best_trial().ok_or_else(|| {
            PredictorError::SearchError("no trial produced a finite score".to_string())
        })?;
        info!(
            trials = study.trials.len(),
            best_params = %format_params(&best.params),
            best_score = best.value,
            elapsed_s = study.total_duration_secs,
            "Search finished"
        );

        Ok(study)
    }
}
