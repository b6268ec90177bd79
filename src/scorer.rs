//! Allocation-free scoring loop over pooled buffers.
//!
//! Each request runs: acquire buffers -> re-zero and fill features ->
//! borrow them into a `DMatrix` -> predict into the result buffer -> free
//! the matrix -> release both buffers.

use crate::config::{ConfigError, ScorerConfig};
use crate::features::{fill_dense, parse_line, FeatureError, ParseError, SparseRecord};
use crate::inference::{Booster, DMatrix, SharedBooster, XgbApi, XgbError};
use crate::pool::{BufferPool, ScoringBuffers};
use rayon::prelude::*;
use std::io::BufRead;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error(transparent)]
    Xgb(#[from] XgbError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start worker pool: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
}

/// A loaded booster plus the buffers one worker needs to score with it.
#[derive(Debug)]
pub struct Scorer {
    booster: Booster,
    buffers: ScoringBuffers,
    config: ScorerConfig,
}

impl Scorer {
    /// Load `config.model_path` and pre-allocate the pools.
    pub fn new(api: Arc<dyn XgbApi>, config: ScorerConfig) -> Result<Self, ScoreError> {
        config.validate()?;
        let booster = Booster::from_file(api, &config.model_path)?;
        Ok(Self::from_booster(booster, config))
    }

    pub fn from_booster(booster: Booster, config: ScorerConfig) -> Self {
        let booster = booster.with_mask_policy(config.mask_policy);
        let buffers = ScoringBuffers::new(
            config.num_features,
            config.num_outputs,
            config.pool_capacity,
        );
        Self {
            booster,
            buffers,
            config,
        }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn buffers(&self) -> &ScoringBuffers {
        &self.buffers
    }

    /// Score one row of 1-based sparse features and hand the output to `f`.
    ///
    /// The slice passed to `f` is a pooled buffer; copy out anything that
    /// must outlive the call.
    pub fn score<R>(
        &mut self,
        features: &[(u32, f32)],
        f: impl FnOnce(&[f32]) -> R,
    ) -> Result<R, ScoreError> {
        let mut dense = self.buffers.features.acquire();
        let mut result = self.buffers.results.acquire();

        let outcome = predict_row(
            &mut self.booster,
            &self.config,
            &mut dense,
            &mut result,
            features,
        );
        let ret = outcome.map(|n| f(&result[..n]));

        self.buffers.features.release(dense);
        self.buffers.results.release(result);
        ret
    }

    /// Convenience wrapper that copies the output into a new `Vec`.
    pub fn score_to_vec(&mut self, features: &[(u32, f32)]) -> Result<Vec<f32>, ScoreError> {
        self.score(features, |out| out.to_vec())
    }

    /// Score every record in `reader`, calling `on_score` for each.
    ///
    /// Blank and comment-only lines are skipped. Returns the number of
    /// records scored; stops at the first error.
    pub fn score_lines<B: BufRead>(
        &mut self,
        reader: B,
        mut on_score: impl FnMut(&SparseRecord, &[f32]),
    ) -> Result<usize, ScoreError> {
        let mut scored = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let Some(record) = parse_line(&line, i + 1)? else {
                continue;
            };
            self.score(&record.features, |out| on_score(&record, out))?;
            scored += 1;
        }
        debug!(
            "Scored {} records; feature pool {:?}, result pool {:?}",
            scored,
            self.buffers.features.stats(),
            self.buffers.results.stats()
        );
        Ok(scored)
    }

    /// Free the booster. The scorer cannot be used afterwards.
    pub fn free(&mut self) -> Result<(), ScoreError> {
        self.booster.free()?;
        Ok(())
    }
}

fn predict_row(
    booster: &mut Booster,
    config: &ScorerConfig,
    dense: &mut [f32],
    result: &mut [f32],
    features: &[(u32, f32)],
) -> Result<usize, ScoreError> {
    fill_dense(dense, features, config.missing)?;

    let matrix = DMatrix::from_dense(booster.api(), dense, 1, config.num_features, config.missing)?;
    let written = booster.predict(&matrix, config.option_mask, config.tree_limit, result)?;
    matrix.free()?;
    Ok(written)
}

/// Score `records` on `workers` threads through one serialized booster.
///
/// Each rayon worker gets its own buffer pools; only the booster is
/// shared. Results come back in input order.
pub fn score_parallel(
    shared: &SharedBooster,
    config: &ScorerConfig,
    records: &[SparseRecord],
    workers: usize,
) -> Result<Vec<Result<Vec<f32>, ScoreError>>, ScoreError> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    info!("Scoring {} records on {} workers", records.len(), pool.current_num_threads());

    let results = pool.install(|| {
        records
            .par_iter()
            .map_init(
                || {
                    (
                        BufferPool::new(config.num_features),
                        BufferPool::new(config.num_outputs),
                    )
                },
                |(features, outputs), record| {
                    let mut dense = features.acquire();
                    let mut result = outputs.acquire();

                    let outcome = fill_dense(&mut dense, &record.features, config.missing)
                        .map_err(ScoreError::from)
                        .and_then(|_| {
                            shared
                                .predict_dense(
                                    &dense,
                                    1,
                                    config.num_features,
                                    config.missing,
                                    config.option_mask,
                                    config.tree_limit,
                                    &mut result,
                                )
                                .map_err(ScoreError::from)
                        })
                        .map(|n| result[..n].to_vec());

                    features.release(dense);
                    outputs.release(result);
                    outcome
                },
            )
            .collect()
    });
    Ok(results)
}
