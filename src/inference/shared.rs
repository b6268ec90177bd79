//! A booster shared between threads behind a single lock.

use super::booster::Booster;
use super::dmatrix::DMatrix;
use super::error::XgbResult;
use parking_lot::Mutex;

/// Serializes every library call made on behalf of one booster.
///
/// The lock covers matrix creation, prediction and matrix free together:
/// the prediction array is only valid until the next library call from
/// any thread, so those three steps must not interleave with another
/// request's.
#[derive(Debug)]
pub struct SharedBooster {
    inner: Mutex<Booster>,
}

impl SharedBooster {
    pub fn new(booster: Booster) -> Self {
        Self {
            inner: Mutex::new(booster),
        }
    }

    /// Score `rows` rows of `features` and copy the output into `result`.
    #[allow(clippy::too_many_arguments)]
    pub fn predict_dense(
        &self,
        features: &[f32],
        rows: usize,
        cols: usize,
        missing: f32,
        option_mask: i32,
        tree_limit: u32,
        result: &mut [f32],
    ) -> XgbResult<usize> {
        let mut booster = self.inner.lock();
        let matrix = DMatrix::from_dense(booster.api(), features, rows, cols, missing)?;
        let written = booster.predict(&matrix, option_mask, tree_limit, result)?;
        matrix.free()?;
        Ok(written)
    }

    /// Free the underlying booster.
    pub fn free(&self) -> XgbResult<()> {
        self.inner.lock().free()
    }

    pub fn into_inner(self) -> Booster {
        self.inner.into_inner()
    }
}
