//! Safe Rust wrapper for an XGBoost booster.

use super::bridge::copy_prediction;
use super::dmatrix::DMatrix;
use super::error::{XgbError, XgbResult};
use super::handle::{BoosterKind, NativeHandle};
use super::xgb_ffi::{error_detail, BstUlong, RawHandle, XgbApi};
use serde::Deserialize;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prediction output selected by `option_mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictOption {
    /// Transformed score (e.g. probability)
    Normal,
    /// Untransformed margin
    OutputMargin,
    /// Leaf index per tree
    LeafIndex,
    /// Per-feature contributions plus bias
    Contributions,
}

impl PredictOption {
    pub fn mask(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::OutputMargin => 1,
            Self::LeafIndex => 2,
            Self::Contributions => 4,
        }
    }

    pub fn from_mask(mask: i32) -> Option<Self> {
        match mask {
            0 => Some(Self::Normal),
            1 => Some(Self::OutputMargin),
            2 => Some(Self::LeafIndex),
            4 => Some(Self::Contributions),
            _ => None,
        }
    }
}

/// Whether `predict` checks `option_mask` before calling the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskPolicy {
    /// Reject anything other than 0, 1, 2 or 4.
    #[default]
    Validate,
    /// Forward the mask unchecked; the library decides.
    PassThrough,
}

/// Booster lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoosterState {
    Created,
    Loaded,
    /// A load failed; only `free` is meaningful.
    Failed(PathBuf),
    Freed,
}

/// An XGBoost learner holding one loaded model.
///
/// `Created -> Loaded -> predict* -> Freed`. Every prediction leaves the
/// library's output array invalid at the next library call, so `predict`
/// copies it out before returning. Not `Sync`: share through
/// [`SharedBooster`](super::SharedBooster) or give each thread its own.
#[derive(Debug)]
pub struct Booster {
    handle: NativeHandle<BoosterKind>,
    state: BoosterState,
    mask_policy: MaskPolicy,
}

impl Booster {
    /// Allocate an empty learner with no cached training matrices.
    pub fn create(api: Arc<dyn XgbApi>) -> XgbResult<Self> {
        let mut raw: RawHandle = std::ptr::null_mut();
        let ret = unsafe { api.booster_create(std::ptr::null(), 0, &mut raw) };

        if ret != 0 {
            return Err(XgbError::CreateBooster {
                detail: error_detail(api.as_ref()),
            });
        }

        debug!("Created booster {:p}", raw);
        Ok(Self {
            handle: unsafe { NativeHandle::from_raw(api, raw) },
            state: BoosterState::Created,
            mask_policy: MaskPolicy::default(),
        })
    }

    /// Create a booster and load `path` into it.
    ///
    /// On load failure the booster is freed before the error is returned.
    pub fn from_file(api: Arc<dyn XgbApi>, path: impl AsRef<Path>) -> XgbResult<Self> {
        let mut booster = Self::create(api)?;
        booster.load_model(path)?;
        Ok(booster)
    }

    pub fn with_mask_policy(mut self, policy: MaskPolicy) -> Self {
        self.mask_policy = policy;
        self
    }

    pub fn state(&self) -> &BoosterState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == BoosterState::Loaded
    }

    /// The API this booster was created through.
    pub fn api(&self) -> Arc<dyn XgbApi> {
        self.handle.api_arc().clone()
    }

    /// Load serialized model weights from `path`.
    ///
    /// Only a freshly created booster accepts a model. XGBoost reports a
    /// missing file, a corrupt file and a version mismatch the same way; all
    /// of them surface as `LoadModel` and leave the booster unusable until it
    /// is freed.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> XgbResult<()> {
        let path = path.as_ref();
        let raw = self.handle.raw()?;
        match &self.state {
            BoosterState::Created => {}
            BoosterState::Loaded => return Err(XgbError::AlreadyLoaded),
            BoosterState::Failed(failed) => return Err(XgbError::Unusable { path: failed.clone() }),
            BoosterState::Freed => return Err(XgbError::HandleReleased { kind: "Booster" }),
        }
        let c_path = model_path_cstring(path)?;

        // c_path lives until the end of this scope, past the foreign call
        let ret = unsafe { self.handle.api().booster_load_model(raw, c_path.as_ptr()) };

        if ret != 0 {
            self.state = BoosterState::Failed(path.to_path_buf());
            return Err(XgbError::LoadModel {
                path: path.to_path_buf(),
                detail: error_detail(self.handle.api()),
            });
        }

        info!("Loaded model from {}", path.display());
        self.state = BoosterState::Loaded;
        Ok(())
    }

    /// Run inference on `matrix` and copy the output into `result`.
    ///
    /// `tree_limit == 0` uses every tree. `matrix` must come from the same
    /// [`XgbApi`] instance as the booster. Returns the number of values
    /// written; on error the contents of `result` are unspecified.
    ///
    /// # Panics
    ///
    /// Panics if the library produces more values than `result` can hold.
    pub fn predict(
        &mut self,
        matrix: &DMatrix<'_>,
        option_mask: i32,
        tree_limit: u32,
        result: &mut [f32],
    ) -> XgbResult<usize> {
        let raw = self.handle.raw()?;
        match &self.state {
            BoosterState::Loaded => {}
            BoosterState::Created => return Err(XgbError::NotLoaded),
            BoosterState::Failed(path) => return Err(XgbError::Unusable { path: path.clone() }),
            BoosterState::Freed => return Err(XgbError::HandleReleased { kind: "Booster" }),
        }
        if self.mask_policy == MaskPolicy::Validate && PredictOption::from_mask(option_mask).is_none() {
            return Err(XgbError::InvalidOptionMask(option_mask));
        }
        if !Arc::ptr_eq(self.handle.api_arc(), matrix.api_arc()) {
            return Err(XgbError::ForeignMatrix);
        }
        let dmat = matrix.raw()?;

        let mut out_len: BstUlong = 0;
        let mut out_result: *const f32 = std::ptr::null();
        let ret = unsafe {
            self.handle.api().booster_predict(
                raw,
                dmat,
                option_mask,
                tree_limit,
                &mut out_len,
                &mut out_result,
            )
        };

        if ret != 0 {
            return Err(XgbError::Predict {
                detail: error_detail(self.handle.api()),
            });
        }

        // out_result dies at the next library call; copy it out now
        let written = unsafe { copy_prediction(out_result, out_len as usize, result) };
        Ok(written)
    }

    /// Predict with a named output mode.
    pub fn predict_with(
        &mut self,
        matrix: &DMatrix<'_>,
        option: PredictOption,
        tree_limit: u32,
        result: &mut [f32],
    ) -> XgbResult<usize> {
        self.predict(matrix, option.mask(), tree_limit, result)
    }

    /// Release the model. Terminal: every later call fails.
    ///
    /// A failing `XGBoosterFree` is reported but the handle is still
    /// considered released, so there is nothing to retry.
    pub fn free(&mut self) -> XgbResult<()> {
        let result = self.handle.release();
        if result.is_ok() {
            info!("Freed booster");
        }
        self.state = BoosterState::Freed;
        result
    }
}

/// Path bytes exactly as the OS holds them.
#[cfg(unix)]
fn model_path_cstring(path: &Path) -> XgbResult<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).map_err(|_| XgbError::InvalidModelPath)
}

#[cfg(not(unix))]
fn model_path_cstring(path: &Path) -> XgbResult<CString> {
    let path = path.to_str().ok_or(XgbError::InvalidModelPath)?;
    CString::new(path).map_err(|_| XgbError::InvalidModelPath)
}
