//! Safe bindings to the XGBoost C inference API.
//!
//! ## Handles
//! - `NativeHandle` - Owned foreign handle with at-most-once release
//! - `Booster` - Loaded model; create, load, predict, free
//! - `DMatrix` - Dense input matrix borrowing a caller buffer
//!
//! ## Sharing
//! - `SharedBooster` - One booster serialized behind a mutex
//!
//! With the `native` feature, `NativeXgb` is the linked libxgboost.

mod booster;
mod bridge;
mod dmatrix;
mod error;
mod handle;
mod shared;
mod xgb_ffi;

#[cfg(test)]
pub(crate) mod fake;

pub use booster::{Booster, BoosterState, MaskPolicy, PredictOption};
pub use dmatrix::DMatrix;
pub use error::{XgbError, XgbResult};
pub use handle::{BoosterKind, HandleKind, MatrixKind, NativeHandle};
pub use shared::SharedBooster;
pub use xgb_ffi::{BstUlong, RawHandle, XgbApi};

#[cfg(feature = "native")]
pub use xgb_ffi::NativeXgb;
