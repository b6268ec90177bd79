use std::path::PathBuf;
use thiserror::Error;

/// Errors from the XGBoost binding layer.
///
/// The six foreign-call variants carry the library's `XGBGetLastError`
/// text; the rest are detected by the wrapper before anything reaches the
/// library.
#[derive(Error, Debug)]
pub enum XgbError {
    #[error("Failed to create booster: {detail}")]
    CreateBooster { detail: String },

    #[error("Failed to load model from {}: {detail}", path.display())]
    LoadModel { path: PathBuf, detail: String },

    #[error("Failed to create {rows}x{cols} dense matrix: {detail}")]
    CreateMatrix {
        rows: usize,
        cols: usize,
        detail: String,
    },

    #[error("Predict failed: {detail}")]
    Predict { detail: String },

    #[error("Failed to free matrix: {detail}")]
    FreeMatrix { detail: String },

    #[error("Failed to free booster: {detail}")]
    FreeBooster { detail: String },

    #[error("{kind} handle already released")]
    HandleReleased { kind: &'static str },

    #[error("No model loaded")]
    NotLoaded,

    #[error("Model already loaded")]
    AlreadyLoaded,

    #[error("Booster unusable after failed load of {}", path.display())]
    Unusable { path: PathBuf },

    #[error("Model path cannot be passed to XGBoost (interior nul or non-UTF-8)")]
    InvalidModelPath,

    #[error("Invalid prediction option mask: {0}")]
    InvalidOptionMask(i32),

    #[error("Matrix was created through a different XGBoost API than the booster")]
    ForeignMatrix,

    #[error("Buffer of {len} values cannot hold a {rows}x{cols} matrix")]
    ShapeMismatch { len: usize, rows: usize, cols: usize },
}

pub type XgbResult<T> = Result<T, XgbError>;
