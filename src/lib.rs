//! xgb-bridge: safe, allocation-free scoring on the XGBoost C API.
//!
//! # Features
//!
//! - **native**: Link libxgboost and expose `inference::NativeXgb`

pub mod config;
pub mod features;
pub mod inference;
pub mod pool;
pub mod scorer;
pub mod version;

pub use config::{ConfigError, ScorerConfig};
pub use features::{fill_dense, parse_line, parse_record, FeatureError, ParseError, SparseRecord};
pub use inference::{
    Booster, BoosterState, DMatrix, MaskPolicy, NativeHandle, PredictOption, SharedBooster, XgbApi,
    XgbError, XgbResult,
};
pub use pool::{BufferPool, PoolStats, ScoringBuffers};
pub use scorer::{score_parallel, ScoreError, Scorer};
