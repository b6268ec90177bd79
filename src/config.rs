//! Scoring configuration.
//!
//! Loaded from TOML (every field optional) and overridden by CLI flags.

use crate::inference::{MaskPolicy, PredictOption};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a [`Scorer`](crate::scorer::Scorer).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Path to the serialized XGBoost model
    pub model_path: PathBuf,
    /// Dense feature width expected by the model (default: 46)
    pub num_features: usize,
    /// Values produced per row (default: 1)
    pub num_outputs: usize,
    /// Sentinel written to unset features (default: 0.0)
    pub missing: f32,
    /// Prediction mode passed to XGBoosterPredict (default: 0)
    pub option_mask: i32,
    /// Trees used per prediction, 0 for all (default: 0)
    pub tree_limit: u32,
    pub mask_policy: MaskPolicy,
    /// Buffers pre-allocated per pool (default: 1)
    pub pool_capacity: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("0004.model"),
            num_features: 46,
            num_outputs: 1,
            missing: 0.0,
            option_mask: PredictOption::Normal.mask(),
            tree_limit: 0,
            mask_policy: MaskPolicy::Validate,
            pool_capacity: 1,
        }
    }
}

impl ScorerConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_num_features(mut self, num_features: usize) -> Self {
        self.num_features = num_features;
        self
    }

    pub fn with_num_outputs(mut self, num_outputs: usize) -> Self {
        self.num_outputs = num_outputs;
        self
    }

    pub fn with_missing(mut self, missing: f32) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_option_mask(mut self, option_mask: i32) -> Self {
        self.option_mask = option_mask;
        self
    }

    pub fn with_tree_limit(mut self, tree_limit: u32) -> Self {
        self.tree_limit = tree_limit;
        self
    }

    pub fn with_mask_policy(mut self, mask_policy: MaskPolicy) -> Self {
        self.mask_policy = mask_policy;
        self
    }

    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_features == 0 {
            return Err(ConfigError::Invalid("num_features must be positive".to_string()));
        }
        if self.num_outputs == 0 {
            return Err(ConfigError::Invalid("num_outputs must be positive".to_string()));
        }
        if self.mask_policy == MaskPolicy::Validate
            && PredictOption::from_mask(self.option_mask).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "option_mask {} is not one of 0, 1, 2, 4",
                self.option_mask
            )));
        }
        if self.option_mask == PredictOption::Contributions.mask()
            && self.num_outputs < self.num_features + 1
        {
            return Err(ConfigError::Invalid(format!(
                "option_mask 4 produces {} values per row but num_outputs is {}",
                self.num_features + 1,
                self.num_outputs
            )));
        }
        Ok(())
    }
}
