//! Pipeline configuration.
//!
//! Every field has a default (window of
//! 3 years, 80/20 split, 50 epochs of batch 4, 16 hidden units, 10-year
//! horizon), so a partial TOML document is enough:
//!
//! ```
//! use aquacast::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_toml_str(r#"
//!     water_kind = "resource"
//!
//!     [training]
//!     epochs = 20
//! "#).unwrap();
//! assert_eq!(config.training.epochs, 20);
//! assert_eq!(config.training.batch_size, 4);
//! assert_eq!(config.window_size, 3);
//! ```

use crate::core::{NumericPolicy, WaterKind};
use crate::error::{ForecastError, Result};
use crate::models::LstmConfig;
use crate::resolve::DEFAULT_THRESHOLD;
use crate::transform::{DEFAULT_TRAIN_FRACTION, DEFAULT_WINDOW_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// A match is accepted when its score is strictly above this.
    pub threshold: f64,
    /// Fail the run when any raw label stays unresolved.
    pub strict: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strict: false,
        }
    }
}

/// Training loop settings shared by every trainer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 4,
        }
    }
}

/// Full configuration of a forecasting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Steps per model input window.
    pub window_size: usize,
    /// Share of windows used for training; the rest is held out.
    pub train_fraction: f64,
    /// Horizon used by callers that do not pass one.
    pub horizon: usize,
    /// Largest accepted horizon.
    pub max_horizon: usize,
    /// Which water series is forecast.
    pub water_kind: WaterKind,
    /// Handling of unparseable values during ingestion.
    pub numeric_policy: NumericPolicy,
    pub resolver: ResolverConfig,
    pub training: TrainingConfig,
    pub model: LstmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            horizon: 10,
            max_horizon: 50,
            water_kind: WaterKind::default(),
            numeric_policy: NumericPolicy::default(),
            resolver: ResolverConfig::default(),
            training: TrainingConfig::default(),
            model: LstmConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ForecastError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ForecastError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ForecastError::Config(e.to_string()))
    }

    /// Set the random seed of the model backend.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.model.seed = Some(seed);
        self
    }

    /// Set the number of training epochs.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.training.epochs = epochs;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ForecastError::InvalidParameter(msg));

        if self.window_size == 0 {
            return invalid("window_size must be positive".to_string());
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return invalid(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            ));
        }
        if self.max_horizon == 0 {
            return invalid("max_horizon must be positive".to_string());
        }
        if self.horizon == 0 || self.horizon > self.max_horizon {
            return invalid(format!(
                "horizon must be in 1..={}, got {}",
                self.max_horizon, self.horizon
            ));
        }
        if !(0.0..=1.0).contains(&self.resolver.threshold) {
            return invalid(format!(
                "resolver threshold must be in [0, 1], got {}",
                self.resolver.threshold
            ));
        }
        if self.training.epochs == 0 {
            return invalid("epochs must be positive".to_string());
        }
        if self.training.batch_size == 0 {
            return invalid("batch_size must be positive".to_string());
        }
        if self.model.hidden_units == 0 {
            return invalid("hidden_units must be positive".to_string());
        }
        let lr = self.model.optimizer.learning_rate;
        if !(lr.is_finite() && lr > 0.0) {
            return invalid(format!("learning_rate must be positive, got {lr}"));
        }
        Ok(())
    }
}
