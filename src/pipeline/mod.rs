//! End-to-end forecasting for one entity.
//!
//! [`PipelineOrchestrator`] chains name resolution, fusion, scaling,
//! windowing, training, evaluation and recursive forecasting. It holds only
//! configuration, so one orchestrator can serve concurrent calls and every
//! call retrains from scratch.
//!
//! # Example
//! ```
//! use aquacast::config::PipelineConfig;
//! use aquacast::core::{RawRecord, SourceTag};
//! use aquacast::fusion::RawDatasets;
//! use aquacast::pipeline::PipelineOrchestrator;
//!
//! let records = (2000..2012).flat_map(|year| {
//!     let t = (year - 2000) as f64;
//!     vec![
//!         RawRecord::new("Chad", year, 27.0 + 0.1 * t, SourceTag::Temperature),
//!         RawRecord::new("Chad", year, 100.0 + 5.0 * t, SourceTag::Usage),
//!         RawRecord::new("Chad", year, 8e6 + 2e5 * t, SourceTag::Population),
//!     ]
//! });
//! let datasets = RawDatasets::from_records(records);
//!
//! let config = PipelineConfig::default().with_seed(42).with_epochs(5);
//! let orchestrator = PipelineOrchestrator::new(config).unwrap();
//! let result = orchestrator.run_forecast("Chad", &datasets, 3).unwrap();
//!
//! assert_eq!(result.forecast_series.len(), 3);
//! assert_eq!(result.forecast_series[0].year, 2012);
//! ```

use crate::config::PipelineConfig;
use crate::core::{ForecastResult, FusedRecord, YearValue};
use crate::engine::ForecastEngine;
use crate::error::{ForecastError, Result};
use crate::fusion::{DatasetFuser, RawDatasets};
use crate::models::{LstmTrainer, Trainer};
use crate::progress::{CancellationToken, NoProgress, ProgressObserver};
use crate::resolve::{NameMapping, NameResolver};
use crate::transform::{
    build_windows, split, FeatureScalers, InputWindow, NormalizedRecord, Window,
};
use tracing::{debug, info};

/// Intermediate products of a run, up to and including the split.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    /// Label resolution, when the datasets carried canonical labels.
    pub mapping: Option<NameMapping>,
    pub fused: Vec<FusedRecord>,
    pub scalers: FeatureScalers,
    pub normalized: Vec<NormalizedRecord>,
    pub train: Vec<Window>,
    pub test: Vec<Window>,
}

impl PreparedSeries {
    /// Total number of windows before the split.
    pub fn window_count(&self) -> usize {
        self.train.len() + self.test.len()
    }

    /// Year of the newest fused record.
    pub fn last_year(&self) -> Option<i32> {
        self.fused.last().map(|r| r.year)
    }

    /// Observed target values by year.
    pub fn historical_series(&self) -> Vec<YearValue> {
        self.fused
            .iter()
            .map(|r| YearValue::new(r.year, r.water))
            .collect()
    }
}

/// Single entry point for producing a [`ForecastResult`].
#[derive(Debug, Clone)]
pub struct PipelineOrchestrator<T = LstmTrainer> {
    config: PipelineConfig,
    engine: ForecastEngine<T>,
}

impl PipelineOrchestrator<LstmTrainer> {
    /// Create an orchestrator with the LSTM backend described by
    /// `config.model`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let trainer = LstmTrainer::new(config.model.clone());
        Self::with_trainer(config, trainer)
    }
}

impl Default for PipelineOrchestrator<LstmTrainer> {
    fn default() -> Self {
        let config = PipelineConfig::default();
        let trainer = LstmTrainer::new(config.model.clone());
        Self {
            engine: ForecastEngine::new(trainer, config.training),
            config,
        }
    }
}

impl<T: Trainer> PipelineOrchestrator<T> {
    /// Create an orchestrator with a custom trainer backend.
    pub fn with_trainer(config: PipelineConfig, trainer: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: ForecastEngine::new(trainer, config.training),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &ForecastEngine<T> {
        &self.engine
    }

    /// Resolve, fuse, scale, window and split without training.
    pub fn prepare(&self, entity_id: &str, datasets: &RawDatasets) -> Result<PreparedSeries> {
        let window_size = self.config.window_size;

        let mapping = if datasets.needs_alignment() {
            let resolver = NameResolver::new(self.config.resolver.threshold);
            let mapping = resolver.resolve(&datasets.raw_labels(), &datasets.canonical_labels);
            if self.config.resolver.strict {
                mapping.require_all()?;
            }
            Some(mapping)
        } else {
            None
        };

        let fuser = DatasetFuser::new(self.config.water_kind);
        let fused = fuser.fuse_datasets(entity_id, datasets, mapping.as_ref());
        if fused.len() <= window_size {
            return Err(ForecastError::InsufficientData {
                needed: window_size + 1,
                got: fused.len(),
            });
        }

        let scalers = FeatureScalers::fit(&fused)?;
        let normalized = scalers.normalize(&fused);
        let windows = build_windows(&normalized, window_size)?;
        let (train, test) = split(&windows, self.config.train_fraction)?;

        debug!(
            entity_id,
            fused = fused.len(),
            train = train.len(),
            test = test.len(),
            "series prepared"
        );

        Ok(PreparedSeries {
            mapping,
            fused,
            scalers,
            normalized,
            train,
            test,
        })
    }

    /// Run the full pipeline without progress reporting.
    pub fn run_forecast(
        &self,
        entity_id: &str,
        datasets: &RawDatasets,
        horizon: usize,
    ) -> Result<ForecastResult> {
        self.run_forecast_with(entity_id, datasets, horizon, &mut NoProgress, None)
    }

    /// Run the full pipeline, reporting every epoch to `observer` and
    /// stopping between epochs once `cancel` is set.
    pub fn run_forecast_with(
        &self,
        entity_id: &str,
        datasets: &RawDatasets,
        horizon: usize,
        observer: &mut dyn ProgressObserver,
        cancel: Option<&CancellationToken>,
    ) -> Result<ForecastResult> {
        self.check_horizon(horizon)?;
        let prepared = self.prepare(entity_id, datasets)?;

        if prepared.train.is_empty() {
            // Smallest series whose split leaves one training window.
            let windows_needed = (1.0 / self.config.train_fraction).ceil() as usize;
            return Err(ForecastError::InsufficientData {
                needed: self.config.window_size + windows_needed,
                got: prepared.fused.len(),
            });
        }

        let model = self.engine.train(&prepared.train, observer, cancel)?;
        let std_error = self.engine.evaluate(&model, &prepared.test);

        let last_window = InputWindow::latest(&prepared.normalized, self.config.window_size)?;
        let last_year = prepared.last_year().ok_or(ForecastError::EmptyData)?;
        let forecast_series = self.engine.forecast(
            &model,
            &last_window,
            last_year,
            horizon,
            &prepared.scalers.water,
        )?;

        let result = ForecastResult {
            entity_id: entity_id.to_string(),
            historical_series: prepared.historical_series(),
            forecast_series,
            std_error,
            std_error_target_units: std_error * prepared.scalers.water.std,
            final_loss: model.final_loss(),
        };
        info!(
            entity_id,
            horizon,
            final_loss = result.final_loss,
            std_error = result.std_error,
            "forecast complete"
        );
        Ok(result)
    }

    fn check_horizon(&self, horizon: usize) -> Result<()> {
        if horizon == 0 || horizon > self.config.max_horizon {
            return Err(ForecastError::InvalidParameter(format!(
                "horizon must be in 1..={}, got {horizon}",
                self.config.max_horizon
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "async")]
impl<T> PipelineOrchestrator<T>
where
    T: Trainer + Clone + Send + Sync + 'static,
{
    /// Run the pipeline on Tokio's blocking pool.
    ///
    /// Progress, if wanted, streams through `progress`; the matching
    /// [`ProgressReceiver`](crate::progress::ProgressReceiver) ends once the
    /// run is over.
    ///
    /// Dropping the returned future before it completes (for example under
    /// `tokio::time::timeout`) cancels `cancel`, or an internal token when
    /// none was given, so the blocking run stops at the next epoch boundary.
    pub async fn run_forecast_async(
        &self,
        entity_id: impl Into<String>,
        datasets: RawDatasets,
        horizon: usize,
        progress: Option<crate::progress::ProgressSender>,
        cancel: Option<CancellationToken>,
    ) -> Result<ForecastResult> {
        let orchestrator = self.clone();
        let entity_id = entity_id.into();
        let token = cancel.unwrap_or_default();
        let guard = CancelOnDrop::new(token.clone());

        let result = tokio::task::spawn_blocking(move || {
            let mut observer: Box<dyn ProgressObserver> = match progress {
                Some(tx) => Box::new(tx),
                None => Box::new(NoProgress),
            };
            orchestrator.run_forecast_with(
                &entity_id,
                &datasets,
                horizon,
                observer.as_mut(),
                Some(&token),
            )
        })
        .await;
        guard.disarm();

        result.map_err(|e| ForecastError::ComputationError(format!("forecast task failed: {e}")))?
    }
}

/// Cancels its token when dropped unless disarmed first.
#[cfg(feature = "async")]
struct CancelOnDrop {
    token: Option<CancellationToken>,
}

#[cfg(feature = "async")]
impl CancelOnDrop {
    fn new(token: CancellationToken) -> Self {
        Self { token: Some(token) }
    }

    fn disarm(mut self) {
        self.token = None;
    }
}

#[cfg(feature = "async")]
impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            debug!("forecast future dropped, cancelling training");
            token.cancel();
        }
    }
}
