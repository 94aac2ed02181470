//! Training, evaluation and recursive forecasting on top of a [`Trainer`].
//!
//! The engine owns no model state. [`ForecastEngine::train`] hands back a
//! [`TrainedModel`] guard that releases the model through
//! [`Trainer::dispose`] when it goes out of scope, whichever way the caller
//! leaves.

use crate::config::TrainingConfig;
use crate::core::{FeatureVector, YearValue};
use crate::error::{ForecastError, Result};
use crate::models::Trainer;
use crate::progress::{CancellationToken, EpochEvent, ProgressObserver};
use crate::transform::{InputWindow, ScalerParams, Window};
use crate::utils::stats::dispersion;
use tracing::{debug, info, trace, warn};

/// A fitted model bound to the trainer that produced it.
pub struct TrainedModel<'a, T: Trainer> {
    trainer: &'a T,
    model: Option<T::Model>,
    final_loss: f64,
    epochs: usize,
}

impl<'a, T: Trainer> TrainedModel<'a, T> {
    /// Predict the next scaled target for a window.
    pub fn predict(&self, window: &[FeatureVector]) -> f64 {
        self.model
            .as_ref()
            .map_or(f64::NAN, |model| self.trainer.predict(model, window))
    }

    /// Loss reported by the last epoch.
    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    /// Number of completed epochs.
    pub fn epochs(&self) -> usize {
        self.epochs
    }
}

impl<T: Trainer> Drop for TrainedModel<'_, T> {
    fn drop(&mut self) {
        if let Some(model) = self.model.take() {
            self.trainer.dispose(model);
        }
    }
}

impl<T: Trainer> std::fmt::Debug for TrainedModel<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("trainer", &self.trainer.name())
            .field("final_loss", &self.final_loss)
            .field("epochs", &self.epochs)
            .finish()
    }
}

/// Train, evaluate and forecast with a fixed training schedule.
#[derive(Debug, Clone)]
pub struct ForecastEngine<T> {
    trainer: T,
    training: TrainingConfig,
}

impl<T: Trainer> ForecastEngine<T> {
    pub fn new(trainer: T, training: TrainingConfig) -> Self {
        Self { trainer, training }
    }

    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    pub fn training(&self) -> &TrainingConfig {
        &self.training
    }

    /// Fit a fresh model on the training windows.
    ///
    /// After every epoch the loss is checked for finiteness, the event is
    /// passed to `observer`, and `cancel` is consulted. A non-finite loss
    /// stops with [`ForecastError::TrainingDiverged`] before the observer
    /// sees it; a set token stops with [`ForecastError::Cancelled`].
    pub fn train(
        &self,
        windows: &[Window],
        observer: &mut dyn ProgressObserver,
        cancel: Option<&CancellationToken>,
    ) -> Result<TrainedModel<'_, T>> {
        if windows.is_empty() {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }

        debug!(
            trainer = self.trainer.name(),
            windows = windows.len(),
            epochs = self.training.epochs,
            batch_size = self.training.batch_size,
            "training started"
        );

        let mut final_loss = f64::NAN;
        let mut epochs = 0;
        let mut on_epoch = |event: EpochEvent| -> Result<()> {
            if !event.loss.is_finite() {
                warn!(epoch = event.epoch, loss = event.loss, "training diverged");
                return Err(ForecastError::TrainingDiverged {
                    epoch: event.epoch,
                    loss: event.loss,
                });
            }
            trace!(epoch = event.epoch, loss = event.loss, "epoch complete");
            observer.on_epoch(event);
            final_loss = event.loss;
            epochs = event.epoch + 1;

            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(epoch = event.epoch, "training cancelled");
                return Err(ForecastError::Cancelled { epoch: event.epoch });
            }
            Ok(())
        };

        let model = self.trainer.fit(windows, &self.training, &mut on_epoch)?;
        info!(epochs, final_loss, "training finished");

        Ok(TrainedModel {
            trainer: &self.trainer,
            model: Some(model),
            final_loss,
            epochs,
        })
    }

    /// Sample standard deviation of the absolute residuals on held-out
    /// windows, in scaled units. Fewer than two windows give 0.
    pub fn evaluate(&self, model: &TrainedModel<'_, T>, windows: &[Window]) -> f64 {
        let residuals: Vec<f64> = windows
            .iter()
            .map(|w| (w.target - model.predict(&w.features)).abs())
            .collect();
        dispersion(&residuals)
    }

    /// Forecast `horizon` years after `last_year` by feeding each prediction
    /// back as the newest step.
    ///
    /// Temperature and population are held at the values of the window's
    /// newest step. Predictions are mapped back to target units with
    /// `water`.
    pub fn forecast(
        &self,
        model: &TrainedModel<'_, T>,
        last_window: &InputWindow,
        last_year: i32,
        horizon: usize,
        water: &ScalerParams,
    ) -> Result<Vec<YearValue>> {
        let mut window = last_window.clone();
        let mut years = Vec::with_capacity(horizon);
        let mut scaled = Vec::with_capacity(horizon);

        for step in 1..=horizon {
            let year = i32::try_from(step)
                .ok()
                .and_then(|offset| last_year.checked_add(offset))
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!(
                        "horizon {horizon} overflows the year range"
                    ))
                })?;

            let predicted = model.predict(window.steps());
            if !predicted.is_finite() {
                return Err(ForecastError::ComputationError(format!(
                    "non-finite prediction for year {year}"
                )));
            }
            years.push(year);
            scaled.push(predicted);
            window = window.advance(window.next_step(predicted));
        }

        let series = years
            .into_iter()
            .zip(water.inverse_transform(&scaled))
            .map(|(year, value)| YearValue::new(year, value))
            .collect();

        debug!(horizon, last_year, "forecast complete");
        Ok(series)
    }
}
