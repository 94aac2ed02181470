//! Trainer trait defining the seam between the pipeline and a model backend.

use crate::config::TrainingConfig;
use crate::core::FeatureVector;
use crate::error::Result;
use crate::progress::EpochEvent;
use crate::transform::Window;

/// Capability to fit, apply and release a sequence regressor.
///
/// A trainer is configuration only: every call to [`Trainer::fit`] builds
/// a fresh model, so one trainer can serve concurrent runs.
pub trait Trainer {
    /// The fitted model type.
    type Model;

    /// Fit a new model on the training windows.
    ///
    /// `on_epoch` is called once after every epoch. If it returns an error
    /// the trainer must stop and return that error unchanged.
    fn fit(
        &self,
        windows: &[Window],
        config: &TrainingConfig,
        on_epoch: &mut dyn FnMut(EpochEvent) -> Result<()>,
    ) -> Result<Self::Model>;

    /// Predict the next scaled target from a window of feature vectors.
    fn predict(&self, model: &Self::Model, window: &[FeatureVector]) -> f64;

    /// Release a model's resources.
    fn dispose(&self, model: Self::Model) {
        drop(model);
    }

    /// Get the backend name.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;

    /// Predicts the mean target of its training windows.
    struct MeanTrainer;

    impl Trainer for MeanTrainer {
        type Model = f64;

        fn fit(
            &self,
            windows: &[Window],
            config: &TrainingConfig,
            on_epoch: &mut dyn FnMut(EpochEvent) -> Result<()>,
        ) -> Result<f64> {
            if windows.is_empty() {
                return Err(ForecastError::EmptyData);
            }
            let mean = windows.iter().map(|w| w.target).sum::<f64>() / windows.len() as f64;
            for epoch in 0..config.epochs {
                on_epoch(EpochEvent { epoch, loss: 0.0 })?;
            }
            Ok(mean)
        }

        fn predict(&self, model: &f64, _window: &[FeatureVector]) -> f64 {
            *model
        }

        fn name(&self) -> &str {
            "Mean"
        }
    }

    fn windows() -> Vec<Window> {
        vec![
            Window {
                features: vec![[0.0; 3]],
                target: 1.0,
            },
            Window {
                features: vec![[0.0; 3]],
                target: 3.0,
            },
        ]
    }

    #[test]
    fn trainer_reports_every_epoch() {
        let mut epochs = Vec::new();
        let config = TrainingConfig {
            epochs: 3,
            batch_size: 1,
        };
        let model = MeanTrainer
            .fit(&windows(), &config, &mut |e| {
                epochs.push(e.epoch);
                Ok(())
            })
            .unwrap();
        assert_eq!(epochs, vec![0, 1, 2]);
        assert_eq!(MeanTrainer.predict(&model, &[[0.0; 3]]), 2.0);
        MeanTrainer.dispose(model);
    }

    #[test]
    fn callback_error_stops_fit() {
        let config = TrainingConfig::default();
        let mut calls = 0;
        let err = MeanTrainer
            .fit(&windows(), &config, &mut |e| {
                calls += 1;
                if e.epoch == 1 {
                    Err(ForecastError::Cancelled { epoch: e.epoch })
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert_eq!(err, ForecastError::Cancelled { epoch: 1 });
        assert_eq!(calls, 2);
    }

    #[test]
    fn trainer_is_object_safe_for_fixed_model() {
        let trainer: Box<dyn Trainer<Model = f64>> = Box::new(MeanTrainer);
        assert_eq!(trainer.name(), "Mean");
    }
}
