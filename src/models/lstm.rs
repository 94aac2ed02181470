//! Single-layer LSTM regressor with a dense output head.
//!
//! The network reads a window of feature vectors, keeps the hidden state of
//! the last step and maps it to one scaled water value:
//!
//! ```text
//! i_t = σ(W_i x_t + U_i h_{t-1} + b_i)
//! f_t = σ(W_f x_t + U_f h_{t-1} + b_f)
//! g_t = tanh(W_g x_t + U_g h_{t-1} + b_g)
//! o_t = σ(W_o x_t + U_o h_{t-1} + b_o)
//! c_t = f_t ⊙ c_{t-1} + i_t ⊙ g_t
//! h_t = o_t ⊙ tanh(c_t)
//! ŷ   = v · h_T + c
//! ```
//!
//! Training minimizes mean squared error with Adam over shuffled
//! mini-batches, using backpropagation through time.

use crate::config::TrainingConfig;
use crate::core::{FeatureVector, FEATURE_COUNT};
use crate::error::{ForecastError, Result};
use crate::models::traits::Trainer;
use crate::progress::EpochEvent;
use crate::transform::Window;
use crate::utils::optimization::{Adam, AdamConfig};
use crate::utils::stats::mean_squared_error;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const D: usize = FEATURE_COUNT;

/// LSTM architecture and optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmConfig {
    /// Width of the hidden and cell state (default: 16).
    pub hidden_units: usize,
    pub optimizer: AdamConfig,
    /// Seed for weight initialization and batch shuffling.
    /// `None` draws fresh entropy on every fit.
    pub seed: Option<u64>,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            hidden_units: 16,
            optimizer: AdamConfig::default(),
            seed: None,
        }
    }
}

impl LstmConfig {
    /// Set the hidden width.
    pub fn with_hidden_units(mut self, hidden_units: usize) -> Self {
        self.hidden_units = hidden_units;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the optimizer learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.optimizer.learning_rate = learning_rate;
        self
    }
}

/// Activations of one time step kept for the backward pass.
struct StepCache {
    x: FeatureVector,
    h_prev: Vec<f64>,
    c_prev: Vec<f64>,
    i: Vec<f64>,
    f: Vec<f64>,
    g: Vec<f64>,
    o: Vec<f64>,
    tanh_c: Vec<f64>,
}

/// Fitted LSTM weights.
///
/// Parameters live in one flat vector so the optimizer can treat them
/// uniformly. Layout: input kernel `W` (4H×D), recurrent kernel `U` (4H×H),
/// gate bias `b` (4H), dense weights `v` (H), dense bias. Gate rows are
/// ordered input, forget, candidate, output.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmRegressor {
    hidden: usize,
    params: Vec<f64>,
}

impl LstmRegressor {
    /// Glorot-uniform kernels, zero biases and a forget-gate bias of one.
    pub fn new<R: Rng>(hidden: usize, rng: &mut R) -> Self {
        let mut model = Self {
            hidden,
            params: vec![0.0; Self::param_count(hidden)],
        };
        let h = hidden;
        let w_limit = (6.0 / (D + 4 * h) as f64).sqrt();
        let u_limit = (6.0 / (h + 4 * h) as f64).sqrt();
        let v_limit = (6.0 / (h + 1) as f64).sqrt();

        for idx in 0..4 * h * D {
            model.params[idx] = rng.gen_range(-w_limit..w_limit);
        }
        let u_start = model.u_offset();
        for idx in u_start..u_start + 4 * h * h {
            model.params[idx] = rng.gen_range(-u_limit..u_limit);
        }
        let b_start = model.b_offset();
        for j in 0..h {
            model.params[b_start + h + j] = 1.0;
        }
        let v_start = model.v_offset();
        for j in 0..h {
            model.params[v_start + j] = rng.gen_range(-v_limit..v_limit);
        }
        model
    }

    /// Number of trainable parameters for a hidden width.
    pub fn param_count(hidden: usize) -> usize {
        4 * hidden * (D + hidden + 1) + hidden + 1
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    fn u_offset(&self) -> usize {
        4 * self.hidden * D
    }

    fn b_offset(&self) -> usize {
        4 * self.hidden * (D + self.hidden)
    }

    fn v_offset(&self) -> usize {
        4 * self.hidden * (D + self.hidden + 1)
    }

    fn c_offset(&self) -> usize {
        self.v_offset() + self.hidden
    }

    /// Predict the scaled target for a window.
    pub fn predict(&self, window: &[FeatureVector]) -> f64 {
        let (y, _, _) = self.forward(window, false);
        y
    }

    /// Mean squared error over a set of windows.
    pub fn loss(&self, windows: &[Window]) -> f64 {
        if windows.is_empty() {
            return 0.0;
        }
        let targets: Vec<f64> = windows.iter().map(|w| w.target).collect();
        let predictions: Vec<f64> = windows.iter().map(|w| self.predict(&w.features)).collect();
        mean_squared_error(&targets, &predictions)
    }

    fn forward(&self, window: &[FeatureVector], keep: bool) -> (f64, Vec<StepCache>, Vec<f64>) {
        let h = self.hidden;
        let (u0, b0) = (self.u_offset(), self.b_offset());
        let p = &self.params;

        let mut h_state = vec![0.0; h];
        let mut c_state = vec![0.0; h];
        let mut caches = Vec::with_capacity(if keep { window.len() } else { 0 });
        let mut z = vec![0.0; 4 * h];

        for x in window {
            for (r, zr) in z.iter_mut().enumerate() {
                let mut acc = p[b0 + r];
                for k in 0..D {
                    acc += p[r * D + k] * x[k];
                }
                for k in 0..h {
                    acc += p[u0 + r * h + k] * h_state[k];
                }
                *zr = acc;
            }

            let i: Vec<f64> = z[..h].iter().map(|&v| sigmoid(v)).collect();
            let f: Vec<f64> = z[h..2 * h].iter().map(|&v| sigmoid(v)).collect();
            let g: Vec<f64> = z[2 * h..3 * h].iter().map(|&v| v.tanh()).collect();
            let o: Vec<f64> = z[3 * h..].iter().map(|&v| sigmoid(v)).collect();

            let c_next: Vec<f64> = (0..h).map(|j| f[j] * c_state[j] + i[j] * g[j]).collect();
            let tanh_c: Vec<f64> = c_next.iter().map(|v| v.tanh()).collect();
            let h_next: Vec<f64> = (0..h).map(|j| o[j] * tanh_c[j]).collect();

            if keep {
                caches.push(StepCache {
                    x: *x,
                    h_prev: std::mem::replace(&mut h_state, h_next),
                    c_prev: std::mem::replace(&mut c_state, c_next),
                    i,
                    f,
                    g,
                    o,
                    tanh_c,
                });
            } else {
                h_state = h_next;
                c_state = c_next;
            }
        }

        let v0 = self.v_offset();
        let y = p[self.c_offset()] + (0..h).map(|j| p[v0 + j] * h_state[j]).sum::<f64>();
        (y, caches, h_state)
    }

    /// Add the gradient of `scale / 2 * (ŷ - target)²` to `grads` and
    /// return the squared error.
    fn accumulate_gradient(
        &self,
        window: &[FeatureVector],
        target: f64,
        scale: f64,
        grads: &mut [f64],
    ) -> f64 {
        let h = self.hidden;
        let (u0, b0, v0, c0) = (
            self.u_offset(),
            self.b_offset(),
            self.v_offset(),
            self.c_offset(),
        );
        let p = &self.params;

        let (y, caches, h_last) = self.forward(window, true);
        let err = y - target;
        let dy = scale * err;

        for j in 0..h {
            grads[v0 + j] += dy * h_last[j];
        }
        grads[c0] += dy;

        let mut dh: Vec<f64> = (0..h).map(|j| dy * p[v0 + j]).collect();
        let mut dc = vec![0.0; h];
        let mut dz = vec![0.0; 4 * h];

        for step in caches.iter().rev() {
            for j in 0..h {
                let tc = step.tanh_c[j];
                let d_o = dh[j] * tc;
                let dcj = dc[j] + dh[j] * step.o[j] * (1.0 - tc * tc);

                dz[j] = dcj * step.g[j] * step.i[j] * (1.0 - step.i[j]);
                dz[h + j] = dcj * step.c_prev[j] * step.f[j] * (1.0 - step.f[j]);
                dz[2 * h + j] = dcj * step.i[j] * (1.0 - step.g[j] * step.g[j]);
                dz[3 * h + j] = d_o * step.o[j] * (1.0 - step.o[j]);
                dc[j] = dcj * step.f[j];
            }

            for (r, &dzr) in dz.iter().enumerate() {
                for k in 0..D {
                    grads[r * D + k] += dzr * step.x[k];
                }
                for k in 0..h {
                    grads[u0 + r * h + k] += dzr * step.h_prev[k];
                }
                grads[b0 + r] += dzr;
            }

            for (k, dhk) in dh.iter_mut().enumerate() {
                *dhk = dz
                    .iter()
                    .enumerate()
                    .map(|(r, &dzr)| p[u0 + r * h + k] * dzr)
                    .sum();
            }
        }

        err * err
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Trainer backend producing [`LstmRegressor`] models.
///
/// # Example
/// ```
/// use aquacast::config::TrainingConfig;
/// use aquacast::models::{LstmConfig, LstmTrainer, Trainer};
/// use aquacast::transform::Window;
///
/// let windows: Vec<Window> = (0..8)
///     .map(|i| {
///         let x = i as f64 / 8.0;
///         Window { features: vec![[x, x, x]; 3], target: x }
///     })
///     .collect();
///
/// let trainer = LstmTrainer::new(LstmConfig::default().with_seed(1));
/// let training = TrainingConfig { epochs: 5, batch_size: 4 };
/// let model = trainer.fit(&windows, &training, &mut |_| Ok(())).unwrap();
/// assert!(trainer.predict(&model, &windows[0].features).is_finite());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LstmTrainer {
    config: LstmConfig,
}

impl LstmTrainer {
    pub fn new(config: LstmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LstmConfig {
        &self.config
    }

    fn validate(&self, windows: &[Window], training: &TrainingConfig) -> Result<()> {
        if self.config.hidden_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "hidden_units must be positive".to_string(),
            ));
        }
        if training.epochs == 0 || training.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "epochs and batch_size must be positive".to_string(),
            ));
        }
        let first = windows.first().ok_or(ForecastError::InsufficientData {
            needed: 1,
            got: 0,
        })?;
        if first.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if let Some(bad) = windows.iter().find(|w| w.len() != first.len()) {
            return Err(ForecastError::DimensionMismatch {
                expected: first.len(),
                got: bad.len(),
            });
        }
        Ok(())
    }
}

impl Trainer for LstmTrainer {
    type Model = LstmRegressor;

    fn fit(
        &self,
        windows: &[Window],
        training: &TrainingConfig,
        on_epoch: &mut dyn FnMut(EpochEvent) -> Result<()>,
    ) -> Result<LstmRegressor> {
        self.validate(windows, training)?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut model = LstmRegressor::new(self.config.hidden_units, &mut rng);
        let mut adam = Adam::new(self.config.optimizer, model.params.len());
        let mut grads = vec![0.0; model.params.len()];
        let mut order: Vec<usize> = (0..windows.len()).collect();

        for epoch in 0..training.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(training.batch_size) {
                grads.iter_mut().for_each(|g| *g = 0.0);
                let scale = 2.0 / batch.len() as f64;
                for &idx in batch {
                    let window = &windows[idx];
                    model.accumulate_gradient(&window.features, window.target, scale, &mut grads);
                }
                adam.step(&mut model.params, &grads);
            }

            let loss = model.loss(windows);
            on_epoch(EpochEvent { epoch, loss })?;
        }

        Ok(model)
    }

    fn predict(&self, model: &LstmRegressor, window: &[FeatureVector]) -> f64 {
        model.predict(window)
    }

    fn name(&self) -> &str {
        "LSTM"
    }
}
