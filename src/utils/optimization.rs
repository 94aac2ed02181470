//! Gradient-based optimization for model training.

use serde::{Deserialize, Serialize};

/// Configuration for the Adam optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    /// Step size (default: 0.001).
    pub learning_rate: f64,
    /// Decay rate of the first moment estimate (default: 0.9).
    pub beta1: f64,
    /// Decay rate of the second moment estimate (default: 0.999).
    pub beta2: f64,
    /// Numerical stabilizer added to the denominator (default: 1e-7).
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

impl AdamConfig {
    /// Set the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }
}

/// Adam optimizer state over a flat parameter vector.
///
/// # Example
/// ```
/// use aquacast::utils::optimization::{Adam, AdamConfig};
///
/// // Minimize (x - 3)^2
/// let mut x = vec![0.0];
/// let mut adam = Adam::new(AdamConfig::default().with_learning_rate(0.1), 1);
/// for _ in 0..500 {
///     let grad = vec![2.0 * (x[0] - 3.0)];
///     adam.step(&mut x, &grad);
/// }
/// assert!((x[0] - 3.0).abs() < 0.1);
/// ```
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    /// Create optimizer state for `n_params` parameters.
    pub fn new(config: AdamConfig, n_params: usize) -> Self {
        Self {
            config,
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
            t: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one bias-corrected update of `params` along `grads`.
    pub fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        debug_assert_eq!(params.len(), self.m.len());
        debug_assert_eq!(grads.len(), self.m.len());

        self.t = self.t.saturating_add(1);
        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.config;
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        for i in 0..params.len() {
            let g = grads[i];
            self.m[i] = beta1 * self.m[i] + (1.0 - beta1) * g;
            self.v[i] = beta2 * self.v[i] + (1.0 - beta2) * g * g;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            params[i] -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        }
    }
}
