//! Sliding-window construction for the sequence model.
//!
//! A window holds `W` consecutive feature vectors and, as its target, the
//! scaled water value of the step that follows them.

use crate::core::{FeatureVector, WATER_FEATURE};
use crate::error::{ForecastError, Result};
use crate::transform::scale::NormalizedRecord;

/// Default number of steps per window.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Default share of windows used for training.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// A training example: `W` feature vectors and the next scaled target.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub features: Vec<FeatureVector>,
    pub target: f64,
}

impl Window {
    /// Number of steps in the window.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A model input of fixed length, advanced immutably during recursive
/// forecasting.
#[derive(Debug, Clone, PartialEq)]
pub struct InputWindow {
    steps: Vec<FeatureVector>,
}

impl InputWindow {
    /// Wrap a non-empty list of steps.
    pub fn new(steps: Vec<FeatureVector>) -> Result<Self> {
        if steps.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        Ok(Self { steps })
    }

    /// The most recent `window_size` steps of a series.
    pub fn latest(series: &[NormalizedRecord], window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "window size must be positive".to_string(),
            ));
        }
        if series.len() < window_size {
            return Err(ForecastError::InsufficientData {
                needed: window_size,
                got: series.len(),
            });
        }
        let steps = series[series.len() - window_size..]
            .iter()
            .map(NormalizedRecord::features)
            .collect();
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[FeatureVector] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The newest step.
    pub fn last_step(&self) -> FeatureVector {
        // Non-empty by construction.
        self.steps[self.steps.len() - 1]
    }

    /// A new window with the oldest step dropped and `next` appended.
    pub fn advance(&self, next: FeatureVector) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len());
        steps.extend_from_slice(&self.steps[1..]);
        steps.push(next);
        Self { steps }
    }

    /// The step that follows this window when `target` is predicted:
    /// exogenous values are carried forward from the newest step.
    pub fn next_step(&self, target: f64) -> FeatureVector {
        let mut step = self.last_step();
        step[WATER_FEATURE] = target;
        step
    }
}

/// Slice a chronological series into one-step-ahead windows.
///
/// Yields exactly `n - w` windows for a series of length `n`.
///
/// # Example
/// ```
/// use aquacast::core::FusedRecord;
/// use aquacast::transform::{build_windows, FeatureScalers};
///
/// let records: Vec<FusedRecord> = (0..5)
///     .map(|i| FusedRecord {
///         entity_id: "X".into(),
///         year: 1990 + i,
///         temperature: 20.0,
///         water: i as f64,
///         population: 1.0,
///     })
///     .collect();
/// let scalers = FeatureScalers::fit(&records).unwrap();
/// let windows = build_windows(&scalers.normalize(&records), 3).unwrap();
/// assert_eq!(windows.len(), 2);
/// ```
pub fn build_windows(series: &[NormalizedRecord], window_size: usize) -> Result<Vec<Window>> {
    if window_size == 0 {
        return Err(ForecastError::InvalidParameter(
            "window size must be positive".to_string(),
        ));
    }
    let n = series.len();
    if n <= window_size {
        return Err(ForecastError::InsufficientData {
            needed: window_size + 1,
            got: n,
        });
    }

    let windows = (window_size..n)
        .map(|i| Window {
            features: series[i - window_size..i]
                .iter()
                .map(NormalizedRecord::features)
                .collect(),
            target: series[i].scaled_water,
        })
        .collect();
    Ok(windows)
}

/// Chronological train/test split.
///
/// The first `floor(total * train_fraction)` windows train, the rest test.
/// Order is preserved; nothing is shuffled.
pub fn split(windows: &[Window], train_fraction: f64) -> Result<(Vec<Window>, Vec<Window>)> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(ForecastError::InvalidParameter(format!(
            "train fraction must be in [0, 1], got {train_fraction}"
        )));
    }
    let train_len = ((windows.len() as f64) * train_fraction).floor() as usize;
    let train_len = train_len.min(windows.len());
    let (train, test) = windows.split_at(train_len);
    Ok((train.to_vec(), test.to_vec()))
}

/// Window construction with a fixed window size and train fraction.
#[derive(Debug, Clone, Copy)]
pub struct WindowBuilder {
    window_size: usize,
    train_fraction: f64,
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            train_fraction: DEFAULT_TRAIN_FRACTION,
        }
    }
}

impl WindowBuilder {
    pub fn new(window_size: usize, train_fraction: f64) -> Self {
        Self {
            window_size,
            train_fraction,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn build(&self, series: &[NormalizedRecord]) -> Result<Vec<Window>> {
        build_windows(series, self.window_size)
    }

    pub fn split(&self, windows: &[Window]) -> Result<(Vec<Window>, Vec<Window>)> {
        split(windows, self.train_fraction)
    }
}
