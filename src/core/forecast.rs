//! Forecast result structure returned by the pipeline.

use serde::{Deserialize, Serialize};

/// A single (year, value) point of a historical or forecast series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    pub year: i32,
    pub value: f64,
}

impl YearValue {
    pub fn new(year: i32, value: f64) -> Self {
        Self { year, value }
    }
}

/// Result of a single pipeline run for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Canonical identifier the forecast was produced for.
    pub entity_id: String,
    /// Observed target values, ascending by year.
    pub historical_series: Vec<YearValue>,
    /// Forecast target values, one per year after the last observation.
    pub forecast_series: Vec<YearValue>,
    /// Standard deviation of absolute held-out residuals, measured on the
    /// normalized target.
    pub std_error: f64,
    /// The same dispersion mapped back to target units.
    pub std_error_target_units: f64,
    /// Loss of the final training epoch.
    pub final_loss: f64,
}

impl ForecastResult {
    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.forecast_series.len()
    }

    /// Last observed year, if any history is present.
    pub fn last_historical_year(&self) -> Option<i32> {
        self.historical_series.last().map(|p| p.year)
    }

    /// Forecast values without their years.
    pub fn forecast_values(&self) -> Vec<f64> {
        self.forecast_series.iter().map(|p| p.value).collect()
    }
}
