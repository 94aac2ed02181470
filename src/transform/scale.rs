//! Z-score scaling of the fused variables.
//!
//! Parameters are fitted on historical records only and reused, unchanged,
//! to inverse-scale forecasts.

use crate::core::{FeatureVector, FusedRecord};
use crate::error::{ForecastError, Result};
use crate::utils::stats::{mean, std_dev};
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as zero.
const MIN_STD: f64 = 1e-10;

/// Mean and standard deviation of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: f64,
    pub std: f64,
}

impl ScalerParams {
    /// Create parameters; a zero (or undefined) `std` is floored to 1.
    pub fn new(mean: f64, std: f64) -> Self {
        Self {
            mean,
            std: floor_std(std),
        }
    }

    /// Fit on a set of values using the sample standard deviation.
    ///
    /// A single value has no defined deviation and gets `std = 1`.
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(
                "cannot fit scaler on non-finite values".to_string(),
            ));
        }
        let std = if values.len() > 1 { std_dev(values) } else { 1.0 };
        Ok(Self::new(mean(values), std))
    }

    /// z = (x - mean) / std
    pub fn forward(&self, x: f64) -> f64 {
        (x - self.mean) / floor_std(self.std)
    }

    /// x = z * std + mean
    pub fn inverse(&self, z: f64) -> f64 {
        z * floor_std(self.std) + self.mean
    }

    /// Recover original values from a scaled slice.
    pub fn inverse_transform(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&z| self.inverse(z)).collect()
    }
}

fn floor_std(std: f64) -> f64 {
    if std.is_finite() && std.abs() >= MIN_STD {
        std
    } else {
        1.0
    }
}

/// Scaler parameters of the three fused variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScalers {
    pub temperature: ScalerParams,
    pub population: ScalerParams,
    pub water: ScalerParams,
}

impl FeatureScalers {
    /// Fit every variable on the given historical records.
    pub fn fit(records: &[FusedRecord]) -> Result<Self> {
        let temperature: Vec<f64> = records.iter().map(|r| r.temperature).collect();
        let population: Vec<f64> = records.iter().map(|r| r.population).collect();
        let water: Vec<f64> = records.iter().map(|r| r.water).collect();
        Ok(Self {
            temperature: ScalerParams::fit(&temperature)?,
            population: ScalerParams::fit(&population)?,
            water: ScalerParams::fit(&water)?,
        })
    }

    /// Scale records into [`NormalizedRecord`]s.
    pub fn normalize(&self, records: &[FusedRecord]) -> Vec<NormalizedRecord> {
        records
            .iter()
            .map(|r| NormalizedRecord {
                scaled_temperature: self.temperature.forward(r.temperature),
                scaled_population: self.population.forward(r.population),
                scaled_water: self.water.forward(r.water),
                record: r.clone(),
            })
            .collect()
    }
}

/// A fused record together with its scaled values.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: FusedRecord,
    pub scaled_temperature: f64,
    pub scaled_population: f64,
    pub scaled_water: f64,
}

impl NormalizedRecord {
    pub fn year(&self) -> i32 {
        self.record.year
    }

    /// Model input vector `[temperature, population, water]`.
    pub fn features(&self) -> FeatureVector {
        [
            self.scaled_temperature,
            self.scaled_population,
            self.scaled_water,
        ]
    }
}
