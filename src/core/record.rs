//! Raw and fused record types.
//!
//! Raw records arrive from external loaders, one per (entity label, year,
//! source). Fused records are the per-entity, per-year join of the three
//! source variables.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of variables in a fused feature vector.
pub const FEATURE_COUNT: usize = 3;

/// Scaled feature vector in fixed order `[temperature, population, water]`.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Index of the water (target) value inside a [`FeatureVector`].
pub const WATER_FEATURE: usize = 2;

/// Source dataset a raw record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Water withdrawn for use.
    Usage,
    /// Renewable water resources.
    Resource,
    Population,
    Temperature,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Usage => "usage",
            SourceTag::Resource => "resource",
            SourceTag::Population => "population",
            SourceTag::Temperature => "temperature",
        }
    }

    /// Whether this tag marks a water record.
    pub fn is_water(&self) -> bool {
        matches!(self, SourceTag::Usage | SourceTag::Resource)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usage" => Ok(SourceTag::Usage),
            "resource" => Ok(SourceTag::Resource),
            "population" => Ok(SourceTag::Population),
            "temperature" => Ok(SourceTag::Temperature),
            other => Err(ForecastError::InvalidParameter(format!(
                "unknown source tag '{other}'"
            ))),
        }
    }
}

/// Which kind of water record is the forecast target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterKind {
    #[default]
    Usage,
    Resource,
}

impl WaterKind {
    /// The source tag carried by records of this kind.
    pub fn tag(&self) -> SourceTag {
        match self {
            WaterKind::Usage => SourceTag::Usage,
            WaterKind::Resource => SourceTag::Resource,
        }
    }
}

/// What to do with a value that does not parse as a finite number.
///
/// Upstream loaders historically coerced such values to `0`; that remains
/// the default, but it is a data-cleaning decision made here, not inside
/// the parser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericPolicy {
    /// Replace the value with the given number.
    Substitute(f64),
    /// Drop the record.
    Reject,
}

impl Default for NumericPolicy {
    fn default() -> Self {
        NumericPolicy::Substitute(0.0)
    }
}

impl NumericPolicy {
    /// Apply the policy to a textual value.
    ///
    /// Returns `None` when the value is unparseable and the policy rejects it.
    pub fn apply(&self, raw: &str) -> Option<f64> {
        match try_parse_numeric(raw) {
            Some(v) => Some(v),
            None => match self {
                NumericPolicy::Substitute(default) => Some(*default),
                NumericPolicy::Reject => None,
            },
        }
    }
}

fn try_parse_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a numeric field, falling back to `default` for empty, unparseable
/// or non-finite text.
///
/// # Example
/// ```
/// use aquacast::core::parse_numeric;
///
/// assert_eq!(parse_numeric(" 12.5 ", 0.0), 12.5);
/// assert_eq!(parse_numeric("n/a", 0.0), 0.0);
/// assert_eq!(parse_numeric("", -1.0), -1.0);
/// ```
pub fn parse_numeric(raw: &str, default: f64) -> f64 {
    try_parse_numeric(raw).unwrap_or(default)
}

/// A single annual observation as supplied by an external loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Entity label as spelled by the source dataset.
    pub entity_label: String,
    pub year: i32,
    pub value: f64,
    pub source: SourceTag,
}

impl RawRecord {
    pub fn new(entity_label: impl Into<String>, year: i32, value: f64, source: SourceTag) -> Self {
        Self {
            entity_label: entity_label.into(),
            year,
            value,
            source,
        }
    }

    /// Build a record from textual value input using `policy` for
    /// unparseable values.
    ///
    /// Returns `None` when the policy rejects the value.
    pub fn parse(
        entity_label: impl Into<String>,
        year: i32,
        raw_value: &str,
        source: SourceTag,
        policy: NumericPolicy,
    ) -> Option<Self> {
        policy
            .apply(raw_value)
            .map(|value| Self::new(entity_label, year, value, source))
    }
}

/// One year of the joined temperature, water and population series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedRecord {
    pub entity_id: String,
    pub year: i32,
    pub temperature: f64,
    pub water: f64,
    pub population: f64,
}
